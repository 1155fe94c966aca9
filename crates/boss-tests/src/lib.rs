//! Cross-crate test suite for the boss engine.
//!
//! Scenario tests replay whole encounters through [`boss_engine::BossEngine`]
//! with a manual clock; property tests check the numeric invariants of the
//! scoring and reward formulas; concurrency tests hammer shared ledgers from
//! many threads.

pub mod helpers;
