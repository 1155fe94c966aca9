//! # boss-rewards: what a kill is worth and who gets it.
//!
//! - [`QualityScorer`]: grades a finished encounter S–D from its outcome facts.
//! - [`RewardAllocator`]: sizes the experience/currency pools and splits them
//!   by damage share, with a bonus for the killing blow.

pub mod allocator;
pub mod quality;

pub use allocator::{RewardAllocation, RewardAllocator, RewardPools, RewardShare};
pub use quality::{QualityLevel, QualityScore, QualityScorer};
