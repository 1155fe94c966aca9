//! Concurrent access to ledgers and the engine.
//!
//! Damage arrives from many combat threads at once while other threads read
//! rankings, refresh scaling and finally conclude. Totals must be conserved
//! and every boss must conclude exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use boss_core::{BossTier, ManualClock};
use boss_ledger::DamageLedger;
use boss_tests::helpers::*;

const THREADS: u128 = 8;
const HITS_PER_THREAD: usize = 2_000;

// ======================================================================
// Ledger
// ======================================================================

#[test]
fn shared_participant_totals_are_conserved() {
    let ledger = DamageLedger::new(boss(1), "Hydra", BossTier::Elite, T0);
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for i in 0..HITS_PER_THREAD {
                    ledger.record(pid(1), 1.5, T0 + i as i64);
                }
            });
        }
    });

    let expected = THREADS as f64 * HITS_PER_THREAD as f64 * 1.5;
    assert_eq!(ledger.total_damage(), expected);
    assert_eq!(ledger.damage_of(&pid(1)), expected);
    assert_eq!(ledger.hits_of(&pid(1)), THREADS as u64 * HITS_PER_THREAD as u64);
    // Last writer wins, so any of the recorded timestamps is acceptable.
    let last = ledger.last_hit_of(&pid(1)).unwrap();
    assert!((T0..T0 + HITS_PER_THREAD as i64).contains(&last));
}

#[test]
fn readers_see_consistent_rankings_during_writes() {
    let ledger = DamageLedger::new(boss(2), "Hydra", BossTier::Elite, T0);
    thread::scope(|s| {
        for t in 0..THREADS {
            let ledger = &ledger;
            s.spawn(move || {
                for i in 0..HITS_PER_THREAD {
                    ledger.record(pid(t + 1), (t + 1) as f64, T0 + i as i64);
                }
            });
        }
        s.spawn(|| {
            for _ in 0..200 {
                let ranking = ledger.ranking();
                assert!(ranking.windows(2).all(|w| w[0].1.damage >= w[1].1.damage));
                assert!(ledger.top_damagers(3).len() <= 3);
            }
        });
    });

    // Thread t hits for t + 1, so the ranking is fixed once writes settle.
    let top: Vec<_> = ledger.top_damagers(3).collect();
    assert_eq!(top, vec![pid(THREADS), pid(THREADS - 1), pid(THREADS - 2)]);
    assert_eq!(ledger.participant_count(), THREADS as usize);
}

// ======================================================================
// Engine
// ======================================================================

#[test]
fn many_bosses_fed_concurrently() {
    let (engine, _) = engine(None);
    for b in 0..4u128 {
        engine.spawn(boss(b), "Ogre", BossTier::Normal);
    }

    thread::scope(|s| {
        for t in 0..THREADS {
            let engine = &engine;
            s.spawn(move || {
                for i in 0..HITS_PER_THREAD {
                    let b = boss(i as u128 % 4);
                    engine.record(&hit(b, pid(t + 1), 2.0, T0));
                    if i % 100 == 0 {
                        engine.scale(b, 500.0, 1_000.0, THREADS as u32);
                    }
                }
            });
        }
    });

    let per_boss = THREADS as f64 * (HITS_PER_THREAD / 4) as f64 * 2.0;
    for b in 0..4u128 {
        let ledger = engine.ledger(&boss(b)).unwrap();
        assert_eq!(ledger.total_damage(), per_boss);
        assert_eq!(ledger.participant_count(), THREADS as usize);
    }
}

#[test]
fn racing_conclusions_succeed_once() {
    let clock = Arc::new(ManualClock::new(T0));
    let engine = boss_engine::BossEngine::new(Default::default(), clock, None).unwrap();
    let b = boss(7);
    engine.spawn(b, "Lich", BossTier::WorldBoss);
    engine.record(&hit(b, pid(1), 100.0, T0));

    let successes = AtomicUsize::new(0);
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                if engine.conclude(b, &clean_kill(), Some(pid(1))).is_ok() {
                    successes.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });

    assert_eq!(successes.load(Ordering::Relaxed), 1);
    assert_eq!(engine.active_encounters(), 0);
    assert_eq!(engine.rater("Lich").unwrap().recent_kill_count(T0), 1);
}
