//! Engine-wide constants. Times are Unix milliseconds, scores are 0–100.

/// Default staleness window for cached attribute progression results.
pub const DEFAULT_CACHE_EXPIRE_MS: i64 = 1_000;

/// Default minimum interval between difficulty-score recomputations.
pub const DEFAULT_RATING_UPDATE_INTERVAL_MS: i64 = 1_000;

/// Default age after which an unconcluded ledger is purged.
pub const DEFAULT_LEDGER_MAX_AGE_MS: i64 = 60 * 60 * 1_000;

/// Width of the sliding window used to count recent kills of a boss.
pub const RECENT_KILL_WINDOW_MS: i64 = 60 * 60 * 1_000;

/// Default number of entries in a top-damagers listing.
pub const DEFAULT_TOP_DAMAGERS_LIMIT: usize = 5;

/// Upper bound of every score in the engine (difficulty and quality).
pub const MAX_SCORE: u8 = 100;

/// Experience granted per tier level before quality and difficulty scaling.
pub const BASE_EXPERIENCE_PER_TIER: f64 = 100.0;

/// Currency ("spirits") granted per tier level before quality and difficulty scaling.
pub const BASE_SPIRITS_PER_TIER: f64 = 10.0;

/// Every attribute multiplier is floored here: scaling never weakens a base stat.
pub const MULTIPLIER_FLOOR: f64 = 1.0;
