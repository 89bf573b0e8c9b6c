//! Session settlement engine
//!
//! Per-asset trading sessions with tiered payout ladders, incentive
//! reward issuance, early exercise and price-driven draws.

pub mod engine;
pub mod ladder;
pub mod reward;

pub use engine::{DrawReport, SessionEngine, SessionError, SessionResult};
pub use ladder::{level_cap, LadderConfig, LadderError, PayoutLadder, Segment, MAX_TIER, TIER_COUNT};
pub use reward::{RewardBracket, RewardError, RewardSchedule};
