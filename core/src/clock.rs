//! Session clock
//!
//! Trading sessions are hour-long windows identified by their opening
//! timestamp, always aligned to the hour. This module provides the slot
//! arithmetic: flooring a timestamp to its session id, and computing the
//! id of the next session to open when real time has drifted past the
//! expected slot.

use crate::models::Timestamp;

/// Length of one trading session (seconds).
pub const SESSION_SECS: Timestamp = 3600;

/// Minimum gap between a dividend call and the next cycle boundary.
pub const MIN_CYCLE_GAP: Timestamp = 2 * SESSION_SECS;

/// Floor a timestamp to the hour boundary at or before it.
///
/// # Example
/// ```
/// use option_pool_core_rs::clock::floor_session;
///
/// assert_eq!(floor_session(7200), 7200);
/// assert_eq!(floor_session(7261), 7200);
/// ```
pub fn floor_session(ts: Timestamp) -> Timestamp {
    ts - ts.rem_euclid(SESSION_SECS)
}

/// Round a timestamp up to the next hour boundary (strictly after `ts`
/// unless `ts` is already aligned).
pub fn ceil_session(ts: Timestamp) -> Timestamp {
    let floored = floor_session(ts);
    if floored == ts {
        ts
    } else {
        floored + SESSION_SECS
    }
}

/// Id of the next session to open after `last_open`.
///
/// Normally the slot directly after `last_open`; if real time has
/// drifted past that slot, the current time rounded up to the next
/// hour boundary is used instead.
pub fn next_session_id(last_open: Timestamp, now: Timestamp) -> Timestamp {
    let expected = last_open + SESSION_SECS;
    if expected > now {
        expected
    } else {
        ceil_session(now)
    }
}
