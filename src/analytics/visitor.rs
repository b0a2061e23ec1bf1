//! Anonymous visitor fingerprinting
//!
//! A visitor is identified by `sha256(daily_salt + project_id + client_addr +
//! user_agent)`. The salt is the UTC calendar date, so the same visitor maps
//! to the same hash within one day and to an unlinkable hash the next. Raw
//! addresses are never stored; cross-session identifiability is bounded to 24
//! hours.

use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};

/// Compute the daily-rotating fingerprint for a visitor of `project_id`.
pub fn fingerprint(project_id: &str, client_addr: &str, user_agent: &str) -> String {
    fingerprint_on(Utc::now().date_naive(), project_id, client_addr, user_agent)
}

/// Fingerprint with an explicit salt date. Split out so the daily rotation is
/// testable without waiting for midnight.
fn fingerprint_on(
    salt_date: NaiveDate,
    project_id: &str,
    client_addr: &str,
    user_agent: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_date.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(project_id.as_bytes());
    hasher.update(client_addr.as_bytes());
    hasher.update(user_agent.as_bytes());
    format!("{:x}", hasher.finalize())
}
