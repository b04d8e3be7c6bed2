//! Timestamp helpers

use chrono::Utc;

pub const MICROS_PER_SEC: i64 = 1_000_000;

/// 현재 시각 (µs)
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

/// `created_at + ttl <= now` 이면 만료
///
/// ttl이 없으면 만료되지 않습니다. ttl=0은 항상 만료입니다.
pub fn is_expired(created_at: i64, ttl: Option<u64>, now: i64) -> bool {
    match ttl {
        Some(ttl) => {
            let ttl = i64::try_from(ttl).unwrap_or(i64::MAX / MICROS_PER_SEC);
            created_at.saturating_add(ttl.saturating_mul(MICROS_PER_SEC)) <= now
        }
        None => false,
    }
}
