//! Cache utilities
//!
//! - 키 해싱 (파일 이름용 안정 해시)
//! - 타임스탬프 / 만료 계산

mod hash;
mod time;

pub use hash::{key_file_name, stable_hash};
pub use time::{is_expired, now_micros, MICROS_PER_SEC};
