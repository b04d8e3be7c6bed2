//! Hashing utilities for cache keys
//!
//! `DefaultHasher`는 Rust 버전마다 결과가 달라질 수 있으므로
//! 디스크에 남는 파일 이름에는 FNV-1a를 사용합니다.

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a 64-bit hash
pub fn stable_hash(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// 캐시 키에 대응하는 파일 이름
pub fn key_file_name(key: &str) -> String {
    format!("{:016x}.json", stable_hash(key.as_bytes()))
}
