//! Error types for BuckyBall
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// BuckyBall 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ========================================================================
    // 클래스 레지스트리 관련
    // ========================================================================
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Invalid method: {class}::{method}")]
    MethodNotFound { class: String, method: String },

    #[error("Object of class {0} is not callable")]
    NotCallable(String),

    #[error("Callback error: {0}")]
    Callback(String),

    // ========================================================================
    // 모듈 관련
    // ========================================================================
    #[error("Module error: {0}")]
    Module(String),

    // ========================================================================
    // 캐시 관련
    // ========================================================================
    #[error("Invalid cache backend: {0}")]
    InvalidBackend(String),

    #[error("Cache backend is not available: {0}")]
    BackendUnavailable(String),

    #[error("Cache error: {0}")]
    Cache(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 디버그 싱크가 lenient 모드일 때 로그만 남기고 진행할 수 있는 에러인지 확인
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MethodNotFound { .. }
                | Error::ClassNotFound(_)
                | Error::InvalidArgument(_)
                | Error::NotCallable(_)
        )
    }

    /// MethodNotFound 에러 생성 헬퍼
    pub fn method_not_found(class: impl Into<String>, method: impl Into<String>) -> Self {
        Error::MethodNotFound {
            class: class.into(),
            method: method.into(),
        }
    }

    /// Callback 에러 생성 헬퍼
    pub fn callback(message: impl Into<String>) -> Self {
        Error::Callback(message.into())
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_found_display() {
        let err = Error::method_not_found("Logger", "write");
        assert_eq!(err.to_string(), "Invalid method: Logger::write");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_backend_errors_are_not_recoverable() {
        assert!(!Error::BackendUnavailable("memcache".into()).is_recoverable());
        assert!(!Error::InvalidBackend("redis".into()).is_recoverable());
    }
}
