//! Debug Sink - 중앙 에러 처리
//!
//! 레지스트리/이벤트 계층에서 발생한 "복구 가능한" 에러를 어떻게 처리할지 결정합니다.
//!
//! - `Strict`: 에러를 호출자에게 그대로 반환 (개발 환경)
//! - `Lenient`: `tracing::error!`로 기록하고 호출자는 기본값(null)으로 진행 (운영 환경)
//!
//! 캐시 백엔드 등록/선택 에러는 싱크를 거치지 않고 항상 `Err`로 반환됩니다.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::error;

/// 디버그 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugMode {
    /// 모든 에러를 호출자에게 반환
    Strict,
    /// 복구 가능한 에러는 로그만 남김
    #[default]
    Lenient,
}

impl DebugMode {
    fn as_u8(self) -> u8 {
        match self {
            Self::Strict => 0,
            Self::Lenient => 1,
        }
    }

    fn from_u8(v: u8) -> Self {
        if v == 0 {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

/// 디버그 싱크
///
/// 런타임에 모드를 바꿀 수 있도록 atomic으로 보관합니다.
#[derive(Debug)]
pub struct DebugSink {
    mode: AtomicU8,
}

impl DebugSink {
    pub fn new(mode: DebugMode) -> Self {
        Self {
            mode: AtomicU8::new(mode.as_u8()),
        }
    }

    pub fn mode(&self) -> DebugMode {
        DebugMode::from_u8(self.mode.load(Ordering::Relaxed))
    }

    pub fn set_mode(&self, mode: DebugMode) {
        self.mode.store(mode.as_u8(), Ordering::Relaxed);
    }

    /// 에러를 싱크로 보냄
    ///
    /// Lenient 모드에서 복구 가능한 에러는 `Ok(())`를 반환하고,
    /// 그 외에는 에러를 그대로 돌려줍니다.
    pub fn report(&self, err: Error) -> Result<()> {
        error!(error = %err, mode = ?self.mode(), "debug sink");
        match self.mode() {
            DebugMode::Lenient if err.is_recoverable() => Ok(()),
            _ => Err(err),
        }
    }

    /// 에러를 보고하고 lenient 모드면 fallback 값을 반환
    pub fn recover<T>(&self, err: Error, fallback: T) -> Result<T> {
        self.report(err).map(|_| fallback)
    }
}

impl Default for DebugSink {
    fn default() -> Self {
        Self::new(DebugMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_swallows_recoverable() {
        let sink = DebugSink::new(DebugMode::Lenient);
        let value = sink
            .recover(Error::method_not_found("A", "m"), 7)
            .expect("lenient sink recovers");
        assert_eq!(value, 7);
    }

    #[test]
    fn test_lenient_keeps_fatal_errors() {
        let sink = DebugSink::new(DebugMode::Lenient);
        assert!(sink.report(Error::Internal("boom".into())).is_err());
    }

    #[test]
    fn test_strict_returns_error() {
        let sink = DebugSink::new(DebugMode::Strict);
        assert!(sink.report(Error::ClassNotFound("X".into())).is_err());

        sink.set_mode(DebugMode::Lenient);
        assert!(sink.report(Error::ClassNotFound("X".into())).is_ok());
    }
}
