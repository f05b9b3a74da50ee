//! 에러 타입 — 도메인별 에러 정의
//!
//! 에러 분류:
//! - [`ScanError`]: 스캔 수행 중 발생하는 에러 (경로, 파싱, 동시성)
//! - [`AdvisoryError`]: 어드바이저리 캐시 갱신/조회 에러 (네트워크, 스토리지)
//! - [`ConfigError`]: 설정 파일 에러
//!
//! 파일 단위 파싱 실패는 에러가 아니라 경고([`crate::types::ScanWarning`])로
//! 수집되어 스캔이 계속됩니다. 여기의 `Parse`는 개별 파서가 반환하는
//! 원본 에러이며, 오케스트레이터가 경고로 변환합니다.

/// Lockvet 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LockvetError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스캔 에러
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// 어드바이저리 캐시 에러
    #[error("advisory error: {0}")]
    Advisory(#[from] AdvisoryError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 스캔 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 인식 가능한 lockfile이 하나도 없거나 경로가 존재하지 않음
    #[error("no recognized lockfile found in: {path}")]
    NotFound { path: String },

    /// lockfile 파싱 실패 (파일 단위, 경고로 수집됨)
    #[error("failed to parse lockfile {path}: {reason}")]
    Parse { path: String, reason: String },

    /// 같은 디렉토리에 대한 스캔이 이미 진행 중
    #[error("scan already in progress for: {path}")]
    ScanInProgress { path: String },

    /// 호출자가 스캔을 취소함
    #[error("scan cancelled")]
    Cancelled,

    /// 파일시스템 접근 실패 (해당 스캔에만 치명적)
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 어드바이저리 캐시 에러
#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    /// 업스트림 피드 요청 실패 (캐시는 변경되지 않음)
    #[error("network error from {feed}: {reason}")]
    Network { feed: String, reason: String },

    /// 업스트림 피드 응답 시간 초과
    #[error("timeout after {secs}s waiting for {feed}")]
    Timeout { feed: String, secs: u64 },

    /// 로컬 스토리지 에러
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// 피드 응답 파싱 실패
    #[error("malformed response from {feed}: {reason}")]
    MalformedResponse { feed: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_display() {
        let err = ScanError::NotFound {
            path: "/tmp/empty".to_owned(),
        };
        assert_eq!(err.to_string(), "no recognized lockfile found in: /tmp/empty");

        let err = ScanError::Parse {
            path: "Cargo.lock".to_owned(),
            reason: "unexpected eof".to_owned(),
        };
        assert!(err.to_string().contains("Cargo.lock"));
        assert!(err.to_string().contains("unexpected eof"));

        let err = ScanError::ScanInProgress {
            path: "/srv/app".to_owned(),
        };
        assert_eq!(err.to_string(), "scan already in progress for: /srv/app");

        assert_eq!(ScanError::Cancelled.to_string(), "scan cancelled");
    }

    #[test]
    fn scan_error_io_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ScanError::Io {
            path: "/root/secret".to_owned(),
            source: io,
        };
        assert!(err.to_string().contains("/root/secret"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn advisory_error_display() {
        let err = AdvisoryError::Network {
            feed: "osv".to_owned(),
            reason: "connection refused".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "network error from osv: connection refused"
        );

        let err = AdvisoryError::Timeout {
            feed: "nvd".to_owned(),
            secs: 30,
        };
        assert_eq!(err.to_string(), "timeout after 30s waiting for nvd");
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "database_path".to_owned(),
            reason: "must not contain '..'".to_owned(),
        };
        assert!(err.to_string().contains("database_path"));
    }

    #[test]
    fn lockvet_error_from_conversions() {
        let err: LockvetError = ScanError::Cancelled.into();
        assert!(matches!(err, LockvetError::Scan(_)));

        let err: LockvetError = AdvisoryError::Storage {
            reason: "locked".to_owned(),
        }
        .into();
        assert!(matches!(err, LockvetError::Advisory(_)));

        let err: LockvetError = ConfigError::ParseFailed {
            reason: "bad toml".to_owned(),
        }
        .into();
        assert!(matches!(err, LockvetError::Config(_)));
    }
}
