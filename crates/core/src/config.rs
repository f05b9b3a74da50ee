//! 설정 관리 — lockvet.toml 파싱 및 런타임 설정
//!
//! [`LockvetConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOCKVET_CACHE_TIMEOUT_SECS=60` 형식)
//! 3. 설정 파일 (`lockvet.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), lockvet_core::error::LockvetError> {
//! use lockvet_core::config::LockvetConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LockvetConfig::load("lockvet.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LockvetConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LockvetError};
use crate::types::VulnSource;

/// lockfile 최대 크기 상한 (1GB)
const MAX_FILE_SIZE_LIMIT: u64 = 1024 * 1024 * 1024;
/// 피드 타임아웃 상한 (초)
const MAX_TIMEOUT_SECS: u64 = 600;
/// 이력 조회 제한 상한
const MAX_HISTORY_LIMIT: u32 = 1000;
/// 경로 문자열 최대 길이
const MAX_PATH_LEN: usize = 4096;

/// Lockvet 통합 설정
///
/// `lockvet.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 크레이트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockvetConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 어드바이저리 캐시 설정
    #[serde(default)]
    pub cache: CacheConfig,
    /// 스캔 설정
    #[serde(default)]
    pub scan: ScanConfig,
}

impl LockvetConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LockvetError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LockvetError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LockvetError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LockvetError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LockvetError> {
        toml::from_str(toml_str).map_err(|e| {
            LockvetError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOCKVET_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOCKVET_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOCKVET_GENERAL_LOG_FORMAT");

        // Cache
        override_string(&mut self.cache.database_path, "LOCKVET_CACHE_DATABASE_PATH");
        override_csv(&mut self.cache.sources, "LOCKVET_CACHE_SOURCES");
        override_u64(&mut self.cache.timeout_secs, "LOCKVET_CACHE_TIMEOUT_SECS");
        override_string(&mut self.cache.osv_endpoint, "LOCKVET_CACHE_OSV_ENDPOINT");
        override_string(&mut self.cache.nvd_endpoint, "LOCKVET_CACHE_NVD_ENDPOINT");
        override_string(
            &mut self.cache.github_endpoint,
            "LOCKVET_CACHE_GITHUB_ENDPOINT",
        );

        // Scan
        override_u64(&mut self.scan.max_file_size, "LOCKVET_SCAN_MAX_FILE_SIZE");
        override_bool(
            &mut self.scan.match_unversioned,
            "LOCKVET_SCAN_MATCH_UNVERSIONED",
        );
        override_u32(&mut self.scan.history_limit, "LOCKVET_SCAN_HISTORY_LIMIT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LockvetError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        validate_path(&self.cache.database_path, "cache.database_path")?;

        if self.cache.sources.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cache.sources".to_owned(),
                reason: "at least one advisory source is required".to_owned(),
            }
            .into());
        }
        for source in &self.cache.sources {
            if VulnSource::from_str_loose(source).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "cache.sources".to_owned(),
                    reason: format!("unknown source '{source}' (expected: osv, nvd, github)"),
                }
                .into());
            }
        }

        if self.cache.timeout_secs == 0 || self.cache.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                field: "cache.timeout_secs".to_owned(),
                reason: format!("must be between 1 and {MAX_TIMEOUT_SECS}"),
            }
            .into());
        }

        if self.scan.max_file_size == 0 || self.scan.max_file_size > MAX_FILE_SIZE_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "scan.max_file_size".to_owned(),
                reason: format!("must be between 1 and {MAX_FILE_SIZE_LIMIT}"),
            }
            .into());
        }

        if self.scan.history_limit == 0 || self.scan.history_limit > MAX_HISTORY_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "scan.history_limit".to_owned(),
                reason: format!("must be between 1 and {MAX_HISTORY_LIMIT}"),
            }
            .into());
        }

        Ok(())
    }

}

/// 경로 값 검증 — 빈 값, 길이 초과, 상위 디렉토리 탈출을 거부합니다.
fn validate_path(path: &str, field: &str) -> Result<(), LockvetError> {
    if path.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: "must not be empty".to_owned(),
        }
        .into());
    }
    if path.len() > MAX_PATH_LEN {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: format!("path too long (max {MAX_PATH_LEN})"),
        }
        .into());
    }
    if Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: "must not contain '..'".to_owned(),
        }
        .into());
    }
    Ok(())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 어드바이저리 캐시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite 데이터베이스 경로
    pub database_path: String,
    /// 사용할 출처 (osv, nvd, github)
    pub sources: Vec<String>,
    /// 출처별 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// OSV API 엔드포인트
    pub osv_endpoint: String,
    /// NVD API 엔드포인트
    pub nvd_endpoint: String,
    /// GitHub API 엔드포인트
    pub github_endpoint: String,
}

impl CacheConfig {
    /// 설정된 출처 목록을 파싱된 형태로 반환합니다.
    ///
    /// `validate()`를 통과한 설정에서만 호출한다는 전제이므로
    /// 인식 불가 항목은 건너뜁니다.
    pub fn enabled_sources(&self) -> Vec<VulnSource> {
        self.sources
            .iter()
            .filter_map(|s| VulnSource::from_str_loose(s))
            .collect()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_path: "lockvet.db".to_owned(),
            sources: vec!["osv".to_owned()],
            timeout_secs: 30,
            osv_endpoint: "https://api.osv.dev".to_owned(),
            nvd_endpoint: "https://services.nvd.nist.gov".to_owned(),
            github_endpoint: "https://api.github.com".to_owned(),
        }
    }
}

/// 스캔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// lockfile 최대 크기 (바이트)
    pub max_file_size: u64,
    /// 버전 범위가 없는 레코드를 이름만으로 매칭할지 여부
    ///
    /// 기본값 false — 범위 없는 레코드는 "데이터 부족"으로 제외됩니다.
    pub match_unversioned: bool,
    /// 이력 조회 기본 제한
    pub history_limit: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024, // 50MB
            match_unversioned: false,
            history_limit: 20,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}
