//! 스캔 오케스트레이터와 명령 표면
//!
//! [`ScanService`]는 탐지 → 파싱 → 매칭 → 집계 파이프라인을 단계
//! 상태 기계로 실행합니다. 단계 전이 사이에만 취소를 확인하므로,
//! 취소된 스캔은 부분 결과나 이력을 남기지 않습니다.
//!
//! 같은 디렉토리(정규화된 절대 경로 기준)에 대한 동시 스캔은
//! [`ScanRegistry`]가 막습니다. 서로 다른 디렉토리는 동시에 스캔할
//! 수 있습니다.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use lockvet_advisory::AdvisoryCache;
use lockvet_core::config::ScanConfig;
use lockvet_core::error::{LockvetError, ScanError};
use lockvet_core::types::{
    CoverageCaveat, Ecosystem, PackageDeclaration, ScanHistoryEntry, ScanResult, ScanWarning,
    VulnMatch, Vulnerability,
};

use crate::detector::LockfileDetector;
use crate::matcher::VersionMatcher;
use crate::parser;
use crate::report::{self, SeverityReport};

/// 스캔 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Detecting,
    Parsing,
    Matching,
    Aggregating,
    Done,
    Failed,
}

impl ScanState {
    /// 허용된 전이인지 확인합니다. `Failed`는 모든 비종결 단계에서
    /// 진입 가능한 종결 상태입니다.
    pub fn can_transition(self, next: Self) -> bool {
        use ScanState::*;
        matches!(
            (self, next),
            (Idle, Detecting)
                | (Detecting, Parsing)
                | (Parsing, Matching)
                | (Matching, Aggregating)
                | (Aggregating, Done)
        ) || (!self.is_terminal() && next == Failed)
    }

    /// 종결 상태 여부
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// 진행 중 스캔 레지스트리
///
/// 정규화된 디렉토리 경로 기준으로 동시 스캔을 막습니다.
#[derive(Debug, Default)]
pub struct ScanRegistry {
    in_flight: Mutex<Vec<PathBuf>>,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 디렉토리 점유를 시도합니다. 이미 스캔 중이면
    /// [`ScanError::ScanInProgress`]입니다.
    pub fn try_acquire(self: &Arc<Self>, directory: &Path) -> Result<ScanGuard, ScanError> {
        let mut in_flight = self.lock();
        if in_flight.iter().any(|p| p == directory) {
            return Err(ScanError::ScanInProgress {
                path: directory.display().to_string(),
            });
        }
        in_flight.push(directory.to_path_buf());
        Ok(ScanGuard {
            registry: Arc::clone(self),
            directory: directory.to_path_buf(),
        })
    }

    /// 해당 디렉토리가 스캔 중인지
    pub fn is_in_flight(&self, directory: &Path) -> bool {
        self.lock().iter().any(|p| p == directory)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 레지스트리 점유 RAII 가드 — drop 시 해제됩니다.
#[derive(Debug)]
pub struct ScanGuard {
    registry: Arc<ScanRegistry>,
    directory: PathBuf,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.registry.lock().retain(|p| p != &self.directory);
    }
}

/// 스캔 한 번의 산출물
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// 스캔 결과
    pub result: ScanResult,
    /// 심각도별 리포트
    pub report: SeverityReport,
}

/// 스캔 서비스 — 명령 표면의 구현체
pub struct ScanService {
    cache: Arc<AdvisoryCache>,
    config: ScanConfig,
    registry: Arc<ScanRegistry>,
}

impl ScanService {
    /// 새 서비스를 생성합니다.
    pub fn new(cache: Arc<AdvisoryCache>, config: ScanConfig) -> Self {
        Self::with_registry(cache, config, Arc::new(ScanRegistry::new()))
    }

    /// 공유 레지스트리로 서비스를 생성합니다 (여러 서비스 인스턴스가
    /// 같은 디렉토리 잠금을 공유해야 할 때).
    pub fn with_registry(
        cache: Arc<AdvisoryCache>,
        config: ScanConfig,
        registry: Arc<ScanRegistry>,
    ) -> Self {
        Self {
            cache,
            config,
            registry,
        }
    }

    /// 레지스트리 핸들
    pub fn registry(&self) -> &Arc<ScanRegistry> {
        &self.registry
    }

    /// 디렉토리를 스캔합니다.
    ///
    /// 네트워크를 사용하지 않고 로컬 캐시만 대조합니다. 성공 시
    /// 탐지된 에코시스템별로 이력 한 행씩 기록하며, 실패하거나
    /// 취소된 스캔은 이력을 남기지 않습니다.
    pub async fn scan_directory(
        &self,
        directory: &Path,
        cancel: Option<&CancellationToken>,
    ) -> Result<ScanOutcome, LockvetError> {
        let canonical = std::fs::canonicalize(directory).map_err(|source| ScanError::Io {
            path: directory.display().to_string(),
            source,
        })?;
        let _guard = self.registry.try_acquire(&canonical)?;

        let mut state = ScanState::Idle;
        let scan_id = Uuid::new_v4();
        info!(scan_id = %scan_id, directory = %canonical.display(), "scan started");

        // Detecting
        advance(&mut state, ScanState::Detecting, cancel)?;
        let detector = LockfileDetector::new(self.config.max_file_size);
        let detection = detector.detect(&canonical)?;

        // Parsing
        advance(&mut state, ScanState::Parsing, cancel)?;
        let mut warnings = detection.warnings;
        let mut caveats: Vec<CoverageCaveat> = Vec::new();
        let mut packages: Vec<PackageDeclaration> = Vec::new();
        let mut ecosystems: Vec<Ecosystem> = Vec::new();

        for lockfile in &detection.lockfiles {
            if !ecosystems.contains(&lockfile.ecosystem) {
                ecosystems.push(lockfile.ecosystem);
            }
            let Some(file_parser) = parser::parser_for(&lockfile.path) else {
                continue;
            };
            let display_path = lockfile.path.display().to_string();

            let content = match tokio::fs::read_to_string(&lockfile.path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = %display_path, error = %e, "lockfile unreadable, skipping");
                    warnings.push(ScanWarning {
                        file: display_path,
                        ecosystem: lockfile.ecosystem,
                        reason: format!("read failed: {e}"),
                    });
                    continue;
                }
            };

            match file_parser.parse(&content, &display_path) {
                Ok(parsed) => {
                    if let Some(note) = file_parser.coverage_caveat(&lockfile.path) {
                        caveats.push(CoverageCaveat {
                            ecosystem: lockfile.ecosystem,
                            file: display_path,
                            note,
                        });
                    }
                    packages.extend(parsed);
                }
                Err(e) => {
                    warn!(file = %display_path, error = %e, "lockfile parse failed, skipping");
                    warnings.push(ScanWarning {
                        file: display_path,
                        ecosystem: lockfile.ecosystem,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Matching
        advance(&mut state, ScanState::Matching, cancel)?;
        let matcher = VersionMatcher::new(self.config.match_unversioned);
        let mut matches: Vec<VulnMatch> = Vec::new();
        let mut candidates: HashMap<(Ecosystem, String), Vec<Vulnerability>> = HashMap::new();

        for package in &packages {
            let key = (package.ecosystem, package.name.clone());
            if !candidates.contains_key(&key) {
                let found = self.cache.lookup(package.ecosystem, &package.name).await?;
                candidates.insert(key.clone(), found);
            }
            matches.extend(matcher.match_package(package, &candidates[&key]));
        }
        // 패키지 단위 정렬을 전역 순서로 재적용
        crate::matcher::sort_matches(&mut matches);

        // Aggregating
        advance(&mut state, ScanState::Aggregating, cancel)?;
        let severity_report = report::aggregate(&matches);

        // Done — 이력 기록은 성공 경로에서만
        advance(&mut state, ScanState::Done, cancel)?;
        let scanned_at = Utc::now();
        for &ecosystem in &ecosystems {
            let count = matches
                .iter()
                .filter(|m| m.vulnerability.ecosystem == ecosystem)
                .count() as u32;
            self.cache
                .record_scan(&canonical.display().to_string(), ecosystem, count, scanned_at)
                .await?;
        }

        info!(
            scan_id = %scan_id,
            packages = packages.len(),
            vulnerabilities = matches.len(),
            warnings = warnings.len(),
            "scan complete"
        );

        let result = ScanResult {
            scan_id,
            directory: canonical,
            ecosystems,
            matches,
            warnings,
            caveats,
            total_packages: packages.len(),
            scanned_at,
        };
        Ok(ScanOutcome {
            result,
            report: severity_report,
        })
    }

    /// 업스트림 피드에서 어드바이저리를 수집합니다.
    ///
    /// 빈 목록은 지원하는 전체 에코시스템을 의미합니다.
    pub async fn fetch_vulnerabilities(
        &self,
        ecosystems: &[Ecosystem],
    ) -> Result<u64, LockvetError> {
        Ok(self.cache.refresh(ecosystems).await?)
    }

    /// 최근 스캔 이력을 조회합니다 (최신 우선).
    pub async fn get_scan_history(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<ScanHistoryEntry>, LockvetError> {
        let limit = limit.unwrap_or(self.config.history_limit);
        Ok(self.cache.recent_scans(limit).await?)
    }

    /// 어드바이저리 ID로 상세를 조회합니다 (캐시 전용).
    pub async fn get_vulnerability_detail(
        &self,
        id: &str,
    ) -> Result<Option<Vulnerability>, LockvetError> {
        Ok(self.cache.detail(id).await?)
    }
}

fn advance(
    state: &mut ScanState,
    next: ScanState,
    cancel: Option<&CancellationToken>,
) -> Result<(), ScanError> {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
        *state = ScanState::Failed;
        return Err(ScanError::Cancelled);
    }
    debug_assert!(state.can_transition(next), "invalid scan state transition");
    *state = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_allows_pipeline_order() {
        use ScanState::*;
        assert!(Idle.can_transition(Detecting));
        assert!(Detecting.can_transition(Parsing));
        assert!(Parsing.can_transition(Matching));
        assert!(Matching.can_transition(Aggregating));
        assert!(Aggregating.can_transition(Done));
    }

    #[test]
    fn state_machine_rejects_skips_and_backtracks() {
        use ScanState::*;
        assert!(!Idle.can_transition(Parsing));
        assert!(!Matching.can_transition(Detecting));
        assert!(!Done.can_transition(Detecting));
    }

    #[test]
    fn failed_is_reachable_from_non_terminal_only() {
        use ScanState::*;
        assert!(Idle.can_transition(Failed));
        assert!(Matching.can_transition(Failed));
        assert!(!Done.can_transition(Failed));
        assert!(!Failed.can_transition(Failed));
        assert!(Failed.is_terminal());
        assert!(Done.is_terminal());
    }

    #[test]
    fn registry_blocks_same_directory() {
        let registry = Arc::new(ScanRegistry::new());
        let dir = PathBuf::from("/tmp/project");

        let guard = registry.try_acquire(&dir).unwrap();
        assert!(registry.is_in_flight(&dir));
        assert!(matches!(
            registry.try_acquire(&dir),
            Err(ScanError::ScanInProgress { .. })
        ));

        drop(guard);
        assert!(!registry.is_in_flight(&dir));
        assert!(registry.try_acquire(&dir).is_ok());
    }

    #[test]
    fn registry_allows_different_directories() {
        let registry = Arc::new(ScanRegistry::new());
        let _a = registry.try_acquire(Path::new("/tmp/a")).unwrap();
        let _b = registry.try_acquire(Path::new("/tmp/b")).unwrap();
        assert!(registry.is_in_flight(Path::new("/tmp/a")));
        assert!(registry.is_in_flight(Path::new("/tmp/b")));
    }

    #[test]
    fn cancelled_token_fails_transition() {
        let token = CancellationToken::new();
        token.cancel();
        let mut state = ScanState::Idle;
        let err = advance(&mut state, ScanState::Detecting, Some(&token)).unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
        assert_eq!(state, ScanState::Failed);
    }
}
