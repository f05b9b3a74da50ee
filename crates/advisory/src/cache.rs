//! 어드바이저리 캐시 — 갱신 오케스트레이션과 조회 진입점
//!
//! [`AdvisoryCache`]는 출처별 피드 클라이언트와 로컬 저장소를 묶습니다.
//!
//! 동시성 규칙:
//! - 출처별 upsert 구간은 `tokio::sync::Mutex`로 배타적입니다
//!   (같은 출처의 갱신이 겹치면 부분 쓰기가 섞일 수 있음).
//! - 조회는 저장소 읽기만 수행하므로 갱신과 동시에 진행될 수 있고,
//!   WAL 스냅샷 덕분에 갱신 전/후 중 일관된 상태만 관측합니다.
//! - 네트워크 호출은 출처별 타임아웃으로 제한되며, 실패한 출처는
//!   캐시를 변경하지 않습니다.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use lockvet_core::config::CacheConfig;
use lockvet_core::error::AdvisoryError;
use lockvet_core::types::{Ecosystem, ScanHistoryEntry, VulnSource, Vulnerability};

use crate::sources::{GithubClient, NvdClient, OsvClient};
use crate::store::AdvisoryStore;

/// 어드바이저리 캐시
pub struct AdvisoryCache {
    store: AdvisoryStore,
    osv: OsvClient,
    nvd: NvdClient,
    github: GithubClient,
    sources: Vec<VulnSource>,
    timeout_secs: u64,
    refresh_locks: HashMap<VulnSource, Mutex<()>>,
}

impl AdvisoryCache {
    /// 설정된 경로의 데이터베이스를 열어 캐시를 생성합니다.
    pub async fn open(config: &CacheConfig) -> Result<Self, AdvisoryError> {
        let store = AdvisoryStore::open(&config.database_path).await?;
        Ok(Self::with_store(store, config))
    }

    /// 이미 열린 저장소로 캐시를 생성합니다 (테스트 및 공유 풀 용).
    pub fn with_store(store: AdvisoryStore, config: &CacheConfig) -> Self {
        let client = reqwest::Client::new();
        let sources = config.enabled_sources();
        let refresh_locks = [VulnSource::Osv, VulnSource::Nvd, VulnSource::Github]
            .into_iter()
            .map(|s| (s, Mutex::new(())))
            .collect();

        Self {
            store,
            osv: OsvClient::new(client.clone(), config.osv_endpoint.clone()),
            nvd: NvdClient::new(client.clone(), config.nvd_endpoint.clone()),
            github: GithubClient::new(client, config.github_endpoint.clone()),
            sources,
            timeout_secs: config.timeout_secs,
            refresh_locks,
        }
    }

    /// 내부 저장소 핸들
    pub fn store(&self) -> &AdvisoryStore {
        &self.store
    }

    /// 업스트림 피드에서 레코드를 수집해 upsert합니다.
    ///
    /// 빈 에코시스템 목록은 "알려진 전체"를 의미합니다.
    /// 반환값은 추가/갱신된 레코드 수입니다 (멱등: 변화 없는 재실행은 0).
    ///
    /// 출처 단위로 격리되어, 실패한 출처는 캐시에 아무것도 쓰지 않습니다.
    /// 모든 출처가 실패한 경우에만 에러를 반환합니다.
    pub async fn refresh(&self, ecosystems: &[Ecosystem]) -> Result<u64, AdvisoryError> {
        let ecosystems: &[Ecosystem] = if ecosystems.is_empty() {
            &Ecosystem::ALL
        } else {
            ecosystems
        };

        let mut total = 0u64;
        let mut failures: Vec<AdvisoryError> = Vec::new();

        for &source in &self.sources {
            let _guard = self.refresh_locks[&source].lock().await;

            let pull = async {
                match source {
                    VulnSource::Osv => self.osv.fetch(ecosystems).await,
                    VulnSource::Nvd => self.nvd.fetch(ecosystems).await,
                    VulnSource::Github => self.github.fetch(ecosystems).await,
                }
            };

            match tokio::time::timeout(Duration::from_secs(self.timeout_secs), pull).await {
                Err(_) => {
                    warn!(source = %source, secs = self.timeout_secs, "feed timed out, cache unchanged");
                    failures.push(AdvisoryError::Timeout {
                        feed: source.to_string(),
                        secs: self.timeout_secs,
                    });
                }
                Ok(Err(e)) => {
                    warn!(source = %source, error = %e, "feed failed, cache unchanged");
                    failures.push(e);
                }
                Ok(Ok(records)) => {
                    let changed = self.store.upsert_all(&records).await?;
                    info!(
                        source = %source,
                        fetched = records.len(),
                        changed,
                        "advisory refresh complete"
                    );
                    total += changed;
                }
            }
        }

        if !failures.is_empty() && failures.len() == self.sources.len() {
            return Err(failures.remove(0));
        }
        Ok(total)
    }

    /// `(ecosystem, package)` 후보 집합 조회 — 네트워크를 사용하지 않습니다.
    pub async fn lookup(
        &self,
        ecosystem: Ecosystem,
        package: &str,
    ) -> Result<Vec<Vulnerability>, AdvisoryError> {
        self.store.lookup(ecosystem, package).await
    }

    /// 어드바이저리 ID로 단건 조회 (캐시 전용)
    pub async fn detail(&self, id: &str) -> Result<Option<Vulnerability>, AdvisoryError> {
        self.store.detail(id).await
    }

    /// 스캔 이력 한 행을 기록합니다.
    pub async fn record_scan(
        &self,
        directory: &str,
        ecosystem: Ecosystem,
        vulnerability_count: u32,
        scanned_at: DateTime<Utc>,
    ) -> Result<i64, AdvisoryError> {
        self.store
            .record_scan(directory, ecosystem, vulnerability_count, scanned_at)
            .await
    }

    /// 최근 스캔 이력 조회 (최신 우선)
    pub async fn recent_scans(&self, limit: u32) -> Result<Vec<ScanHistoryEntry>, AdvisoryError> {
        self.store.recent_scans(limit).await
    }
}
