//! GitHub Security Advisories 피드 클라이언트
//!
//! 전역 어드바이저리 목록 API(`GET /advisories`)를 에코시스템 필터로
//! 조회합니다. 인증 없이 동작하는 REST 엔드포인트를 사용합니다.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use lockvet_core::error::AdvisoryError;
use lockvet_core::types::{Ecosystem, Severity, VulnSource, Vulnerability};

/// 페이지당 결과 수
const PER_PAGE: u32 = 100;

/// GitHub Security Advisories 클라이언트
pub struct GithubClient {
    client: reqwest::Client,
    endpoint: String,
}

/// 어드바이저리 엔트리 (파싱용)
#[derive(Deserialize)]
struct GhAdvisory {
    ghsa_id: String,
    #[serde(default)]
    cve_id: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    cvss: Option<GhCvss>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    references: Vec<String>,
    #[serde(default)]
    vulnerabilities: Vec<GhVulnerability>,
}

#[derive(Deserialize)]
struct GhCvss {
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Deserialize)]
struct GhVulnerability {
    #[serde(default)]
    package: Option<GhPackage>,
    #[serde(default)]
    vulnerable_version_range: Option<String>,
    #[serde(default)]
    first_patched_version: Option<String>,
}

#[derive(Deserialize)]
struct GhPackage {
    #[serde(default)]
    name: Option<String>,
}

impl GithubClient {
    /// 새 클라이언트를 생성합니다.
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// 주어진 에코시스템들의 최신 어드바이저리를 가져옵니다.
    pub async fn fetch(
        &self,
        ecosystems: &[Ecosystem],
    ) -> Result<Vec<Vulnerability>, AdvisoryError> {
        let mut records = Vec::new();
        for &eco in ecosystems {
            // GitHub이 지원하지 않는 에코시스템은 건너뜀
            let Some(gh_name) = github_ecosystem(eco) else {
                continue;
            };
            let advisories = self.list(gh_name).await?;
            debug!(ecosystem = %eco, count = advisories.len(), "github advisories");
            let fetched_at = Utc::now();
            for advisory in &advisories {
                records.extend(to_vulnerabilities(advisory, eco, fetched_at));
            }
        }
        Ok(records)
    }

    async fn list(&self, gh_ecosystem: &str) -> Result<Vec<GhAdvisory>, AdvisoryError> {
        let url = format!(
            "{}/advisories?ecosystem={}&per_page={}",
            self.endpoint, gh_ecosystem, PER_PAGE
        );

        let response = self
            .client
            .get(&url)
            .header("User-Agent", "lockvet")
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| AdvisoryError::Network {
                feed: "github".to_owned(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AdvisoryError::Network {
                feed: "github".to_owned(),
                reason: format!("status {}", response.status()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AdvisoryError::MalformedResponse {
                feed: "github".to_owned(),
                reason: e.to_string(),
            })
    }
}

/// GitHub API의 에코시스템 파라미터 이름
fn github_ecosystem(ecosystem: Ecosystem) -> Option<&'static str> {
    match ecosystem {
        Ecosystem::Npm => Some("npm"),
        Ecosystem::CratesIo => Some("rust"),
        Ecosystem::PyPi => Some("pip"),
        Ecosystem::Go => Some("go"),
        Ecosystem::Maven => Some("maven"),
        Ecosystem::NuGet => Some("nuget"),
        Ecosystem::RubyGems => Some("rubygems"),
        Ecosystem::Packagist => Some("composer"),
        Ecosystem::Pub => Some("pub"),
        Ecosystem::Hex => Some("erlang"),
        Ecosystem::SwiftUrl => Some("swift"),
        Ecosystem::CocoaPods => None,
    }
}

/// 어드바이저리 한 건을 패키지별 레코드들로 변환합니다.
///
/// GitHub의 `vulnerable_version_range`는 이미 ">= a, < b" 형태의
/// 범위 표현식이므로 그대로 사용합니다.
fn to_vulnerabilities(
    advisory: &GhAdvisory,
    ecosystem: Ecosystem,
    fetched_at: DateTime<Utc>,
) -> Vec<Vulnerability> {
    let id = advisory
        .cve_id
        .clone()
        .unwrap_or_else(|| advisory.ghsa_id.clone());
    let cvss_score = advisory.cvss.as_ref().and_then(|c| c.score);
    let severity = Severity::canonicalize(advisory.severity.as_deref(), cvss_score);
    let published_at = advisory
        .published_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    advisory
        .vulnerabilities
        .iter()
        .filter_map(|entry| {
            let package = entry.package.as_ref()?.name.clone()?;
            Some(Vulnerability {
                id: id.clone(),
                source: VulnSource::Github,
                severity,
                cvss_score,
                title: advisory
                    .summary
                    .clone()
                    .unwrap_or_else(|| advisory.ghsa_id.clone()),
                description: advisory.description.clone(),
                package,
                ecosystem,
                affected_versions: entry.vulnerable_version_range.clone(),
                fixed_versions: entry.first_patched_version.clone(),
                published_at,
                references: advisory.references.clone(),
                fetched_at: Some(fetched_at),
            })
        })
        .collect()
}
