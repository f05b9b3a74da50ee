//! NVD (nvd.nist.gov) 피드 클라이언트
//!
//! CVE API 2.0의 `keywordSearch`로 패키지별 레코드를 조회합니다.
//! NVD 응답은 스키마 변동이 잦아 정적 구조체 대신
//! `serde_json::Value` 탐색으로 필요한 필드만 추출합니다.

use chrono::{DateTime, Utc};
use tracing::debug;

use lockvet_core::error::AdvisoryError;
use lockvet_core::types::{Ecosystem, Severity, VulnSource, Vulnerability};

use crate::sources::seed_packages;

/// 페이지당 결과 수
const RESULTS_PER_PAGE: u32 = 50;

/// NVD API 클라이언트
pub struct NvdClient {
    client: reqwest::Client,
    endpoint: String,
}

impl NvdClient {
    /// 새 클라이언트를 생성합니다.
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// 주어진 에코시스템들의 수집 대상 패키지에 대한 레코드를 가져옵니다.
    pub async fn fetch(
        &self,
        ecosystems: &[Ecosystem],
    ) -> Result<Vec<Vulnerability>, AdvisoryError> {
        let mut records = Vec::new();
        for &eco in ecosystems {
            for package in seed_packages(eco) {
                // Maven 좌표(group:artifact)는 artifact만 키워드로 사용
                let keyword = package.rsplit(':').next().unwrap_or(package);
                let data = self.query(keyword).await?;
                let fetched_at = Utc::now();

                let Some(vulns) = data.get("vulnerabilities").and_then(|v| v.as_array()) else {
                    continue;
                };
                debug!(ecosystem = %eco, package, count = vulns.len(), "nvd query");
                for entry in vulns {
                    if let Some(cve) = entry.get("cve")
                        && let Some(vuln) = to_vulnerability(cve, package, eco, fetched_at)
                    {
                        records.push(vuln);
                    }
                }
            }
        }
        Ok(records)
    }

    async fn query(&self, keyword: &str) -> Result<serde_json::Value, AdvisoryError> {
        let url = format!(
            "{}/rest/json/cves/2.0?keywordSearch={}&resultsPerPage={}",
            self.endpoint, keyword, RESULTS_PER_PAGE
        );

        let response = self
            .client
            .get(&url)
            .header("User-Agent", "lockvet")
            .send()
            .await
            .map_err(|e| AdvisoryError::Network {
                feed: "nvd".to_owned(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AdvisoryError::Network {
                feed: "nvd".to_owned(),
                reason: format!("status {}", response.status()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AdvisoryError::MalformedResponse {
                feed: "nvd".to_owned(),
                reason: e.to_string(),
            })
    }
}

/// CVE 엔트리를 도메인 레코드로 변환합니다.
fn to_vulnerability(
    cve: &serde_json::Value,
    package: &str,
    ecosystem: Ecosystem,
    fetched_at: DateTime<Utc>,
) -> Option<Vulnerability> {
    let id = cve.get("id").and_then(|v| v.as_str())?;

    let description = cve
        .get("descriptions")
        .and_then(|v| v.as_array())
        .and_then(|arr| {
            arr.iter()
                .find(|d| d.get("lang").and_then(|l| l.as_str()) == Some("en"))
        })
        .and_then(|d| d.get("value").and_then(|v| v.as_str()))
        .map(str::to_owned);

    let (cvss_score, label) = extract_severity(cve);
    let affected_versions = extract_ranges(cve);

    Some(Vulnerability {
        id: id.to_owned(),
        source: VulnSource::Nvd,
        severity: Severity::canonicalize(label.as_deref(), cvss_score),
        cvss_score,
        title: description
            .as_deref()
            .and_then(|d| d.lines().next())
            .unwrap_or(id)
            .to_owned(),
        description,
        package: package.to_owned(),
        ecosystem,
        affected_versions,
        fixed_versions: None,
        published_at: cve
            .get("published")
            .and_then(|v| v.as_str())
            .and_then(parse_nvd_timestamp),
        references: cve
            .get("references")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|r| r.get("url").and_then(|u| u.as_str()))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default(),
        fetched_at: Some(fetched_at),
    })
}

/// metrics 블록에서 (CVSS 점수, 심각도 레이블)을 추출합니다.
///
/// v3.1 > v3.0 > v2 순으로 첫 번째로 존재하는 지표를 사용합니다.
fn extract_severity(cve: &serde_json::Value) -> (Option<f64>, Option<String>) {
    let metrics = match cve.get("metrics") {
        Some(m) => m,
        None => return (None, None),
    };
    for key in ["cvssMetricV31", "cvssMetricV30", "cvssMetricV2"] {
        if let Some(first) = metrics
            .get(key)
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            && let Some(data) = first.get("cvssData")
        {
            let score = data.get("baseScore").and_then(serde_json::Value::as_f64);
            let label = data
                .get("baseSeverity")
                .or_else(|| first.get("baseSeverity"))
                .and_then(|v| v.as_str())
                .map(str::to_owned);
            return (score, label);
        }
    }
    (None, None)
}

/// configurations의 cpeMatch 항목에서 버전 범위 표현식을 구성합니다.
fn extract_ranges(cve: &serde_json::Value) -> Option<String> {
    let mut parts = Vec::new();
    let configurations = cve.get("configurations")?.as_array()?;
    for config in configurations {
        let Some(nodes) = config.get("nodes").and_then(|v| v.as_array()) else {
            continue;
        };
        for node in nodes {
            let Some(matches) = node.get("cpeMatch").and_then(|v| v.as_array()) else {
                continue;
            };
            for cpe_match in matches {
                if cpe_match.get("vulnerable").and_then(serde_json::Value::as_bool) != Some(true) {
                    continue;
                }
                let mut conj = Vec::new();
                if let Some(v) = cpe_match
                    .get("versionStartIncluding")
                    .and_then(|v| v.as_str())
                {
                    conj.push(format!(">= {v}"));
                }
                if let Some(v) = cpe_match
                    .get("versionStartExcluding")
                    .and_then(|v| v.as_str())
                {
                    conj.push(format!("> {v}"));
                }
                if let Some(v) = cpe_match.get("versionEndExcluding").and_then(|v| v.as_str()) {
                    conj.push(format!("< {v}"));
                }
                if let Some(v) = cpe_match.get("versionEndIncluding").and_then(|v| v.as_str()) {
                    conj.push(format!("<= {v}"));
                }
                if !conj.is_empty() {
                    parts.push(conj.join(", "));
                }
            }
        }
    }
    (!parts.is_empty()).then(|| parts.join("; "))
}

/// NVD 타임스탬프는 오프셋 없는 ISO 8601이므로 UTC로 간주합니다.
fn parse_nvd_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
