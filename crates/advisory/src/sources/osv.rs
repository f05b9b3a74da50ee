//! OSV (osv.dev) 피드 클라이언트
//!
//! `POST /v1/query`로 패키지별 취약점을 조회하고 응답을
//! [`Vulnerability`] 레코드로 변환합니다.
//!
//! OSV의 범위 표현은 이벤트 시퀀스(introduced / fixed / last_affected)로
//! 되어 있어, 매처가 파싱하는 범위 표현식(">= a, < b")으로 변환합니다.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use lockvet_core::error::AdvisoryError;
use lockvet_core::types::{Ecosystem, Severity, VulnSource, Vulnerability};

use crate::sources::seed_packages;

/// OSV API 클라이언트
pub struct OsvClient {
    client: reqwest::Client,
    endpoint: String,
}

/// `/v1/query` 응답
#[derive(Deserialize)]
struct OsvQueryResponse {
    #[serde(default)]
    vulns: Vec<OsvVulnerability>,
}

/// OSV 취약점 엔트리 (파싱용)
#[derive(Deserialize)]
struct OsvVulnerability {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    severity: Vec<OsvSeverity>,
    #[serde(default)]
    affected: Vec<OsvAffected>,
    #[serde(default)]
    references: Vec<OsvReference>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    database_specific: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct OsvSeverity {
    #[serde(default, rename = "type")]
    _kind: Option<String>,
    #[serde(default)]
    score: Option<String>,
}

#[derive(Deserialize)]
struct OsvAffected {
    #[serde(default)]
    package: Option<OsvPackage>,
    #[serde(default)]
    ranges: Vec<OsvRange>,
    #[serde(default)]
    versions: Vec<String>,
}

#[derive(Deserialize)]
struct OsvPackage {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ecosystem: Option<String>,
}

#[derive(Deserialize)]
struct OsvRange {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    events: Vec<OsvEvent>,
}

#[derive(Deserialize)]
struct OsvEvent {
    #[serde(default)]
    introduced: Option<String>,
    #[serde(default)]
    fixed: Option<String>,
    #[serde(default)]
    last_affected: Option<String>,
    #[serde(default)]
    limit: Option<String>,
}

#[derive(Deserialize)]
struct OsvReference {
    #[serde(default)]
    url: Option<String>,
}

impl OsvClient {
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
                let vulns = self.query(eco, package).await?;
                debug!(ecosystem = %eco, package, count = vulns.len(), "osv query");
                let fetched_at = Utc::now();
                for vuln in &vulns {
                    records.extend(to_vulnerability(vuln, package, eco, fetched_at));
                }
            }
        }
        Ok(records)
    }

    async fn query(
        &self,
        ecosystem: Ecosystem,
        package: &str,
    ) -> Result<Vec<OsvVulnerability>, AdvisoryError> {
        let url = format!("{}/v1/query", self.endpoint);
        let body = serde_json::json!({
            "package": {
                "name": package,
                "ecosystem": ecosystem.canonical_name(),
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisoryError::Network {
                feed: "osv".to_owned(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AdvisoryError::Network {
                feed: "osv".to_owned(),
                reason: format!("status {}", response.status()),
            });
        }

        let parsed: OsvQueryResponse =
            response
                .json()
                .await
                .map_err(|e| AdvisoryError::MalformedResponse {
                    feed: "osv".to_owned(),
                    reason: e.to_string(),
                })?;
        Ok(parsed.vulns)
    }
}

/// OSV 엔트리를 도메인 레코드로 변환합니다.
///
/// affected 항목 중 조회한 패키지와 일치하는 것만 사용하며,
/// 일치 항목이 없으면 빈 결과를 반환합니다.
fn to_vulnerability(
    osv: &OsvVulnerability,
    package: &str,
    ecosystem: Ecosystem,
    fetched_at: DateTime<Utc>,
) -> Option<Vulnerability> {
    let affected = osv.affected.iter().find(|a| {
        a.package.as_ref().is_some_and(|p| {
            p.name.as_deref() == Some(package)
                && p.ecosystem.as_deref() == Some(ecosystem.canonical_name())
        })
    })?;

    let (affected_versions, fixed_versions) = range_expressions(affected);
    let cvss_score = numeric_cvss(&osv.severity);
    let label = osv
        .database_specific
        .as_ref()
        .and_then(|v| v.get("severity"))
        .and_then(|v| v.as_str());

    let title = osv
        .summary
        .clone()
        .or_else(|| {
            osv.details
                .as_deref()
                .and_then(|d| d.lines().next())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| osv.id.clone());

    Some(Vulnerability {
        id: osv.id.clone(),
        source: VulnSource::Osv,
        severity: Severity::canonicalize(label, cvss_score),
        cvss_score,
        title,
        description: osv.details.clone(),
        package: package.to_owned(),
        ecosystem,
        affected_versions,
        fixed_versions,
        published_at: osv
            .published
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        references: osv
            .references
            .iter()
            .filter_map(|r| r.url.clone())
            .collect(),
        fetched_at: Some(fetched_at),
    })
}

/// OSV 심각도 항목에서 숫자 점수를 추출합니다.
///
/// OSV는 보통 CVSS 벡터 문자열을 실으므로 숫자로 파싱되는 항목만
/// 사용합니다 (벡터 문자열은 무시).
fn numeric_cvss(entries: &[OsvSeverity]) -> Option<f64> {
    entries
        .iter()
        .filter_map(|s| s.score.as_deref())
        .find_map(|s| s.parse::<f64>().ok())
}

/// 이벤트 시퀀스를 (영향 범위, 수정 버전) 표현식으로 변환합니다.
fn range_expressions(affected: &OsvAffected) -> (Option<String>, Option<String>) {
    let mut parts: Vec<String> = Vec::new();
    let mut fixed: Vec<String> = Vec::new();

    for range in &affected.ranges {
        // GIT 범위는 커밋 해시라 버전 비교가 불가능
        if range.kind.as_deref() == Some("GIT") {
            continue;
        }
        let mut open: Option<String> = None;
        for event in &range.events {
            if let Some(intro) = &event.introduced {
                open = Some(intro.clone());
            } else if let Some(fix) = &event.fixed {
                parts.push(close_range(open.take(), "<", fix));
                fixed.push(fix.clone());
            } else if let Some(last) = &event.last_affected {
                parts.push(close_range(open.take(), "<=", last));
            } else if event.limit.is_some() {
                // limit 이벤트는 범위 종료만 의미하므로 무시
                open = None;
            }
        }
        if let Some(intro) = open {
            parts.push(if intro == "0" {
                "*".to_owned()
            } else {
                format!(">= {intro}")
            });
        }
    }

    // 명시적 버전 목록만 있는 경우
    if parts.is_empty() && !affected.versions.is_empty() {
        parts.extend(affected.versions.iter().map(|v| format!("== {v}")));
    }

    let affected_expr = (!parts.is_empty()).then(|| parts.join("; "));
    let fixed_expr = (!fixed.is_empty()).then(|| fixed.join(", "));
    (affected_expr, fixed_expr)
}

fn close_range(open: Option<String>, op: &str, version: &str) -> String {
    match open {
        Some(intro) if intro != "0" => format!(">= {intro}, {op} {version}"),
        _ => format!("{op} {version}"),
    }
}
