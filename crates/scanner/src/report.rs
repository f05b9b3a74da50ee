//! 심각도별 리포트 집계
//!
//! 매칭 결과를 변형하지 않는 순수 집계입니다. 같은 매칭 목록에 대해
//! 항상 같은 리포트를 생성하며, 심각도별 개수의 합은 전체 개수와
//! 일치합니다.

use serde::{Deserialize, Serialize};

use lockvet_core::types::{Severity, VulnMatch};

/// 심각도별 개수
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    /// 전체 개수
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }

    fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

/// 심각도 그룹 (심각도 내림차순, 그룹 내 매처 정렬 순서 유지)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityGroup {
    pub severity: Severity,
    pub matches: Vec<VulnMatch>,
}

/// 심각도별 리포트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityReport {
    pub counts: SeverityCounts,
    pub groups: Vec<SeverityGroup>,
}

impl SeverityReport {
    /// 리포트에 등장하는 최고 심각도
    pub fn highest_severity(&self) -> Option<Severity> {
        self.groups.first().map(|g| g.severity)
    }
}

/// 매칭 목록을 심각도별로 집계합니다.
pub fn aggregate(matches: &[VulnMatch]) -> SeverityReport {
    let mut counts = SeverityCounts::default();
    for m in matches {
        counts.bump(m.vulnerability.severity);
    }

    let mut groups = Vec::new();
    for severity in [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ] {
        let grouped: Vec<VulnMatch> = matches
            .iter()
            .filter(|m| m.vulnerability.severity == severity)
            .cloned()
            .collect();
        if !grouped.is_empty() {
            groups.push(SeverityGroup {
                severity,
                matches: grouped,
            });
        }
    }

    SeverityReport { counts, groups }
}
