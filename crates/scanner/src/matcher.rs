//! 버전 매칭 — 패키지 선언과 어드바이저리 레코드 대조
//!
//! 판정 규칙 (우선순위 순):
//! 1. 설치 버전이 수정 버전 목록 중 하나와 정확히 일치하면 제외
//!    (수정 버전이 영향 범위보다 우선).
//! 2. 영향 범위 표현식이 있으면 에코시스템 비교 의미론으로 평가.
//! 3. 영향 범위가 없는 레코드는 "데이터 부족"으로 제외하되,
//!    `match_unversioned`가 켜져 있으면 이름 일치만으로 매칭.
//!
//! 같은 `(패키지, 취약점 ID)` 쌍은 출처가 여러 개여도 한 번만
//! 보고합니다. 결과는 심각도 내림차순, CVSS 내림차순(없음은 뒤),
//! ID 오름차순으로 정렬됩니다.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use lockvet_core::types::{PackageDeclaration, VulnMatch, Vulnerability};

use crate::version::{self, VersionScheme};

/// 버전 매처
pub struct VersionMatcher {
    match_unversioned: bool,
}

impl VersionMatcher {
    /// 매처를 생성합니다.
    ///
    /// `match_unversioned`: 버전 범위가 없는 레코드를 이름만으로
    /// 매칭할지 여부 (보수적 모드).
    pub fn new(match_unversioned: bool) -> Self {
        Self { match_unversioned }
    }

    /// 한 패키지를 후보 레코드들과 대조합니다.
    pub fn match_package(
        &self,
        package: &PackageDeclaration,
        candidates: &[Vulnerability],
    ) -> Vec<VulnMatch> {
        let scheme = VersionScheme::for_ecosystem(package.ecosystem);
        let mut seen: HashSet<&str> = HashSet::new();
        let mut matches = Vec::new();

        for vuln in candidates {
            if vuln.package != package.name || vuln.ecosystem != package.ecosystem {
                continue;
            }
            // 출처가 겹치는 동일 ID는 한 번만
            if seen.contains(vuln.id.as_str()) {
                continue;
            }
            if !self.is_affected(scheme, &package.version, vuln) {
                continue;
            }
            seen.insert(&vuln.id);
            matches.push(VulnMatch {
                package: package.name.clone(),
                installed_version: package.version.clone(),
                vulnerability: vuln.clone(),
            });
        }

        sort_matches(&mut matches);
        matches
    }

    fn is_affected(&self, scheme: VersionScheme, installed: &str, vuln: &Vulnerability) -> bool {
        // 수정 버전과 정확히 일치하면 영향 범위보다 우선해 제외
        if let Some(fixed) = &vuln.fixed_versions
            && fixed
                .split([',', ';'])
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .any(|v| version::compare(scheme, installed, v) == Ordering::Equal)
        {
            return false;
        }

        match &vuln.affected_versions {
            Some(expr) => version::satisfies(scheme, installed, expr),
            None => {
                if !self.match_unversioned {
                    debug!(
                        vuln = %vuln.id,
                        package = %vuln.package,
                        "record has no affected range, excluded as insufficient data"
                    );
                }
                self.match_unversioned
            }
        }
    }
}

/// 심각도 내림차순 → CVSS 내림차순(없음은 뒤) → ID 오름차순
pub fn sort_matches(matches: &mut [VulnMatch]) {
    matches.sort_by(|a, b| {
        let va = &a.vulnerability;
        let vb = &b.vulnerability;
        vb.severity
            .cmp(&va.severity)
            .then_with(|| match (va.cvss_score, vb.cvss_score) {
                (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| va.id.cmp(&vb.id))
    });
}
