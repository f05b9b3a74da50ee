//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 에코시스템, 심각도, 취약점 레코드 등 모든 크레이트가 공유하는
//! 데이터 구조를 정의합니다.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 패키징 에코시스템
///
/// 지원하는 패키지 관리 시스템의 닫힌 열거형입니다.
/// 각 에코시스템은 하나 이상의 lockfile 파일명에 대응합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ecosystem {
    /// npm (package-lock.json, pnpm-lock.yaml, yarn.lock)
    #[serde(rename = "npm")]
    Npm,
    /// crates.io (Cargo.lock)
    #[serde(rename = "crates.io")]
    CratesIo,
    /// PyPI (requirements.txt, poetry.lock, Pipfile.lock)
    #[serde(rename = "PyPI")]
    PyPi,
    /// Go modules (go.sum)
    #[serde(rename = "Go")]
    Go,
    /// Maven (pom.xml, gradle.lockfile)
    #[serde(rename = "Maven")]
    Maven,
    /// NuGet (packages.lock.json)
    #[serde(rename = "NuGet")]
    NuGet,
    /// RubyGems (Gemfile.lock)
    #[serde(rename = "RubyGems")]
    RubyGems,
    /// Packagist (composer.lock)
    #[serde(rename = "Packagist")]
    Packagist,
    /// Pub (pubspec.lock)
    #[serde(rename = "Pub")]
    Pub,
    /// Hex (mix.lock)
    #[serde(rename = "Hex")]
    Hex,
    /// CocoaPods (Podfile.lock)
    #[serde(rename = "CocoaPods")]
    CocoaPods,
    /// Swift Package Manager (Package.resolved)
    #[serde(rename = "SwiftURL")]
    SwiftUrl,
}

impl Ecosystem {
    /// 모든 에코시스템 목록
    pub const ALL: [Ecosystem; 12] = [
        Ecosystem::Npm,
        Ecosystem::CratesIo,
        Ecosystem::PyPi,
        Ecosystem::Go,
        Ecosystem::Maven,
        Ecosystem::NuGet,
        Ecosystem::RubyGems,
        Ecosystem::Packagist,
        Ecosystem::Pub,
        Ecosystem::Hex,
        Ecosystem::CocoaPods,
        Ecosystem::SwiftUrl,
    ];

    /// 정규 이름 (OSV 데이터베이스 표기와 동일)
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::CratesIo => "crates.io",
            Self::PyPi => "PyPI",
            Self::Go => "Go",
            Self::Maven => "Maven",
            Self::NuGet => "NuGet",
            Self::RubyGems => "RubyGems",
            Self::Packagist => "Packagist",
            Self::Pub => "Pub",
            Self::Hex => "Hex",
            Self::CocoaPods => "CocoaPods",
            Self::SwiftUrl => "SwiftURL",
        }
    }

    /// 이 에코시스템이 인식하는 lockfile 파일명 목록
    pub fn lockfile_names(&self) -> &'static [&'static str] {
        match self {
            Self::Npm => &["package-lock.json", "pnpm-lock.yaml", "yarn.lock"],
            Self::CratesIo => &["Cargo.lock"],
            Self::PyPi => &["requirements.txt", "poetry.lock", "Pipfile.lock"],
            Self::Go => &["go.sum"],
            Self::Maven => &["pom.xml", "gradle.lockfile"],
            Self::NuGet => &["packages.lock.json"],
            Self::RubyGems => &["Gemfile.lock"],
            Self::Packagist => &["composer.lock"],
            Self::Pub => &["pubspec.lock"],
            Self::Hex => &["mix.lock"],
            Self::CocoaPods => &["Podfile.lock"],
            Self::SwiftUrl => &["Package.resolved"],
        }
    }

    /// lockfile 파일명으로 에코시스템을 찾습니다.
    pub fn for_lockfile(file_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|eco| eco.lockfile_names().contains(&file_name))
    }

    /// 문자열에서 에코시스템을 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며 흔한 별칭도 허용합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "npm" | "node" | "javascript" => Some(Self::Npm),
            "crates.io" | "cargo" | "rust" | "crates" => Some(Self::CratesIo),
            "pypi" | "pip" | "python" => Some(Self::PyPi),
            "go" | "golang" => Some(Self::Go),
            "maven" | "gradle" | "java" => Some(Self::Maven),
            "nuget" | "dotnet" => Some(Self::NuGet),
            "rubygems" | "gem" | "ruby" => Some(Self::RubyGems),
            "packagist" | "composer" | "php" => Some(Self::Packagist),
            "pub" | "dart" | "flutter" => Some(Self::Pub),
            "hex" | "elixir" | "mix" => Some(Self::Hex),
            "cocoapods" | "pod" => Some(Self::CocoaPods),
            "swifturl" | "swift" | "spm" => Some(Self::SwiftUrl),
            _ => None,
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Low < Medium < High < Critical`).
/// 인식할 수 없는 심각도 문자열은 `Medium`으로 정규화됩니다
/// (조용히 숨기는 쪽이 아니라 보이는 쪽으로 폴백).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    #[default]
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// CVSS 점수에서 심각도를 산출합니다.
    ///
    /// CVSS v3 구간: 9.0 이상 Critical, 7.0 이상 High, 4.0 이상 Medium, 그 외 Low.
    pub fn from_cvss(score: f64) -> Self {
        if score >= 9.0 {
            Self::Critical
        } else if score >= 7.0 {
            Self::High
        } else if score >= 4.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// 심각도 레이블과 CVSS 점수에서 심각도를 정규화합니다.
    ///
    /// 레이블이 우선, 없거나 인식 불가면 CVSS 구간, 둘 다 없으면 `Medium`.
    pub fn canonicalize(label: Option<&str>, cvss: Option<f64>) -> Self {
        label
            .and_then(Self::from_str_loose)
            .or_else(|| cvss.map(Self::from_cvss))
            .unwrap_or(Self::Medium)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// 취약점 데이터 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VulnSource {
    /// OSV (osv.dev)
    Osv,
    /// NVD (nvd.nist.gov)
    Nvd,
    /// GitHub Security Advisories
    Github,
}

impl VulnSource {
    /// 문자열에서 출처를 파싱합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "osv" => Some(Self::Osv),
            "nvd" => Some(Self::Nvd),
            "github" | "ghsa" => Some(Self::Github),
            _ => None,
        }
    }
}

impl fmt::Display for VulnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Osv => write!(f, "osv"),
            Self::Nvd => write!(f, "nvd"),
            Self::Github => write!(f, "github"),
        }
    }
}

/// 취약점 레코드
///
/// 어드바이저리 캐시에 저장되는 단일 취약점을 나타냅니다.
/// `(source, id)` 키로 식별되며 저장 후에는 변경되지 않습니다
/// (갱신 시 새 레코드가 기존 레코드를 대체).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    /// 어드바이저리 ID (예: CVE-2021-23337, GHSA-35jh-r3h4-6jhm)
    pub id: String,
    /// 데이터 출처
    pub source: VulnSource,
    /// 심각도
    pub severity: Severity,
    /// CVSS 점수 (있을 경우)
    pub cvss_score: Option<f64>,
    /// 제목
    pub title: String,
    /// 상세 설명 (있을 경우)
    pub description: Option<String>,
    /// 영향받는 패키지명
    pub package: String,
    /// 영향받는 에코시스템
    pub ecosystem: Ecosystem,
    /// 영향받는 버전 범위 표현식 (예: ">= 1.0.0, < 4.17.21")
    pub affected_versions: Option<String>,
    /// 수정된 버전 표현식 (예: "4.17.21")
    pub fixed_versions: Option<String>,
    /// 공개 시각
    pub published_at: Option<DateTime<Utc>>,
    /// 참고 URL 목록
    pub references: Vec<String>,
    /// 캐시에 수집된 시각
    pub fetched_at: Option<DateTime<Utc>>,
}

impl fmt::Display for Vulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}/{} (fixed: {})",
            self.id,
            self.severity,
            self.ecosystem,
            self.package,
            self.fixed_versions.as_deref().unwrap_or("N/A"),
        )
    }
}

/// 스캔에서 발견된 패키지 선언
///
/// lockfile 파서가 생성하는 일시적 데이터로, 영속화되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDeclaration {
    /// 패키지명
    pub name: String,
    /// 설치(고정)된 버전 문자열
    pub version: String,
    /// 에코시스템
    pub ecosystem: Ecosystem,
}

impl PackageDeclaration {
    /// 새 패키지 선언을 생성합니다.
    pub fn new(name: impl Into<String>, version: impl Into<String>, ecosystem: Ecosystem) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ecosystem,
        }
    }
}

impl fmt::Display for PackageDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.ecosystem, self.name, self.version)
    }
}

/// 매칭 결과 — 설치된 패키지와 취약점의 조인
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnMatch {
    /// 패키지명
    pub package: String,
    /// 설치된 버전
    pub installed_version: String,
    /// 매칭된 취약점
    pub vulnerability: Vulnerability,
}

/// 스캔 중 발생한 경고
///
/// 파일 단위 파싱 실패는 스캔 전체를 중단하지 않고 경고로 수집됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// 문제가 발생한 파일 경로
    pub file: String,
    /// 에코시스템
    pub ecosystem: Ecosystem,
    /// 원인
    pub reason: String,
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.file, self.ecosystem, self.reason)
    }
}

/// 커버리지 주의사항
///
/// 일부 lockfile 형식은 전체 의존성 트리를 담지 않을 수 있습니다
/// (예: 손으로 작성한 requirements.txt). 과소 보고 가능성을
/// 결과 메타데이터로 드러냅니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageCaveat {
    /// 에코시스템
    pub ecosystem: Ecosystem,
    /// 대상 파일
    pub file: String,
    /// 설명
    pub note: String,
}

/// 스캔 결과
///
/// 한 번의 스캔 호출이 생성하는 불변 결과입니다.
/// 재스캔은 기존 결과를 수정하지 않고 새 결과를 만듭니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// 스캔 ID
    pub scan_id: Uuid,
    /// 스캔 대상 디렉토리
    pub directory: PathBuf,
    /// 탐지된 에코시스템 (탐지 순서, 중복 제거)
    pub ecosystems: Vec<Ecosystem>,
    /// 매칭된 취약점 목록 (심각도 내림차순, CVSS 내림차순, ID 오름차순)
    pub matches: Vec<VulnMatch>,
    /// 파일 단위 경고 목록
    pub warnings: Vec<ScanWarning>,
    /// 커버리지 주의사항
    pub caveats: Vec<CoverageCaveat>,
    /// 스캔한 전체 패키지 수
    pub total_packages: usize,
    /// 스캔 시각
    pub scanned_at: DateTime<Utc>,
}

/// 스캔 이력 엔트리
///
/// 성공한 스캔마다 탐지된 에코시스템별로 한 행씩 기록되는
/// 추가 전용(append-only) 감사 기록입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanHistoryEntry {
    /// 행 ID
    pub id: i64,
    /// 스캔 대상 디렉토리
    pub directory: String,
    /// 에코시스템
    pub ecosystem: Ecosystem,
    /// 발견된 취약점 수
    pub vulnerability_count: u32,
    /// 스캔 시각
    pub scanned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_default_is_medium() {
        assert_eq!(Severity::default(), Severity::Medium);
    }

    #[test]
    fn severity_display() {
        assert_eq!(Severity::Low.to_string(), "low");
        assert_eq!(Severity::Medium.to_string(), "medium");
        assert_eq!(Severity::High.to_string(), "high");
        assert_eq!(Severity::Critical.to_string(), "critical");
    }

    #[test]
    fn severity_from_str_loose() {
        assert_eq!(Severity::from_str_loose("low"), Some(Severity::Low));
        assert_eq!(
            Severity::from_str_loose("CRITICAL"),
            Some(Severity::Critical)
        );
        assert_eq!(Severity::from_str_loose("Moderate"), Some(Severity::Medium));
        assert_eq!(Severity::from_str_loose("unknown"), None);
    }

    #[test]
    fn severity_from_cvss_thresholds() {
        assert_eq!(Severity::from_cvss(9.8), Severity::Critical);
        assert_eq!(Severity::from_cvss(9.0), Severity::Critical);
        assert_eq!(Severity::from_cvss(7.5), Severity::High);
        assert_eq!(Severity::from_cvss(7.0), Severity::High);
        assert_eq!(Severity::from_cvss(5.0), Severity::Medium);
        assert_eq!(Severity::from_cvss(4.0), Severity::Medium);
        assert_eq!(Severity::from_cvss(3.9), Severity::Low);
        assert_eq!(Severity::from_cvss(0.0), Severity::Low);
    }

    #[test]
    fn severity_canonicalize_unknown_is_medium() {
        assert_eq!(Severity::canonicalize(None, None), Severity::Medium);
        assert_eq!(Severity::canonicalize(Some("???"), None), Severity::Medium);
    }

    #[test]
    fn severity_canonicalize_label_wins_over_cvss() {
        assert_eq!(Severity::canonicalize(Some("low"), Some(9.8)), Severity::Low);
        assert_eq!(
            Severity::canonicalize(Some("???"), Some(9.8)),
            Severity::Critical
        );
    }

    #[test]
    fn ecosystem_canonical_names() {
        assert_eq!(Ecosystem::Npm.to_string(), "npm");
        assert_eq!(Ecosystem::CratesIo.to_string(), "crates.io");
        assert_eq!(Ecosystem::PyPi.to_string(), "PyPI");
        assert_eq!(Ecosystem::SwiftUrl.to_string(), "SwiftURL");
    }

    #[test]
    fn ecosystem_serde_uses_canonical_names() {
        let json = serde_json::to_string(&Ecosystem::CratesIo).unwrap();
        assert_eq!(json, "\"crates.io\"");
        let parsed: Ecosystem = serde_json::from_str("\"PyPI\"").unwrap();
        assert_eq!(parsed, Ecosystem::PyPi);
    }

    #[test]
    fn ecosystem_for_lockfile() {
        assert_eq!(
            Ecosystem::for_lockfile("package-lock.json"),
            Some(Ecosystem::Npm)
        );
        assert_eq!(
            Ecosystem::for_lockfile("Cargo.lock"),
            Some(Ecosystem::CratesIo)
        );
        assert_eq!(Ecosystem::for_lockfile("go.sum"), Some(Ecosystem::Go));
        assert_eq!(Ecosystem::for_lockfile("mix.lock"), Some(Ecosystem::Hex));
        assert_eq!(Ecosystem::for_lockfile("README.md"), None);
    }

    #[test]
    fn ecosystem_from_str_loose_aliases() {
        assert_eq!(Ecosystem::from_str_loose("cargo"), Some(Ecosystem::CratesIo));
        assert_eq!(Ecosystem::from_str_loose("PyPI"), Some(Ecosystem::PyPi));
        assert_eq!(Ecosystem::from_str_loose("golang"), Some(Ecosystem::Go));
        assert_eq!(Ecosystem::from_str_loose("swift"), Some(Ecosystem::SwiftUrl));
        assert_eq!(Ecosystem::from_str_loose("brew"), None);
    }

    #[test]
    fn ecosystem_all_covers_every_lockfile_name_once() {
        let mut seen = std::collections::HashSet::new();
        for eco in Ecosystem::ALL {
            for name in eco.lockfile_names() {
                assert!(seen.insert(*name), "duplicate lockfile name: {name}");
            }
        }
        assert_eq!(seen.len(), 17);
    }

    #[test]
    fn vuln_source_display_roundtrip() {
        for source in [VulnSource::Osv, VulnSource::Nvd, VulnSource::Github] {
            assert_eq!(
                VulnSource::from_str_loose(&source.to_string()),
                Some(source)
            );
        }
    }

    #[test]
    fn vulnerability_display() {
        let vuln = Vulnerability {
            id: "CVE-2021-23337".to_owned(),
            source: VulnSource::Osv,
            severity: Severity::High,
            cvss_score: Some(7.2),
            title: "Command injection in lodash".to_owned(),
            description: None,
            package: "lodash".to_owned(),
            ecosystem: Ecosystem::Npm,
            affected_versions: Some("< 4.17.21".to_owned()),
            fixed_versions: Some("4.17.21".to_owned()),
            published_at: None,
            references: vec![],
            fetched_at: None,
        };
        let display = vuln.to_string();
        assert!(display.contains("CVE-2021-23337"));
        assert!(display.contains("high"));
        assert!(display.contains("npm/lodash"));
        assert!(display.contains("4.17.21"));
    }

    #[test]
    fn package_declaration_display() {
        let pkg = PackageDeclaration::new("serde", "1.0.219", Ecosystem::CratesIo);
        assert_eq!(pkg.to_string(), "crates.io/serde@1.0.219");
    }

    #[test]
    fn scan_result_serialize_roundtrip() {
        let result = ScanResult {
            scan_id: Uuid::new_v4(),
            directory: PathBuf::from("/tmp/project"),
            ecosystems: vec![Ecosystem::Npm, Ecosystem::Go],
            matches: vec![],
            warnings: vec![],
            caveats: vec![],
            total_packages: 42,
            scanned_at: Utc::now(),
        };
        let json = serde_json::to_string(&result).unwrap();
        let parsed: ScanResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.scan_id, result.scan_id);
        assert_eq!(parsed.ecosystems, result.ecosystems);
        assert_eq!(parsed.total_packages, 42);
    }
}
