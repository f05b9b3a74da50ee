//! 에코시스템별 lockfile 파서
//!
//! 모든 파서는 [`LockfileParser`] trait를 구현합니다. 파서는 파일 내용만
//! 받으며 I/O를 하지 않습니다 (읽기는 탐지/오케스트레이션 쪽 책임).
//!
//! 공통 규칙:
//! - lockfile 포맷의 마이너한 버전 차이는 관용적으로 수용합니다
//!   (예: package-lock.json v1/v2/v3, Package.resolved v1/v2).
//! - 구조 자체가 깨진 파일은 [`ScanError::Parse`]를 반환하고, 호출자는
//!   이를 경고로 강등해 나머지 파일 처리를 계속합니다.
//! - 버전을 고정하지 않는 매니페스트(requirements.txt)는 커버리지
//!   한계를 [`LockfileParser::coverage_caveat`]로 드러냅니다.

use std::path::Path;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

mod cargo;
mod cocoapods;
mod dart;
mod elixir;
mod go;
mod maven;
mod npm;
mod nuget;
mod php;
mod pnpm;
mod python;
mod ruby;
mod swift;
mod yarn;

pub use cargo::CargoLockParser;
pub use cocoapods::PodfileLockParser;
pub use dart::PubspecLockParser;
pub use elixir::MixLockParser;
pub use go::GoSumParser;
pub use maven::{GradleLockParser, PomXmlParser};
pub use npm::PackageLockParser;
pub use nuget::NugetLockParser;
pub use php::ComposerLockParser;
pub use pnpm::PnpmLockParser;
pub use python::{PipfileLockParser, PoetryLockParser, RequirementsParser};
pub use ruby::GemfileLockParser;
pub use swift::SwiftResolvedParser;
pub use yarn::YarnLockParser;

/// lockfile 파서 공통 인터페이스
pub trait LockfileParser: Send + Sync {
    /// 이 파서가 담당하는 에코시스템
    fn ecosystem(&self) -> Ecosystem;

    /// 파일명 기준으로 이 파서가 처리할 수 있는지 판단합니다.
    fn can_parse(&self, path: &Path) -> bool;

    /// 파일 내용에서 패키지 선언 목록을 추출합니다.
    ///
    /// `source_path`는 에러 메시지용 표시 경로입니다.
    fn parse(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError>;

    /// 이 파일 형식의 커버리지 한계 설명 (있는 경우)
    fn coverage_caveat(&self, _path: &Path) -> Option<String> {
        None
    }
}

/// 지원하는 모든 파서
pub fn all_parsers() -> Vec<Box<dyn LockfileParser>> {
    vec![
        Box::new(PackageLockParser),
        Box::new(PnpmLockParser),
        Box::new(YarnLockParser),
        Box::new(CargoLockParser),
        Box::new(RequirementsParser),
        Box::new(PoetryLockParser),
        Box::new(PipfileLockParser),
        Box::new(GoSumParser),
        Box::new(PomXmlParser),
        Box::new(GradleLockParser),
        Box::new(NugetLockParser),
        Box::new(GemfileLockParser),
        Box::new(ComposerLockParser),
        Box::new(PubspecLockParser),
        Box::new(MixLockParser),
        Box::new(PodfileLockParser),
        Box::new(SwiftResolvedParser),
    ]
}

/// 경로의 파일명을 처리할 수 있는 파서
pub fn parser_for(path: &Path) -> Option<Box<dyn LockfileParser>> {
    all_parsers().into_iter().find(|p| p.can_parse(path))
}

/// 경로의 마지막 구성 요소 (파일명 매칭용)
pub(crate) fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// 구조가 깨진 lockfile에 대한 공통 에러 생성
pub(crate) fn parse_error(source_path: &str, reason: impl Into<String>) -> ScanError {
    ScanError::Parse {
        path: source_path.to_owned(),
        reason: reason.into(),
    }
}
