//! Gemfile.lock 파서

use std::path::Path;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name};

/// RubyGems `Gemfile.lock` 파서
///
/// `GEM` 섹션의 `specs:` 아래에서 4칸 들여쓰기 줄만 패키지 선언입니다.
/// 6칸 들여쓰기 줄은 의존성 요구 조건이므로 건너뜁니다. GIT/PATH
/// 섹션은 레지스트리 패키지가 아니므로 제외합니다.
pub struct GemfileLockParser;

impl LockfileParser for GemfileLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::RubyGems
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "Gemfile.lock"
    }

    fn parse(
        &self,
        content: &str,
        _source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let mut packages = Vec::new();
        let mut in_gem = false;
        let mut in_specs = false;

        for line in content.lines() {
            if !line.starts_with(' ') {
                in_gem = line.trim_end() == "GEM";
                in_specs = false;
                continue;
            }
            if !in_gem {
                continue;
            }
            if line.trim_end() == "  specs:" {
                in_specs = true;
                continue;
            }
            if !in_specs {
                continue;
            }
            // 정확히 4칸 들여쓰기만 spec 줄
            if !line.starts_with("    ") || line.starts_with("      ") {
                continue;
            }
            let trimmed = line.trim();
            let Some((name, rest)) = trimmed.split_once(" (") else {
                continue;
            };
            let Some(version) = rest.strip_suffix(')') else {
                continue;
            };
            // 플랫폼 접미사(예: 1.13.3-x86_64-linux)는 버전 본체만 사용
            let version = version.split('-').next().unwrap_or(version);
            packages.push(PackageDeclaration::new(name, version, Ecosystem::RubyGems));
        }

        Ok(packages)
    }
}
