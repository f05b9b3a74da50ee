//! Podfile.lock 파서 (CocoaPods)

use std::path::Path;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name};

/// CocoaPods `Podfile.lock` 파서
///
/// `PODS:` 섹션의 최상위 항목(`  - Name (1.2.3)`)만 읽습니다.
/// 더 깊은 들여쓰기는 의존성 요구 조건입니다. 서브스펙
/// (`Firebase/Core`)은 기본 pod 이름으로 접어서 중복 제거합니다.
pub struct PodfileLockParser;

impl LockfileParser for PodfileLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::CocoaPods
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "Podfile.lock"
    }

    fn parse(
        &self,
        content: &str,
        _source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let mut packages = Vec::new();
        let mut in_pods = false;

        for line in content.lines() {
            if !line.starts_with(' ') {
                in_pods = line.trim_end() == "PODS:";
                continue;
            }
            if !in_pods || !line.starts_with("  - ") || line.starts_with("    ") {
                continue;
            }
            let entry = line.trim_start_matches("  - ").trim_end_matches(':');
            let Some((name, rest)) = entry.split_once(" (") else {
                continue;
            };
            let Some(version) = rest.strip_suffix(')') else {
                continue;
            };
            // 서브스펙은 기본 pod으로
            let name = name.split('/').next().unwrap_or(name).trim_matches('"');
            packages.push(PackageDeclaration::new(name, version, Ecosystem::CocoaPods));
        }

        packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        packages.dedup_by(|a, b| a.name == b.name && a.version == b.version);
        Ok(packages)
    }
}
