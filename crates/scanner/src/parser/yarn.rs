//! yarn.lock 파서 (classic v1 / berry)

use std::path::Path;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name};

/// yarn `yarn.lock` 파서
///
/// classic(v1)과 berry(v2+) 모두 "들여쓰기 없는 키 블록 + 들여쓰기된
/// `version` 줄" 구조이므로 하나의 줄 스캔으로 처리합니다.
///
/// - classic: `lodash@^4.17.0, lodash@^4.17.4:` / `  version "4.17.15"`
/// - berry:   `"lodash@npm:^4.17.0":` / `  version: 4.17.15`
///
/// berry의 `__metadata` 블록과 workspace/patch 프로토콜 항목은 건너뜁니다.
pub struct YarnLockParser;

impl LockfileParser for YarnLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "yarn.lock"
    }

    fn parse(
        &self,
        content: &str,
        _source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let mut packages = Vec::new();
        let mut current: Option<String> = None;

        for line in content.lines() {
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }

            if !line.starts_with([' ', '\t']) {
                // 새 키 블록 시작
                current = line
                    .trim_end()
                    .strip_suffix(':')
                    .and_then(|key| package_name(key));
                continue;
            }

            let Some(name) = &current else { continue };
            let trimmed = line.trim();
            let version = trimmed
                .strip_prefix("version:")
                .or_else(|| trimmed.strip_prefix("version"))
                .map(|v| v.trim().trim_matches('"'));
            if let Some(version) = version.filter(|v| !v.is_empty()) {
                packages.push(PackageDeclaration::new(name, version, Ecosystem::Npm));
                current = None;
            }
        }

        packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        packages.dedup_by(|a, b| a.name == b.name && a.version == b.version);
        Ok(packages)
    }
}

/// 키 블록의 첫 스펙에서 패키지 이름을 추출합니다.
fn package_name(key: &str) -> Option<String> {
    let first = key.split(',').next()?.trim().trim_matches('"');
    if first == "__metadata" {
        return None;
    }
    let at = first.rfind('@').filter(|&at| at > 0)?;
    let (name, spec) = (&first[..at], &first[at + 1..]);
    // berry 프로토콜 중 레지스트리 패키지만
    if spec.contains(':') && !spec.starts_with("npm:") {
        return None;
    }
    Some(name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIC: &str = "# yarn lockfile v1\n\nlodash@^4.17.0, lodash@^4.17.4:\n  version \"4.17.15\"\n  resolved \"https://registry.yarnpkg.com/lodash/-/lodash-4.17.15.tgz\"\n\n\"@babel/runtime@^7.0.0\":\n  version \"7.23.2\"\n";

    const BERRY: &str = "__metadata:\n  version: 6\n  cacheKey: 8\n\n\"lodash@npm:^4.17.0\":\n  version: 4.17.15\n  resolution: \"lodash@npm:4.17.15\"\n\n\"demo@workspace:.\":\n  version: 0.0.0-use.local\n";

    #[test]
    fn parses_classic_lockfile() {
        let packages = YarnLockParser.parse(CLASSIC, "yarn.lock").unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["@babel/runtime", "lodash"]);
        assert_eq!(packages[1].version, "4.17.15");
    }

    #[test]
    fn parses_berry_lockfile_and_skips_workspace_entries() {
        let packages = YarnLockParser.parse(BERRY, "yarn.lock").unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "lodash");
        assert_eq!(packages[0].version, "4.17.15");
    }

    #[test]
    fn empty_file_yields_no_packages() {
        assert!(YarnLockParser.parse("", "yarn.lock").unwrap().is_empty());
    }
}
