//! packages.lock.json 파서 (NuGet)

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name, parse_error};

/// NuGet `packages.lock.json` 파서
///
/// 타깃 프레임워크별 맵을 모두 순회하고, 실제 해석된 버전인
/// `resolved` 필드를 사용합니다. `Project` 타입(프로젝트 참조)은
/// 레지스트리 패키지가 아니므로 건너뜁니다.
pub struct NugetLockParser;

#[derive(Deserialize)]
struct NugetLock {
    #[serde(default)]
    dependencies: BTreeMap<String, BTreeMap<String, NugetEntry>>,
}

#[derive(Deserialize)]
struct NugetEntry {
    #[serde(default, rename = "type")]
    kind: String,
    resolved: Option<String>,
}

impl LockfileParser for NugetLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::NuGet
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "packages.lock.json"
    }

    fn parse(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let lock: NugetLock = serde_json::from_str(content)
            .map_err(|e| parse_error(source_path, format!("invalid packages.lock.json: {e}")))?;

        let mut packages = Vec::new();
        for framework in lock.dependencies.values() {
            for (name, entry) in framework {
                if entry.kind == "Project" {
                    continue;
                }
                let Some(resolved) = &entry.resolved else {
                    continue;
                };
                packages.push(PackageDeclaration::new(name, resolved, Ecosystem::NuGet));
            }
        }

        packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        packages.dedup_by(|a, b| a.name == b.name && a.version == b.version);
        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK: &str = r#"{
        "version": 1,
        "dependencies": {
            "net6.0": {
                "Newtonsoft.Json": {
                    "type": "Direct",
                    "requested": "[13.0.1, )",
                    "resolved": "13.0.1"
                },
                "System.Text.Encodings.Web": {
                    "type": "Transitive",
                    "resolved": "6.0.0"
                },
                "My.Local.Project": {
                    "type": "Project"
                }
            },
            "net8.0": {
                "Newtonsoft.Json": {
                    "type": "Direct",
                    "resolved": "13.0.1"
                }
            }
        }
    }"#;

    #[test]
    fn parses_resolved_versions_across_frameworks() {
        let packages = NugetLockParser.parse(LOCK, "packages.lock.json").unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Newtonsoft.Json", "System.Text.Encodings.Web"]);
        assert_eq!(packages[0].version, "13.0.1");
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            NugetLockParser.parse("[]", "packages.lock.json"),
            Err(ScanError::Parse { .. })
        ));
    }
}
