//! package-lock.json 파서 (npm v1/v2/v3)

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name, parse_error};

/// npm `package-lock.json` 파서
///
/// lockfileVersion 2/3의 `packages` 맵을 우선 사용하고, 없으면
/// v1의 중첩 `dependencies` 트리를 순회합니다.
pub struct PackageLockParser;

#[derive(Deserialize)]
struct PackageLock {
    #[serde(default)]
    packages: BTreeMap<String, PackageEntry>,
    #[serde(default)]
    dependencies: BTreeMap<String, LegacyDependency>,
}

#[derive(Deserialize)]
struct PackageEntry {
    version: Option<String>,
    #[serde(default)]
    link: bool,
}

#[derive(Deserialize)]
struct LegacyDependency {
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, LegacyDependency>,
}

impl LockfileParser for PackageLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "package-lock.json"
    }

    fn parse(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let lock: PackageLock = serde_json::from_str(content)
            .map_err(|e| parse_error(source_path, format!("invalid package-lock.json: {e}")))?;

        let mut packages = Vec::new();

        if !lock.packages.is_empty() {
            for (key, entry) in &lock.packages {
                // ""는 루트 프로젝트 자신, link 항목은 워크스페이스 심링크
                if key.is_empty() || entry.link {
                    continue;
                }
                let Some(version) = &entry.version else {
                    continue;
                };
                let name = match key.rfind("node_modules/") {
                    Some(idx) => &key[idx + "node_modules/".len()..],
                    None => key.as_str(),
                };
                packages.push(PackageDeclaration::new(name, version, Ecosystem::Npm));
            }
        } else {
            collect_legacy(&lock.dependencies, &mut packages);
        }

        dedup(&mut packages);
        Ok(packages)
    }
}

fn collect_legacy(deps: &BTreeMap<String, LegacyDependency>, out: &mut Vec<PackageDeclaration>) {
    for (name, dep) in deps {
        if let Some(version) = &dep.version {
            out.push(PackageDeclaration::new(name, version, Ecosystem::Npm));
        }
        collect_legacy(&dep.dependencies, out);
    }
}

fn dedup(packages: &mut Vec<PackageDeclaration>) {
    packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
    packages.dedup_by(|a, b| a.name == b.name && a.version == b.version);
}
