//! pnpm-lock.yaml 파서

use std::path::Path;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name};

/// pnpm `pnpm-lock.yaml` 파서
///
/// YAML 전체를 역직렬화하지 않고 `packages:` 섹션의 키만 줄 단위로
/// 읽습니다. 키 표기는 lockfile 버전에 따라 다릅니다:
/// - v5: `/lodash/4.17.21:`
/// - v6-v9: `/lodash@4.17.21:` 또는 `lodash@4.17.21:`
///
/// peer 의존성 접미사(`(react@18.2.0)`, `_react@...`)는 잘라냅니다.
pub struct PnpmLockParser;

impl LockfileParser for PnpmLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "pnpm-lock.yaml"
    }

    fn parse(
        &self,
        content: &str,
        _source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let mut packages = Vec::new();
        let mut in_packages = false;

        for line in content.lines() {
            if !line.starts_with([' ', '\t']) {
                in_packages = line.trim_end() == "packages:";
                continue;
            }
            if !in_packages {
                continue;
            }
            let trimmed = line.trim();
            // 섹션 바로 아래 키만 (들여쓰기 한 단계, `key:` 형태)
            let indent = line.len() - line.trim_start().len();
            if indent > 2 || !trimmed.ends_with(':') {
                continue;
            }
            let key = trimmed.trim_end_matches(':').trim_matches(['\'', '"']);
            if let Some((name, version)) = split_key(key) {
                packages.push(PackageDeclaration::new(name, version, Ecosystem::Npm));
            }
        }

        packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        packages.dedup_by(|a, b| a.name == b.name && a.version == b.version);
        Ok(packages)
    }
}

fn split_key(key: &str) -> Option<(&str, &str)> {
    let key = key.strip_prefix('/').unwrap_or(key);
    // v6+ peer 접미사 제거
    let key = key.split('(').next()?;

    // v5: 마지막 '/' 뒤가 버전 세그먼트 (숫자로 시작, '_' 뒤는 peer 접미사)
    if let Some(slash) = key.rfind('/') {
        let segment = &key[slash + 1..];
        if segment.starts_with(|c: char| c.is_ascii_digit()) {
            let version = segment.split('_').next()?;
            let name = &key[..slash];
            if !name.is_empty() && !version.is_empty() && !version.contains('@') {
                return Some((name, version));
            }
        }
    }

    // v6+: 마지막 '@' 기준 (스코프 패키지의 선행 '@'는 제외)
    let at = key.rfind('@').filter(|&at| at > 0)?;
    let (name, version) = (&key[..at], &key[at + 1..]);
    if version.is_empty() {
        return None;
    }
    Some((name, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    const V9_LOCK: &str = "lockfileVersion: '9.0'\n\nimporters:\n  .:\n    dependencies:\n      lodash:\n        specifier: ^4.17.0\n        version: 4.17.15\n\npackages:\n\n  lodash@4.17.15:\n    resolution: {integrity: sha512-xxx}\n\n  '@babel/runtime@7.23.2':\n    resolution: {integrity: sha512-yyy}\n\n  react-dom@18.2.0(react@18.2.0):\n    resolution: {integrity: sha512-zzz}\n";

    const V5_LOCK: &str = "lockfileVersion: 5.4\n\npackages:\n\n  /lodash/4.17.15:\n    resolution: {integrity: sha512-xxx}\n\n  /@babel/runtime/7.23.2:\n    resolution: {integrity: sha512-yyy}\n";

    #[test]
    fn parses_v9_keys() {
        let packages = PnpmLockParser.parse(V9_LOCK, "pnpm-lock.yaml").unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["@babel/runtime", "lodash", "react-dom"]);
        assert_eq!(packages[1].version, "4.17.15");
        assert_eq!(packages[2].version, "18.2.0");
    }

    #[test]
    fn parses_v5_slash_keys() {
        let packages = PnpmLockParser.parse(V5_LOCK, "pnpm-lock.yaml").unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["@babel/runtime", "lodash"]);
        assert_eq!(packages[0].version, "7.23.2");
    }

    #[test]
    fn file_without_packages_section_is_empty() {
        let packages = PnpmLockParser
            .parse("lockfileVersion: '9.0'\nimporters:\n  .:\n", "pnpm-lock.yaml")
            .unwrap();
        assert!(packages.is_empty());
    }
}
