//! composer.lock 파서

use std::path::Path;

use serde::Deserialize;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name, parse_error};

/// Packagist `composer.lock` 파서
///
/// `packages`와 `packages-dev` 배열을 모두 읽습니다. Composer는
/// 버전에 "v" 접두사를 자주 쓰므로 제거합니다.
pub struct ComposerLockParser;

#[derive(Deserialize)]
struct ComposerLock {
    #[serde(default)]
    packages: Vec<ComposerPackage>,
    #[serde(default, rename = "packages-dev")]
    packages_dev: Vec<ComposerPackage>,
}

#[derive(Deserialize)]
struct ComposerPackage {
    name: String,
    version: String,
}

impl LockfileParser for ComposerLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Packagist
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "composer.lock"
    }

    fn parse(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let lock: ComposerLock = serde_json::from_str(content)
            .map_err(|e| parse_error(source_path, format!("invalid composer.lock: {e}")))?;

        Ok(lock
            .packages
            .into_iter()
            .chain(lock.packages_dev)
            .map(|p| {
                let version = p.version.trim_start_matches(['v', 'V']).to_owned();
                PackageDeclaration::new(p.name, version, Ecosystem::Packagist)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK: &str = r#"{
        "_readme": ["This file locks the dependencies"],
        "packages": [
            { "name": "symfony/http-kernel", "version": "v6.3.5" },
            { "name": "guzzlehttp/guzzle", "version": "7.8.0" }
        ],
        "packages-dev": [
            { "name": "phpunit/phpunit", "version": "10.4.1" }
        ]
    }"#;

    #[test]
    fn parses_both_package_sections() {
        let packages = ComposerLockParser.parse(LOCK, "composer.lock").unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            ["symfony/http-kernel", "guzzlehttp/guzzle", "phpunit/phpunit"]
        );
    }

    #[test]
    fn strips_v_prefix() {
        let packages = ComposerLockParser.parse(LOCK, "composer.lock").unwrap();
        assert_eq!(packages[0].version, "6.3.5");
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            ComposerLockParser.parse("<?php", "composer.lock"),
            Err(ScanError::Parse { .. })
        ));
    }
}
