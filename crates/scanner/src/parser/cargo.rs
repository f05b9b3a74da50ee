//! Cargo.lock 파서

use std::path::Path;

use serde::Deserialize;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name, parse_error};

/// crates.io `Cargo.lock` 파서
///
/// TOML의 `[[package]]` 배열만 사용하므로 lockfile 버전(v1-v4)과
/// 무관하게 동작합니다.
pub struct CargoLockParser;

#[derive(Deserialize)]
struct CargoLock {
    #[serde(default, rename = "package")]
    packages: Vec<CargoPackage>,
}

#[derive(Deserialize)]
struct CargoPackage {
    name: String,
    version: String,
}

impl LockfileParser for CargoLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::CratesIo
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "Cargo.lock"
    }

    fn parse(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let lock: CargoLock = toml::from_str(content)
            .map_err(|e| parse_error(source_path, format!("invalid Cargo.lock: {e}")))?;

        Ok(lock
            .packages
            .into_iter()
            .map(|p| PackageDeclaration::new(p.name, p.version, Ecosystem::CratesIo))
            .collect())
    }
}
