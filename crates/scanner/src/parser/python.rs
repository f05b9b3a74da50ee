//! PyPI 파서 — requirements.txt, poetry.lock, Pipfile.lock

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name, parse_error};

/// pip `requirements.txt` 파서
///
/// 엄밀한 lockfile이 아니므로 선언된 제약을 그대로 읽습니다. 첫
/// 연산자(`==`, `>=`, `<=`, `~=`, `!=`, `>`, `<`)의 피연산자를 그
/// 항목의 버전으로 쓰고, 버전 없는 항목은 `"*"`로 기록합니다.
/// pip 옵션 줄과 URL/VCS 참조는 건너뜁니다. 전이 의존성 누락 가능성은
/// [`LockfileParser::coverage_caveat`]로 결과 메타데이터에 드러납니다.
pub struct RequirementsParser;

impl LockfileParser for RequirementsParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::PyPi
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "requirements.txt"
    }

    fn parse(
        &self,
        content: &str,
        _source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let mut packages = Vec::new();

        for raw in content.lines() {
            // 인라인 주석과 환경 마커 제거
            let line = raw.split('#').next().unwrap_or("");
            let line = line.split(';').next().unwrap_or("").trim();
            if line.is_empty() || line.starts_with('-') || line.contains("://") {
                // -r/-e/--index-url 같은 pip 옵션 줄, URL/VCS 참조
                continue;
            }

            let Some((name, version)) = split_requirement(line) else {
                continue;
            };
            // extras 표기 제거: requests[security] -> requests
            let name = name.split('[').next().unwrap_or(name).trim();
            if name.is_empty() {
                continue;
            }
            packages.push(PackageDeclaration::new(
                normalize_name(name),
                version,
                Ecosystem::PyPi,
            ));
        }

        Ok(packages)
    }

    fn coverage_caveat(&self, _path: &Path) -> Option<String> {
        Some(
            "requirements.txt is not a full lockfile; ranged or unpinned entries are matched \
             against their declared constraint and transitive dependencies may be missing"
                .to_owned(),
        )
    }
}

/// 요구 항목을 이름과 버전으로 나눕니다.
///
/// 첫 연산자의 피연산자가 버전이며 (뒤따르는 제약은 무시),
/// 연산자 없는 줄은 버전 `"*"`의 선언입니다.
fn split_requirement(line: &str) -> Option<(&str, String)> {
    let Some(idx) = line.find(['=', '<', '>', '~', '!']) else {
        // 버전 없는 선언; 경로/VCS 형태는 제외
        if line.contains(['/', ':', '@', ' ']) {
            return None;
        }
        return Some((line, "*".to_owned()));
    };

    let rest = line[idx..].as_bytes();
    let op_len = if rest.len() >= 2 && rest[1] == b'=' { 2 } else { 1 };
    if matches!(rest[0], b'~' | b'!') && op_len == 1 {
        return None;
    }

    let version = line[idx + op_len..]
        .split([',', ' ', '\t'])
        .next()
        .unwrap_or("")
        .trim_end_matches('\\')
        .trim();
    if version.is_empty() {
        return None;
    }
    Some((&line[..idx], version.to_owned()))
}

/// poetry `poetry.lock` 파서
pub struct PoetryLockParser;

#[derive(Deserialize)]
struct PoetryLock {
    #[serde(default, rename = "package")]
    packages: Vec<PoetryPackage>,
}

#[derive(Deserialize)]
struct PoetryPackage {
    name: String,
    version: String,
}

impl LockfileParser for PoetryLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::PyPi
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "poetry.lock"
    }

    fn parse(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let lock: PoetryLock = toml::from_str(content)
            .map_err(|e| parse_error(source_path, format!("invalid poetry.lock: {e}")))?;

        Ok(lock
            .packages
            .into_iter()
            .map(|p| PackageDeclaration::new(normalize_name(&p.name), p.version, Ecosystem::PyPi))
            .collect())
    }
}

/// pipenv `Pipfile.lock` 파서
pub struct PipfileLockParser;

#[derive(Deserialize)]
struct PipfileLock {
    #[serde(default)]
    default: BTreeMap<String, PipfileEntry>,
    #[serde(default)]
    develop: BTreeMap<String, PipfileEntry>,
}

#[derive(Deserialize)]
struct PipfileEntry {
    version: Option<String>,
}

impl LockfileParser for PipfileLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::PyPi
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "Pipfile.lock"
    }

    fn parse(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let lock: PipfileLock = serde_json::from_str(content)
            .map_err(|e| parse_error(source_path, format!("invalid Pipfile.lock: {e}")))?;

        let mut packages = Vec::new();
        for (name, entry) in lock.default.iter().chain(lock.develop.iter()) {
            // 버전은 "==1.2.3" 형태로 기록됨; VCS/경로 항목은 버전이 없음
            let Some(version) = entry.version.as_deref() else {
                continue;
            };
            let version = version.trim_start_matches("==").trim();
            if version.is_empty() {
                continue;
            }
            packages.push(PackageDeclaration::new(
                normalize_name(name),
                version,
                Ecosystem::PyPi,
            ));
        }
        Ok(packages)
    }
}

/// PEP 503 이름 정규화: 소문자, `_`/`.`를 `-`로
fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(['_', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_parses_pins_ranges_and_bare_names() {
        let content = "\
# production deps
Django==4.2.7
requests[security]==2.31.0  # with extras
flask>=2.0,<3.0
uvicorn
pywin32==306 ; sys_platform == 'win32'
-r base.txt
git+https://github.com/example/pkg.git#egg=pkg
";
        let packages = RequirementsParser.parse(content, "requirements.txt").unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["django", "requests", "flask", "uvicorn", "pywin32"]);
        assert_eq!(packages[0].version, "4.2.7");
        // 범위 제약은 첫 연산자의 피연산자가 버전
        assert_eq!(packages[2].version, "2.0");
        // 버전 없는 선언은 "*"
        assert_eq!(packages[3].version, "*");
    }

    #[test]
    fn requirements_range_and_bare_entries_survive() {
        let packages = RequirementsParser
            .parse("flask>=2.0\nrequests\ndjango==4.2.0\n", "requirements.txt")
            .unwrap();
        assert_eq!(packages.len(), 3);
        assert_eq!(packages[0].name, "flask");
        assert_eq!(packages[0].version, "2.0");
        assert_eq!(packages[1].version, "*");
        assert_eq!(packages[2].version, "4.2.0");
    }

    #[test]
    fn requirements_operator_table() {
        for (line, version) in [
            ("a~=1.4.2", "1.4.2"),
            ("b!=2.0", "2.0"),
            ("c<=3.1", "3.1"),
            ("d>0.9", "0.9"),
            ("e<5", "5"),
        ] {
            let packages = RequirementsParser.parse(line, "requirements.txt").unwrap();
            assert_eq!(packages.len(), 1, "{line}");
            assert_eq!(packages[0].version, version, "{line}");
        }
    }

    #[test]
    fn requirements_has_coverage_caveat() {
        let caveat = RequirementsParser
            .coverage_caveat(Path::new("requirements.txt"))
            .unwrap();
        assert!(caveat.contains("not a full lockfile"));
        assert!(
            PoetryLockParser
                .coverage_caveat(Path::new("poetry.lock"))
                .is_none()
        );
    }

    #[test]
    fn poetry_lock_parses_package_array() {
        let content = r#"
[[package]]
name = "Django"
version = "4.2.7"
description = "..."

[[package]]
name = "typing_extensions"
version = "4.8.0"
"#;
        let packages = PoetryLockParser.parse(content, "poetry.lock").unwrap();
        assert_eq!(packages[0].name, "django");
        assert_eq!(packages[1].name, "typing-extensions");
    }

    #[test]
    fn pipfile_lock_strips_equality_prefix() {
        let content = r#"{
            "_meta": { "hash": {} },
            "default": {
                "django": { "version": "==4.2.7" },
                "local-pkg": { "path": "." }
            },
            "develop": {
                "pytest": { "version": "==7.4.3" }
            }
        }"#;
        let packages = PipfileLockParser.parse(content, "Pipfile.lock").unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["django", "pytest"]);
        assert_eq!(packages[0].version, "4.2.7");
    }

    #[test]
    fn malformed_pipfile_lock_is_parse_error() {
        let err = PipfileLockParser.parse("not json", "Pipfile.lock").unwrap_err();
        assert!(matches!(err, ScanError::Parse { .. }));
    }
}
