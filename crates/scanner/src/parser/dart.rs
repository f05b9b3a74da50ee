//! pubspec.lock 파서 (Dart/Flutter)

use std::path::Path;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name};

/// pub.dev `pubspec.lock` 파서
///
/// `packages:` 섹션을 줄 단위로 스캔합니다. 2칸 들여쓰기 키가 패키지
/// 이름이고, 그 아래 `source:`와 `version:` 필드를 짝지어 읽습니다.
/// `hosted` 출처만 레지스트리 패키지로 취급합니다 (path/git 제외).
pub struct PubspecLockParser;

impl LockfileParser for PubspecLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Pub
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "pubspec.lock"
    }

    fn parse(
        &self,
        content: &str,
        _source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let mut packages = Vec::new();
        let mut in_packages = false;
        let mut current: Option<(String, bool, Option<String>)> = None; // (name, hosted, version)

        for line in content.lines() {
            if !line.starts_with(' ') {
                flush(&mut current, &mut packages);
                in_packages = line.trim_end() == "packages:";
                continue;
            }
            if !in_packages {
                continue;
            }
            let indent = line.len() - line.trim_start().len();
            let trimmed = line.trim();

            if indent == 2 && trimmed.ends_with(':') {
                flush(&mut current, &mut packages);
                let name = trimmed.trim_end_matches(':').trim_matches(['\'', '"']);
                current = Some((name.to_owned(), false, None));
                continue;
            }

            let Some((_, hosted, version)) = &mut current else {
                continue;
            };
            if let Some(value) = trimmed.strip_prefix("source:") {
                *hosted = value.trim().trim_matches(['\'', '"']) == "hosted";
            } else if let Some(value) = trimmed.strip_prefix("version:") {
                *version = Some(value.trim().trim_matches(['\'', '"']).to_owned());
            }
        }
        flush(&mut current, &mut packages);

        Ok(packages)
    }
}

fn flush(current: &mut Option<(String, bool, Option<String>)>, out: &mut Vec<PackageDeclaration>) {
    if let Some((name, true, Some(version))) = current.take()
        && !version.is_empty()
    {
        out.push(PackageDeclaration::new(name, version, Ecosystem::Pub));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK: &str = "\
packages:
  collection:
    dependency: \"direct main\"
    description:
      name: collection
      sha256: \"f092b21\"
      url: \"https://pub.dev\"
    source: hosted
    version: \"1.17.2\"
  http:
    dependency: \"direct main\"
    source: hosted
    version: \"0.13.6\"
  my_local:
    dependency: \"direct main\"
    source: path
    version: \"0.0.1\"
sdks:
  dart: \">=3.0.0 <4.0.0\"
";

    #[test]
    fn parses_hosted_packages() {
        let packages = PubspecLockParser.parse(LOCK, "pubspec.lock").unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["collection", "http"]);
        assert_eq!(packages[0].version, "1.17.2");
    }

    #[test]
    fn path_dependencies_are_skipped() {
        let packages = PubspecLockParser.parse(LOCK, "pubspec.lock").unwrap();
        assert!(packages.iter().all(|p| p.name != "my_local"));
    }

    #[test]
    fn sdks_section_is_ignored() {
        let packages = PubspecLockParser.parse(LOCK, "pubspec.lock").unwrap();
        assert!(packages.iter().all(|p| p.name != "dart"));
    }
}
