//! mix.lock 파서 (Elixir)

use std::path::Path;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name};

/// Hex `mix.lock` 파서
///
/// 각 항목은 `"name": {:hex, :name, "version", ...}` 형태의 Elixir
/// 튜플입니다. `:hex` 출처만 레지스트리 패키지이며 (`:git` 제외),
/// 튜플의 세 번째 요소가 버전입니다.
pub struct MixLockParser;

impl LockfileParser for MixLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Hex
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "mix.lock"
    }

    fn parse(
        &self,
        content: &str,
        _source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let mut packages = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            // "name": {:hex, :name, "1.2.3", ...
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let name = key.trim().trim_matches('"');
            if name.is_empty() || name.starts_with('%') {
                continue;
            }
            let rest = rest.trim();
            if !rest.starts_with("{:hex,") {
                continue;
            }
            let Some(version) = quoted_field(rest, 1) else {
                continue;
            };
            packages.push(PackageDeclaration::new(name, version, Ecosystem::Hex));
        }

        Ok(packages)
    }
}

/// 튜플에서 n번째 큰따옴표 문자열 (0부터)
fn quoted_field(tuple: &str, index: usize) -> Option<&str> {
    tuple.split('"').skip(1).step_by(2).nth(index - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK: &str = r#"%{
  "jason": {:hex, :jason, "1.4.1", "af1504e35f629ddcdd6addb3513c3853991f694921b1b9368b0bd32beb9f1b63", [:mix], [], "hexpm", "fbb01ecdfd565b56261302f7e1fcc27c4fb8f32d56eab74db621fc154604a7a1"},
  "phoenix": {:hex, :phoenix, "1.7.10", "02189140a61b2ce85bb633a9b6fd02dff705a5f1596869547aeb2b2b95edd729", [:mix], [{:jason, "~> 1.0", [hex: :jason, repo: "hexpm", optional: true]}], "hexpm", "cf784932e010fd736d656d7fead6a584a4498efefe5b8227e9f383bf15bb79d0"},
  "internal_lib": {:git, "https://github.com/example/internal_lib.git", "abc1234", []},
}
"#;

    #[test]
    fn parses_hex_entries() {
        let packages = MixLockParser.parse(LOCK, "mix.lock").unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["jason", "phoenix"]);
        assert_eq!(packages[0].version, "1.4.1");
        assert_eq!(packages[1].version, "1.7.10");
    }

    #[test]
    fn git_entries_are_skipped() {
        let packages = MixLockParser.parse(LOCK, "mix.lock").unwrap();
        assert!(packages.iter().all(|p| p.name != "internal_lib"));
    }

    #[test]
    fn empty_map_yields_no_packages() {
        assert!(MixLockParser.parse("%{}\n", "mix.lock").unwrap().is_empty());
    }
}
