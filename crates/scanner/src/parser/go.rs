//! go.sum 파서

use std::path::Path;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name};

/// Go `go.sum` 파서
///
/// 각 줄은 `module version hash` 형태이며, 같은 모듈이 `v1.2.3`와
/// `v1.2.3/go.mod` 두 줄로 나타나므로 `/go.mod` 접미사를 제거한 뒤
/// `(module, version)` 기준으로 중복을 제거합니다.
pub struct GoSumParser;

impl LockfileParser for GoSumParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Go
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "go.sum"
    }

    fn parse(
        &self,
        content: &str,
        _source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let mut packages = Vec::new();

        for line in content.lines() {
            let mut fields = line.split_whitespace();
            let (Some(module), Some(version)) = (fields.next(), fields.next()) else {
                continue;
            };
            let version = version.strip_suffix("/go.mod").unwrap_or(version);
            if !version.starts_with('v') {
                continue;
            }
            packages.push(PackageDeclaration::new(module, version, Ecosystem::Go));
        }

        packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        packages.dedup_by(|a, b| a.name == b.name && a.version == b.version);
        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUM: &str = "\
github.com/gin-gonic/gin v1.9.0 h1:OjyFBKICoexlu99ctXNR2gg+c5pzrfhuU7rB1MNV80Y=
github.com/gin-gonic/gin v1.9.0/go.mod h1:W1Me9+hsUSyj3CePGrd1/QrKJMSJ1Tu/0hFEH89961k=
golang.org/x/crypto v0.0.0-20190308221718-c2843e01d9a2/go.mod h1:djNgcEr1/C05ACkg1iLfiJU5Ep61QUkGW8qpdssI0+w=
golang.org/x/crypto v0.14.0 h1:wBqGXzWJW6m1XrIKlAH0Hs1JJ7+9KBwnIO8v66Q9cHc=
golang.org/x/crypto v0.14.0/go.mod h1:MVFd36DqK4CsrnJYDkBA3VC4m2GkXAM0PvzMCn4JQf4=
";

    #[test]
    fn deduplicates_go_mod_lines() {
        let packages = GoSumParser.parse(SUM, "go.sum").unwrap();
        assert_eq!(packages.len(), 3);
        assert_eq!(packages[0].name, "github.com/gin-gonic/gin");
        assert_eq!(packages[0].version, "v1.9.0");
        // 의사 버전도 그대로 보존
        assert_eq!(packages[1].version, "v0.0.0-20190308221718-c2843e01d9a2");
        assert_eq!(packages[2].version, "v0.14.0");
    }

    #[test]
    fn ignores_malformed_lines() {
        let packages = GoSumParser.parse("just-one-field\n\n", "go.sum").unwrap();
        assert!(packages.is_empty());
    }
}
