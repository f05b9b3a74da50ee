//! Package.resolved 파서 (Swift Package Manager)

use std::path::Path;

use serde::Deserialize;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name, parse_error};

/// SwiftPM `Package.resolved` 파서
///
/// v1은 `object.pins[].repositoryURL`, v2/v3은 `pins[].location`을
/// 사용합니다. 어드바이저리 데이터베이스의 Swift 패키지 식별자는
/// 저장소 URL이므로, 스킴과 `.git` 접미사를 제거한 URL을 패키지
/// 이름으로 씁니다 (예: `github.com/Alamofire/Alamofire`).
/// 버전 없이 revision/branch로만 고정된 핀은 건너뜁니다.
pub struct SwiftResolvedParser;

#[derive(Deserialize)]
struct Resolved {
    #[serde(default)]
    pins: Vec<Pin>,
    object: Option<ResolvedObject>,
}

#[derive(Deserialize)]
struct ResolvedObject {
    #[serde(default)]
    pins: Vec<Pin>,
}

#[derive(Deserialize)]
struct Pin {
    location: Option<String>,
    #[serde(rename = "repositoryURL")]
    repository_url: Option<String>,
    state: Option<PinState>,
}

#[derive(Deserialize)]
struct PinState {
    version: Option<String>,
}

impl LockfileParser for SwiftResolvedParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::SwiftUrl
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "Package.resolved"
    }

    fn parse(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let resolved: Resolved = serde_json::from_str(content)
            .map_err(|e| parse_error(source_path, format!("invalid Package.resolved: {e}")))?;

        let pins = match resolved.object {
            Some(object) => object.pins,
            None => resolved.pins,
        };

        let mut packages = Vec::new();
        for pin in pins {
            let Some(url) = pin.location.or(pin.repository_url) else {
                continue;
            };
            let Some(version) = pin.state.and_then(|s| s.version) else {
                continue;
            };
            packages.push(PackageDeclaration::new(
                normalize_url(&url),
                version,
                Ecosystem::SwiftUrl,
            ));
        }
        Ok(packages)
    }
}

fn normalize_url(url: &str) -> String {
    url.trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const V2: &str = r#"{
        "pins": [
            {
                "identity": "alamofire",
                "kind": "remoteSourceControl",
                "location": "https://github.com/Alamofire/Alamofire.git",
                "state": { "revision": "abc", "version": "5.6.4" }
            },
            {
                "identity": "swift-nio",
                "kind": "remoteSourceControl",
                "location": "https://github.com/apple/swift-nio.git",
                "state": { "branch": "main", "revision": "def" }
            }
        ],
        "version": 2
    }"#;

    const V1: &str = r#"{
        "object": {
            "pins": [
                {
                    "package": "Alamofire",
                    "repositoryURL": "https://github.com/Alamofire/Alamofire.git",
                    "state": { "revision": "abc", "version": "5.6.4" }
                }
            ]
        },
        "version": 1
    }"#;

    #[test]
    fn parses_v2_pins() {
        let packages = SwiftResolvedParser.parse(V2, "Package.resolved").unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "github.com/Alamofire/Alamofire");
        assert_eq!(packages[0].version, "5.6.4");
    }

    #[test]
    fn parses_v1_object_pins() {
        let packages = SwiftResolvedParser.parse(V1, "Package.resolved").unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "github.com/Alamofire/Alamofire");
    }

    #[test]
    fn branch_pins_without_version_are_skipped() {
        let packages = SwiftResolvedParser.parse(V2, "Package.resolved").unwrap();
        assert!(packages.iter().all(|p| !p.name.contains("swift-nio")));
    }
}
