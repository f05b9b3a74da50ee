//! Maven 파서 — pom.xml, gradle.lockfile

use std::path::Path;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, PackageDeclaration};

use super::{LockfileParser, file_name, parse_error};

/// Maven `pom.xml` 파서
///
/// `<dependency>` 블록에서 groupId/artifactId/version을 추출합니다.
/// 패키지 이름은 `group:artifact` 표기를 사용합니다 (어드바이저리
/// 데이터베이스의 Maven 표기와 동일). `${property}` 참조 버전은
/// 해석할 수 없으므로 건너뜁니다.
pub struct PomXmlParser;

impl LockfileParser for PomXmlParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "pom.xml"
    }

    fn parse(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        if !content.contains('<') {
            return Err(parse_error(source_path, "not an XML document"));
        }

        let mut packages = Vec::new();
        let mut rest = content;
        while let Some(start) = rest.find("<dependency>") {
            let after = &rest[start + "<dependency>".len()..];
            let Some(end) = after.find("</dependency>") else {
                return Err(parse_error(source_path, "unterminated <dependency> element"));
            };
            let block = &after[..end];
            rest = &after[end..];

            let (Some(group), Some(artifact)) =
                (element_text(block, "groupId"), element_text(block, "artifactId"))
            else {
                continue;
            };
            let Some(version) = element_text(block, "version") else {
                // 부모 POM이 버전을 관리하는 경우
                continue;
            };
            if version.contains("${") {
                continue;
            }
            packages.push(PackageDeclaration::new(
                format!("{group}:{artifact}"),
                version,
                Ecosystem::Maven,
            ));
        }

        Ok(packages)
    }
}

fn element_text<'a>(block: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = block.find(&open)? + open.len();
    let end = block[start..].find(&close)? + start;
    Some(block[start..end].trim())
}

/// Gradle `gradle.lockfile` 파서
///
/// 각 줄은 `group:artifact:version=configuration,...` 형태입니다.
pub struct GradleLockParser;

impl LockfileParser for GradleLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name(path) == "gradle.lockfile"
    }

    fn parse(
        &self,
        content: &str,
        _source_path: &str,
    ) -> Result<Vec<PackageDeclaration>, ScanError> {
        let mut packages = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("empty=") {
                continue;
            }
            let coordinate = line.split('=').next().unwrap_or(line);
            let parts: Vec<&str> = coordinate.split(':').collect();
            let [group, artifact, version] = parts[..] else {
                continue;
            };
            packages.push(PackageDeclaration::new(
                format!("{group}:{artifact}"),
                version,
                Ecosystem::Maven,
            ));
        }

        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0"?>
<project>
  <dependencies>
    <dependency>
      <groupId>org.apache.logging.log4j</groupId>
      <artifactId>log4j-core</artifactId>
      <version>2.14.1</version>
    </dependency>
    <dependency>
      <groupId>com.example</groupId>
      <artifactId>managed</artifactId>
    </dependency>
    <dependency>
      <groupId>com.example</groupId>
      <artifactId>from-property</artifactId>
      <version>${example.version}</version>
    </dependency>
  </dependencies>
</project>
"#;

    #[test]
    fn pom_extracts_versioned_dependencies_only() {
        let packages = PomXmlParser.parse(POM, "pom.xml").unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "org.apache.logging.log4j:log4j-core");
        assert_eq!(packages[0].version, "2.14.1");
    }

    #[test]
    fn pom_rejects_non_xml_content() {
        assert!(matches!(
            PomXmlParser.parse("garbage", "pom.xml"),
            Err(ScanError::Parse { .. })
        ));
    }

    #[test]
    fn gradle_lockfile_parses_coordinates() {
        let content = "\
# This is a Gradle generated file
com.fasterxml.jackson.core:jackson-databind:2.15.2=compileClasspath,runtimeClasspath
org.slf4j:slf4j-api:2.0.9=runtimeClasspath
empty=annotationProcessor
";
        let packages = GradleLockParser.parse(content, "gradle.lockfile").unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].name, "com.fasterxml.jackson.core:jackson-databind");
        assert_eq!(packages[0].version, "2.15.2");
    }
}
