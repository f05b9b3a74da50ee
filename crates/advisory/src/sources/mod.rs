//! 출처별 피드 클라이언트
//!
//! 각 클라이언트는 에코시스템 목록을 받아 취약점 레코드 목록을
//! 반환합니다. 저장은 [`crate::cache::AdvisoryCache`]가 담당하므로
//! 클라이언트는 네트워크와 응답 변환만 책임집니다.

pub mod github;
pub mod nvd;
pub mod osv;

pub use github::GithubClient;
pub use nvd::NvdClient;
pub use osv::OsvClient;

use lockvet_core::types::Ecosystem;

/// 에코시스템별 수집 대상 패키지 목록
///
/// 피드 전체 미러링 대신, 널리 쓰이는 패키지를 중심으로 레코드를
/// 수집합니다. 스캔에서 만난 패키지가 여기 없으면 캐시 미스일 뿐
/// 스캔 실패는 아닙니다.
pub(crate) fn seed_packages(ecosystem: Ecosystem) -> &'static [&'static str] {
    match ecosystem {
        Ecosystem::Npm => &[
            "lodash",
            "express",
            "react",
            "axios",
            "minimist",
            "node-fetch",
            "webpack",
            "next",
        ],
        Ecosystem::CratesIo => &["serde", "tokio", "hyper", "openssl", "regex", "time"],
        Ecosystem::PyPi => &[
            "requests",
            "django",
            "flask",
            "numpy",
            "urllib3",
            "pillow",
            "cryptography",
        ],
        Ecosystem::Go => &[
            "github.com/gin-gonic/gin",
            "golang.org/x/crypto",
            "golang.org/x/net",
            "google.golang.org/grpc",
        ],
        Ecosystem::Maven => &[
            "org.apache.logging.log4j:log4j-core",
            "com.fasterxml.jackson.core:jackson-databind",
            "org.springframework:spring-core",
            "com.google.guava:guava",
        ],
        Ecosystem::NuGet => &[
            "Newtonsoft.Json",
            "System.Text.Json",
            "Serilog",
            "Microsoft.Data.SqlClient",
        ],
        Ecosystem::RubyGems => &["rails", "nokogiri", "rack", "devise"],
        Ecosystem::Packagist => &[
            "symfony/symfony",
            "laravel/framework",
            "guzzlehttp/guzzle",
            "monolog/monolog",
        ],
        Ecosystem::Pub => &["http", "dio", "shelf"],
        Ecosystem::Hex => &["phoenix", "plug", "ecto"],
        Ecosystem::CocoaPods => &["AFNetworking", "Alamofire", "SDWebImage"],
        Ecosystem::SwiftUrl => &[
            "github.com/Alamofire/Alamofire",
            "github.com/apple/swift-nio",
        ],
    }
}
