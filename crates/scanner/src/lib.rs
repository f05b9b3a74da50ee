#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`detector`]: 루트 레벨 lockfile 탐지 (`LockfileDetector`)
//! - [`parser`]: `LockfileParser` trait와 에코시스템별 파서
//! - [`version`]: 버전 비교와 범위 표현식 (`VersionScheme`)
//! - [`matcher`]: 버전 매칭 (`VersionMatcher`)
//! - [`report`]: 심각도별 집계 (`SeverityReport`)
//! - [`service`]: 오케스트레이터와 명령 표면 (`ScanService`)

pub mod detector;
pub mod matcher;
pub mod parser;
pub mod report;
pub mod service;
pub mod version;

// --- Public API Re-exports ---

pub use detector::{DetectedLockfile, Detection, LockfileDetector};
pub use matcher::VersionMatcher;
pub use parser::{LockfileParser, all_parsers, parser_for};
pub use report::{SeverityCounts, SeverityGroup, SeverityReport, aggregate};
pub use service::{ScanGuard, ScanOutcome, ScanRegistry, ScanService, ScanState};
pub use version::VersionScheme;
