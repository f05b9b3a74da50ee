//! lockfile 탐지 — 대상 디렉토리 루트에서 알려진 lockfile을 찾습니다.
//!
//! 탐지는 고정된 파일명 테이블만 사용하며 내용을 들여다보지 않습니다.
//! 하위 디렉토리는 의도적으로 탐색하지 않습니다 (중첩 프로젝트는
//! 별도 스캔 대상).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use lockvet_core::error::ScanError;
use lockvet_core::types::{Ecosystem, ScanWarning};

/// 탐지된 lockfile 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedLockfile {
    /// 파일 경로
    pub path: PathBuf,
    /// 파일명이 속한 에코시스템
    pub ecosystem: Ecosystem,
}

/// 탐지 결과
#[derive(Debug, Default)]
pub struct Detection {
    /// 탐지된 lockfile 목록 (에코시스템 선언 순서, 파일명 순)
    pub lockfiles: Vec<DetectedLockfile>,
    /// 크기 초과 등으로 제외된 파일 경고
    pub warnings: Vec<ScanWarning>,
}

/// lockfile 탐지기
pub struct LockfileDetector {
    max_file_size: u64,
}

impl LockfileDetector {
    /// 최대 파일 크기 제한을 가진 탐지기를 생성합니다.
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// 디렉토리 루트에서 lockfile을 탐지합니다.
    ///
    /// 인식되는 파일이 하나도 없으면 [`ScanError::NotFound`]입니다.
    /// 크기 제한을 넘는 파일은 경고로 제외되지만, 그 경우에도
    /// "인식은 된" 것이므로 NotFound로 처리하지 않습니다.
    pub fn detect(&self, directory: &Path) -> Result<Detection, ScanError> {
        let entries = read_file_entries(directory)?;

        let mut detection = Detection::default();
        let mut recognized_any = false;

        // Ecosystem::ALL 순서로 순회해 결과 순서를 결정적으로 만듭니다.
        for ecosystem in Ecosystem::ALL {
            for name in ecosystem.lockfile_names() {
                let Some(size) = entries.get(*name) else {
                    continue;
                };
                recognized_any = true;
                let path = directory.join(name);

                if *size > self.max_file_size {
                    debug!(path = %path.display(), size, "lockfile exceeds size limit, skipping");
                    detection.warnings.push(ScanWarning {
                        file: path.display().to_string(),
                        ecosystem,
                        reason: format!(
                            "file size {size} exceeds limit {}",
                            self.max_file_size
                        ),
                    });
                    continue;
                }
                detection.lockfiles.push(DetectedLockfile { path, ecosystem });
            }
        }

        if !recognized_any {
            return Err(ScanError::NotFound {
                path: directory.display().to_string(),
            });
        }
        Ok(detection)
    }
}

/// 디렉토리의 일반 파일 이름과 크기 목록
fn read_file_entries(directory: &Path) -> Result<BTreeMap<String, u64>, ScanError> {
    let io_err = |source: std::io::Error| ScanError::Io {
        path: directory.display().to_string(),
        source,
    };

    let mut entries = BTreeMap::new();
    for entry in std::fs::read_dir(directory).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let metadata = entry.metadata().map_err(io_err)?;
        if !metadata.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            entries.insert(name, metadata.len());
        }
    }
    Ok(entries)
}
