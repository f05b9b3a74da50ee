#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`store`]: SQLite 저장소 (`AdvisoryStore`, `UpsertOutcome`)
//! - [`cache`]: 갱신 오케스트레이션 (`AdvisoryCache`)
//! - [`sources`]: 피드 클라이언트 (`OsvClient`, `NvdClient`, `GithubClient`)

pub mod cache;
pub mod sources;
pub mod store;

// --- Public API Re-exports ---

pub use cache::AdvisoryCache;
pub use sources::{GithubClient, NvdClient, OsvClient};
pub use store::{AdvisoryStore, UpsertOutcome};
