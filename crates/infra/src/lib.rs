//! # FluxConfig インフラ層
//!
//! 設定ドキュメントストア（PostgreSQL）との接続と、リポジトリ実装を提供する。
//!
//! ## 依存関係
//!
//! ```text
//! storage-service → infra → domain
//!                     └─→ shared
//! ```
//!
//! リポジトリはドライバのエラー（`sqlx::Error`）を外に出さない。
//! 自身の境界で [`DomainError`](fluxconfig_domain::DomainError) に正規化して返す。
//!
//! ## モジュール構成
//!
//! - [`db`] - 接続プールとマイグレーション
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリ実装
//! - `mock` - テスト用インメモリ実装（`test-utils` feature）

pub mod db;
pub mod error;
#[cfg(feature = "test-utils")]
pub mod mock;
pub mod repository;

pub use error::{InfraError, InfraErrorKind};
