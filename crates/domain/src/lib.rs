//! # FluxConfig ドメイン層
//!
//! 設定ストレージのドメインモデルと、RPC 呼び出しで発生しうる失敗の分類を定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! storage-service → infra → domain
//! ```
//!
//! ドメイン層はワイヤ表現（ステータスコード、HTTP）を知らない。
//! [`DomainError`] からステータスへの変換はサービス側の責務。
//!
//! ## モジュール構成
//!
//! - [`error`] - 閉じたエラー分類（[`DomainError`] / [`DomainErrorKind`]）
//! - [`value_objects`] - API キー、設定キー、設定タグ
//! - [`configuration`] - 設定ドキュメント
//!
//! ## 使用例
//!
//! ```rust
//! use fluxconfig_domain::{DomainError, DomainErrorKind};
//!
//! let error = DomainError::not_found("Configuration data not found.", "missing");
//! assert!(matches!(
//!     error.kind(),
//!     DomainErrorKind::NotFound { entity } if entity == "missing"
//! ));
//! ```

#[macro_use]
mod macros;

pub mod configuration;
pub mod error;
pub mod value_objects;

pub use error::{DomainError, DomainErrorKind, ErrorCause, FieldViolation, ValidationFailure};
