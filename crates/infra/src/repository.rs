//! # リポジトリ実装
//!
//! - **依存性逆転**: ユースケースはトレイト経由でのみリポジトリに触れる
//! - **エラー正規化**: ドライバのエラーはリポジトリの境界で `DomainError` に変換する

pub mod configuration_repository;

pub use configuration_repository::{ConfigurationRepository, PostgresConfigurationRepository};
