//! # FluxConfig 共有ユーティリティ
//!
//! このクレートは、FluxConfig Storage の全クレートで使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - infra と storage-service から依存される
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - ワイヤ上のステータス表現（[`StatusResponse`]）はここで定義し、
//!   ドメインエラーからの変換は各サービスの責務とする

pub mod cancellation;
#[cfg(feature = "observability")]
pub mod canonical_log;
pub mod health;
pub mod observability;
pub mod status;

pub use cancellation::{CancellationHandle, CancellationSignal};
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
pub use status::{BadRequest, Code, ErrorInfo, FieldViolation, StatusDetail, StatusResponse};
