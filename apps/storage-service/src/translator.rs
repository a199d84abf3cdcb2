//! # ステータス変換
//!
//! [`DomainError`] をワイヤ上の [`StatusResponse`] に変換する純粋関数を提供する。
//!
//! 変換器は公開 API 用（External）とサービス間 API 用（Internal）の 2 種類。
//! 違いは NotFound / AlreadyExists の扱いのみで、External では内部エラーとして隠蔽する。
//!
//! | 種別 | External | Internal | 詳細 |
//! |------|----------|----------|------|
//! | Validation | InvalidArgument | InvalidArgument | `BadRequest` |
//! | NotFound | Internal | NotFound | `ErrorInfo{NOT_FOUND}` / `{INTERNAL_ERROR}` |
//! | AlreadyExists | Internal | AlreadyExists | `ErrorInfo{ALREADY_EXISTS}` / `{INTERNAL_ERROR}` |
//! | Unauthenticated | Unauthenticated | Unauthenticated | なし |
//! | Unimplemented | Unimplemented | Unimplemented | `ErrorInfo{NOT_IMPLEMENTED}` |
//! | Internal | Internal | Internal | `ErrorInfo{INTERNAL_ERROR}` |

use fluxconfig_domain::{DomainError, DomainErrorKind, FieldViolation};
use fluxconfig_shared::{BadRequest, Code, ErrorInfo, StatusDetail, StatusResponse, status};
use itertools::Itertools;

pub const REASON_NOT_FOUND: &str = "NOT_FOUND";
pub const REASON_ALREADY_EXISTS: &str = "ALREADY_EXISTS";
pub const REASON_NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";
pub const REASON_INTERNAL_ERROR: &str = "INTERNAL_ERROR";

const BAD_REQUEST_HEADER: &str = "Bad request.";
const INTERNAL_MESSAGE: &str = "Unknown exception occurred during the method call.";
const UNIMPLEMENTED_MESSAGE: &str = "Method is not implemented yet.";

/// 変換器の適用範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorScope {
    /// 公開 API（クライアント向け）
    External,
    /// サービス間 API
    Internal,
}

/// ドメインエラーからステータスへの変換器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTranslator {
    scope: TranslatorScope,
}

impl StatusTranslator {
    pub fn external() -> Self {
        Self {
            scope: TranslatorScope::External,
        }
    }

    pub fn internal() -> Self {
        Self {
            scope: TranslatorScope::Internal,
        }
    }

    /// エラーをステータスに変換する
    ///
    /// `method` は完全なメソッド名（`/fluxconfig.storage.v1.Storage/LoadConfiguration`）。
    /// 同じ入力に対して常に同じ結果を返す。
    pub fn translate(&self, error: &DomainError, method: &str) -> StatusResponse {
        match (error.kind(), self.scope) {
            (DomainErrorKind::Validation { violations }, _) => bad_request(error, violations),
            (DomainErrorKind::NotFound { entity }, TranslatorScope::Internal) => entity_status(
                Code::NotFound,
                REASON_NOT_FOUND,
                error,
                entity,
                method,
            ),
            (DomainErrorKind::AlreadyExists { entity }, TranslatorScope::Internal) => {
                entity_status(
                    Code::AlreadyExists,
                    REASON_ALREADY_EXISTS,
                    error,
                    entity,
                    method,
                )
            }
            (DomainErrorKind::Unauthenticated, _) => {
                StatusResponse::new(Code::Unauthenticated, error.message())
            }
            (DomainErrorKind::Unimplemented, _) => {
                StatusResponse::new(Code::Unimplemented, UNIMPLEMENTED_MESSAGE).with_detail(
                    StatusDetail::ErrorInfo(
                        ErrorInfo::new(REASON_NOT_IMPLEMENTED).with_metadata("method", method),
                    ),
                )
            }
            (
                DomainErrorKind::NotFound { .. }
                | DomainErrorKind::AlreadyExists { .. }
                | DomainErrorKind::Internal,
                _,
            ) => internal(method),
        }
    }
}

fn bad_request(error: &DomainError, violations: &[FieldViolation]) -> StatusResponse {
    let message = std::iter::once(BAD_REQUEST_HEADER)
        .chain(error.chain())
        .join("\n");

    let field_violations = violations
        .iter()
        .map(|violation| status::FieldViolation {
            field:       violation.field.clone(),
            description: violation.description.clone(),
        })
        .collect();

    StatusResponse::new(Code::InvalidArgument, message)
        .with_detail(StatusDetail::BadRequest(BadRequest { field_violations }))
}

fn entity_status(
    code: Code,
    reason: &str,
    error: &DomainError,
    entity: &str,
    method: &str,
) -> StatusResponse {
    StatusResponse::new(code, format!("{} Entity: {}", error.message(), entity)).with_detail(
        StatusDetail::ErrorInfo(
            ErrorInfo::new(reason)
                .with_metadata("method", method)
                .with_metadata("entity", entity),
        ),
    )
}

fn internal(method: &str) -> StatusResponse {
    StatusResponse::new(Code::Internal, INTERNAL_MESSAGE).with_detail(StatusDetail::ErrorInfo(
        ErrorInfo::new(REASON_INTERNAL_ERROR).with_metadata("method", method),
    ))
}
