//! # ドメインエラー分類
//!
//! RPC 呼び出しの中で発生しうる失敗を、閉じた 6 種類に分類して表現する。
//!
//! | 種別 | 用途 | 種別固有の情報 |
//! |------|------|----------------|
//! | `Validation` | 入力値の検証失敗 | フィールド違反の列 |
//! | `NotFound` | エンティティが存在しない | エンティティ識別子 |
//! | `AlreadyExists` | エンティティが既に存在する | エンティティ識別子 |
//! | `Unauthenticated` | 認証失敗 | なし |
//! | `Unimplemented` | 未実装メソッド | なし |
//! | `Internal` | 上記以外 | なし |
//!
//! ## 構造
//!
//! インフラ層の `InfraError` と同じ struct + kind パターンを採用:
//! - [`DomainError`]: 種別、メッセージ、原因の連鎖、[`SpanTrace`] を保持する
//! - [`DomainErrorKind`]: 種別と種別固有の情報
//!
//! 種別は生成後に変更できない（フィールドは非公開、変更メソッドなし）。
//! 原因の連鎖は外側から内側の順に保持し、根本原因が末尾に来る。
//!
//! ## 使用例
//!
//! ```rust
//! use fluxconfig_domain::{DomainError, FieldViolation, ValidationFailure};
//!
//! let failure = ValidationFailure::from_violations(vec![FieldViolation::new(
//!     "configuration_tag",
//!     "must not be empty",
//! )]);
//! let error = DomainError::validation("Invalid request.", failure);
//!
//! assert_eq!(error.causes().len(), 1);
//! assert_eq!(error.violations().len(), 1);
//! ```

use std::fmt;

use derive_more::Display;
use strum::IntoStaticStr;
use thiserror::Error;
use tracing_error::SpanTrace;

/// ドメイン層で発生するエラー
#[derive(Display)]
#[display("{message}")]
pub struct DomainError {
    kind:       DomainErrorKind,
    message:    String,
    causes:     Vec<ErrorCause>,
    span_trace: SpanTrace,
}

/// ドメインエラーの種別
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
pub enum DomainErrorKind {
    /// 入力値の検証失敗
    ///
    /// `violations` は検証失敗オブジェクトから受け取った順序を保つ。
    Validation { violations: Vec<FieldViolation> },

    /// エンティティが存在しない
    NotFound { entity: String },

    /// エンティティが既に存在する
    AlreadyExists { entity: String },

    /// 認証失敗
    Unauthenticated,

    /// 未実装メソッドの呼び出し
    Unimplemented,

    /// 分類できない失敗
    Internal,
}

/// 原因の連鎖の 1 要素
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{message}")]
pub struct ErrorCause {
    message: String,
}

impl ErrorCause {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// 不正なフィールド 1 件分の情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// フィールドパス（例: `"configuration_tag"`）
    pub field:       String,
    pub description: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            field:       field.into(),
            description: description.into(),
        }
    }
}

/// 検証失敗オブジェクト
///
/// [`DomainError::validation`] の原因として渡す。
/// メッセージは違反したフィールドを 1 行に列挙したもの。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationFailure {
    message:    String,
    violations: Vec<FieldViolation>,
}

impl ValidationFailure {
    /// フィールド違反の列から検証失敗を作成する
    pub fn from_violations(violations: Vec<FieldViolation>) -> Self {
        let fields = violations
            .iter()
            .map(|violation| violation.field.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            message: format!("Validation failed: {fields}"),
            violations,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }
}

impl From<FieldViolation> for ValidationFailure {
    fn from(violation: FieldViolation) -> Self {
        Self::from_violations(vec![violation])
    }
}

// ===== DomainError のメソッド =====

impl DomainError {
    fn with_kind(kind: DomainErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            causes: Vec::new(),
            span_trace: SpanTrace::capture(),
        }
    }

    /// 検証エラーを生成する
    ///
    /// 検証失敗オブジェクトは原因の連鎖の先頭に入り、
    /// そのフィールド違反が種別固有の情報になる。
    pub fn validation(message: impl Into<String>, failure: ValidationFailure) -> Self {
        let ValidationFailure {
            message: failure_message,
            violations,
        } = failure;

        let mut error = Self::with_kind(DomainErrorKind::Validation { violations }, message);
        error.causes.push(ErrorCause::new(failure_message));
        error
    }

    pub fn not_found(message: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::with_kind(
            DomainErrorKind::NotFound {
                entity: entity.into(),
            },
            message,
        )
    }

    pub fn already_exists(message: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::with_kind(
            DomainErrorKind::AlreadyExists {
                entity: entity.into(),
            },
            message,
        )
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::with_kind(DomainErrorKind::Unauthenticated, message)
    }

    pub fn unimplemented() -> Self {
        Self::with_kind(
            DomainErrorKind::Unimplemented,
            "Method is not implemented yet.",
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_kind(DomainErrorKind::Internal, message)
    }

    /// 原因を連鎖の末尾に追加する
    ///
    /// `source` の `source()` チェーンもたどって追加する。
    /// `source` が `DomainError` の場合は、その原因の連鎖をそのまま引き継ぐ。
    pub fn caused_by(mut self, source: &(dyn std::error::Error + 'static)) -> Self {
        self.causes.push(ErrorCause::new(source.to_string()));

        if let Some(inner) = source.downcast_ref::<DomainError>() {
            self.causes.extend(inner.causes.iter().cloned());
            return self;
        }

        let mut current = source.source();
        while let Some(err) = current {
            self.causes.push(ErrorCause::new(err.to_string()));
            current = err.source();
        }
        self
    }

    /// 原因を 1 件追加する
    pub fn with_cause(mut self, cause: ErrorCause) -> Self {
        self.causes.push(cause);
        self
    }

    pub fn kind(&self) -> &DomainErrorKind {
        &self.kind
    }

    /// ログ出力用の種別名（`"Validation"`, `"NotFound"` など）
    pub fn kind_name(&self) -> &'static str {
        (&self.kind).into()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 原因の連鎖（外側が先頭、根本原因が末尾）
    pub fn causes(&self) -> &[ErrorCause] {
        &self.causes
    }

    /// 自身のメッセージに続けて原因のメッセージを外側から順に返す
    pub fn chain(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.message.as_str()).chain(self.causes.iter().map(ErrorCause::message))
    }

    /// 検証エラーのフィールド違反
    ///
    /// 検証エラー以外では空スライスを返す。
    pub fn violations(&self) -> &[FieldViolation] {
        match &self.kind {
            DomainErrorKind::Validation { violations } => violations.as_slice(),
            _ => &[],
        }
    }

    /// NotFound / AlreadyExists のエンティティ識別子
    pub fn entity(&self) -> Option<&str> {
        match &self.kind {
            DomainErrorKind::NotFound { entity } | DomainErrorKind::AlreadyExists { entity } => {
                Some(entity)
            }
            _ => None,
        }
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }
}

// ===== トレイト実装 =====

impl fmt::Debug for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("causes", &self.causes)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for DomainError {}
