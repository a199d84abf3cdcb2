/// バリデーション付き String Newtype の共通メソッドを生成する内部マクロ
///
/// `define_validated_string!` の PII / 非 PII 両アームで共有される
/// `validate()`, `new()`, `as_str()`, `into_string()` を一括生成する。
macro_rules! _validated_string_common {
    ($Name:ident, $field:expr, $label:expr, $max_length:expr) => {
        impl $Name {
            /// ワイヤ上のフィールドパス
            pub const FIELD: &'static str = $field;

            /// trim + 空チェック + 最大長チェックを行う
            ///
            /// 失敗時はフィールド違反 1 件を返す。複数フィールドをまとめて検証する
            /// 呼び出し側は、違反を集めてから [`ValidationFailure`](crate::ValidationFailure) にする。
            pub fn validate(
                value: impl Into<String>,
            ) -> Result<Self, $crate::FieldViolation> {
                let value = value.into().trim().to_string();

                if value.is_empty() {
                    return Err($crate::FieldViolation::new(
                        Self::FIELD,
                        format!("{} must not be empty.", $label),
                    ));
                }

                if value.chars().count() > $max_length {
                    return Err($crate::FieldViolation::new(
                        Self::FIELD,
                        format!("{} must be at most {} characters.", $label, $max_length),
                    ));
                }

                Ok(Self(value))
            }

            pub fn new(value: impl Into<String>) -> Result<Self, $crate::DomainError> {
                Self::validate(value).map_err(|violation| {
                    $crate::DomainError::validation(
                        format!("Invalid {}.", $label),
                        $crate::ValidationFailure::from(violation),
                    )
                })
            }

            /// 文字列参照を取得する
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// 所有権を持つ文字列に変換する
            pub fn into_string(self) -> String {
                self.0
            }
        }
    };
}

/// バリデーション付き String Newtype を定義する宣言型マクロ
///
/// # PII モード
///
/// `pii: true` を指定すると:
/// - `Debug` 出力を `[REDACTED]` にマスクする
/// - `Display` impl を生成しない
///
/// API キーや設定キーのような資格情報に使う。
///
/// # 引数
///
/// - `field`: 検証失敗時のフィールドパス（例: `"configuration_tag"`）
/// - `label`: メッセージに使うラベル（例: `"configuration tag"`）
/// - `max_length`: 最大文字数（`chars().count()` でカウント）
///
/// # 使用例
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use fluxconfig_domain::value_objects::ConfigurationKey;
///
/// let key = ConfigurationKey::new("  abc  ")?;
/// assert_eq!(key.as_str(), "abc");
/// assert!(format!("{:?}", key).contains("[REDACTED]"));
/// # Ok(())
/// # }
/// ```
macro_rules! define_validated_string {
    // PII アーム: Debug をマスク、Display を生成しない
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident {
            field: $field:expr,
            label: $label:expr,
            max_length: $max_length:expr,
            pii: true $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash)]
        $vis struct $Name(String);

        impl std::fmt::Debug for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($Name)).field(&"[REDACTED]").finish()
            }
        }

        _validated_string_common!($Name, $field, $label, $max_length);
    };
    // 非 PII アーム: derive(Debug) + Display 生成
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident {
            field: $field:expr,
            label: $label:expr,
            max_length: $max_length:expr $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize,
            derive_more::Display,
        )]
        #[display("{_0}")]
        $vis struct $Name(String);

        _validated_string_common!($Name, $field, $label, $max_length);
    };
}
