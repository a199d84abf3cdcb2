//! # 外部サービスクライアント

pub mod management_service;

pub use management_service::{
    ManagementServiceClient,
    ManagementServiceClientImpl,
    ManagementServiceError,
};
