//! # FluxConfig Storage Service
//!
//! 設定ドキュメントを読み出す RPC サービス。
//!
//! すべての呼び出しは [`pipeline`] の横断的ハンドラ（認証、ロギング、例外境界）を
//! 通ってからユースケースに到達する。

pub mod app_builder;
pub mod client;
pub mod config;
pub mod handler;
pub mod pipeline;
pub mod rpc;
pub mod translator;
pub mod usecase;
