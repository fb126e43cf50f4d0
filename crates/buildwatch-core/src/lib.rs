//! buildwatch-core
//!
//! Build notification dispatcher: consumes "build finished" notifications,
//! filters them, and triggers one test job per (test type, node).
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, notification, properties, platform, target, errors）
//! - **config**: JSON 設定ファイル
//! - **dispatch**: 純粋な判断ロジック（filter, transform, mapper, planner）
//! - **ports**: 抽象化レイヤー（NotificationSource, JobTrigger, NotificationArchive, Clock, IdGenerator）
//! - **impls**: ports の実装（channel / file / stdin source, Jenkins trigger, file archive）
//! - **app**: アプリケーションロジック（builder, engine, listener, ondemand）

pub mod app;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod impls;
pub mod ports;
