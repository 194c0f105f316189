//! # Campaign Service ライブラリ
//!
//! キャンペーン配信サービスの設定・ユースケース・ハンドラ・ルーター構築を公開する。
//! 結合テストからルーターを組み立てられるよう、バイナリとは分けている。

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
