/*
 * Responsibility
 * - middleware の公開インターフェース
 * - cors / http は Router 全体、user_sync は proxy routes のみに掛ける
 */
pub mod cors;
pub mod http;
pub mod user_sync;
