pub mod handlers;

pub use handlers::*;

use crate::service::{ImportService, OrderService};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub imports: Arc<ImportService>,
    /// 管理接口令牌; None 时所有管理接口返回 401
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(orders: OrderService, imports: ImportService, admin_token: Option<String>) -> Self {
        Self {
            orders: Arc::new(orders),
            imports: Arc::new(imports),
            admin_token: admin_token
                .filter(|t| !t.trim().is_empty())
                .map(Arc::from),
        }
    }
}

/// 构建路由
pub fn router(state: AppState) -> Router {
    // 导入请求体上限取 import.max_body_bytes
    let import_routes = Router::new()
        .route("/api/admin/import/registry", post(handlers::import_registry))
        .route("/api/admin/import/ledger", post(handlers::import_ledger))
        .layer(DefaultBodyLimit::max(state.imports.max_body_bytes()));

    let admin_routes = Router::new()
        .route("/api/admin/orders", get(handlers::list_orders))
        .route("/api/admin/orders/export.csv", get(handlers::export_orders))
        .route("/api/admin/orders/:id", get(handlers::get_order))
        .route("/api/admin/orders/:id/document", get(handlers::get_document))
        .route("/api/admin/orders/:id/status", post(handlers::set_status))
        .merge(import_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::require_admin,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/orders", post(handlers::submit_order))
        .route("/api/decision/:tax_id", get(handlers::preview_decision))
        .merge(admin_routes)
        .with_state(state)
}
