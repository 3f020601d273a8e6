use super::AppState;
use crate::error::AppError;
use crate::models::{DecisionResult, ImportReport, OrderRecord, OrderRequest, OrderSummary};
use crate::service::summaries_to_csv;
use axum::{
    body::Bytes,
    extract::{Json, Path, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";
pub const RELEASE_STATUS_HEADER: &str = "x-release-status";
pub const ORDER_ID_HEADER: &str = "x-order-id";

/// RFC 5987 attr-char 之外的字节全部编码
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// 响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

/// 请求体: 人工状态 (null 或空白表示清除)
#[derive(Debug, Deserialize)]
pub struct StatusOverrideRequest {
    #[serde(default)]
    pub status_override: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_)
            | AppError::ImportSchemaMismatch { .. }
            | AppError::Csv(_)
            | AppError::Workbook(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) | AppError::Document(_) | AppError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = ApiResponse {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 管理接口鉴权: X-Admin-Token 必须与配置一致
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let authorized = match (state.admin_token.as_deref(), req.headers().get(ADMIN_TOKEN_HEADER)) {
        (Some(expected), Some(given)) => given.as_bytes().ct_eq(expected.as_bytes()).into(),
        _ => false,
    };
    if authorized {
        return next.run(req).await;
    }

    tracing::warn!("Admin request rejected: {} {}", req.method(), req.uri().path());
    let body = ApiResponse {
        success: false,
        message: "unauthorized".to_string(),
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// 提交订单, 返回 PDF
///
/// 请求体字段无法解析 (如金额超出范围) 时按校验错误返回 400。
pub async fn submit_order(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Response, AppError> {
    let req: OrderRequest =
        serde_json::from_value(payload).map_err(|e| AppError::Validation(e.to_string()))?;
    let order = state.orders.submit(req).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(&order.document_name)?);
    headers.insert(
        RELEASE_STATUS_HEADER,
        HeaderValue::from_static(order.decision.status.as_str()),
    );
    headers.insert(ORDER_ID_HEADER, HeaderValue::from(order.id));

    Ok((StatusCode::OK, headers, order.document_bytes).into_response())
}

/// 判定预览 (不写入)
pub async fn preview_decision(
    State(state): State<AppState>,
    Path(tax_id): Path<String>,
) -> Result<Json<DecisionResult>, AppError> {
    Ok(Json(state.orders.engine().evaluate(&tax_id).await?))
}

pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<OrderSummary>>, AppError> {
    Ok(Json(state.orders.list_summary().await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderRecord>, AppError> {
    Ok(Json(state.orders.get_order(id).await?))
}

/// 下载存档 PDF
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let (name, bytes) = state.orders.get_document(id).await?;
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
        (header::CONTENT_DISPOSITION, content_disposition(&name)?),
    ];
    Ok((headers, bytes).into_response())
}

pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<StatusOverrideRequest>,
) -> Result<Json<ApiResponse>, AppError> {
    state
        .orders
        .set_override(id, req.status_override.as_deref())
        .await?;
    Ok(Json(ApiResponse {
        success: true,
        message: format!("Order {id} updated"),
    }))
}

pub async fn export_orders(State(state): State<AppState>) -> Result<Response, AppError> {
    let summaries = state.orders.list_summary().await?;
    let bytes = summaries_to_csv(&summaries)?;
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
        (
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"ordens.csv\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

pub async fn import_registry(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportReport>, AppError> {
    Ok(Json(state.imports.refresh_registry(&body).await?))
}

pub async fn import_ledger(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportReport>, AppError> {
    Ok(Json(state.imports.refresh_ledger(&body).await?))
}

/// attachment; filename="ascii"; filename*=UTF-8''pct-encoded
pub fn content_disposition(filename: &str) -> Result<HeaderValue, AppError> {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        utf8_percent_encode(filename, ATTR_CHAR)
    );
    HeaderValue::from_str(&value).map_err(|e| AppError::Document(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_disposition_keeps_utf8_name() {
        let v = content_disposition("Ordem_Compra_São_João.pdf").unwrap();
        assert_eq!(
            v.to_str().unwrap(),
            "attachment; filename=\"Ordem_Compra_S_o_Jo_o.pdf\"; filename*=UTF-8''Ordem_Compra_S%C3%A3o_Jo%C3%A3o.pdf"
        );

        let v = content_disposition("Ordem Compra (1);x.pdf").unwrap();
        assert!(v.to_str().unwrap().ends_with("UTF-8''Ordem%20Compra%20%281%29%3Bx.pdf"));
    }

    #[test]
    fn error_status_mapping() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                AppError::ImportSchemaMismatch { missing: vec![], found: vec![] },
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Workbook("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Document("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
