use crate::models::{NewOrderRecord, OrderRecord, OrderSummary};
use sqlx::types::Json;
use sqlx::PgPool;

/// 写入订单记录 (单条 INSERT); 返回新 ID
///
/// 计算状态与生效状态取判定结果, 人工状态为空。
pub async fn create(pool: &PgPool, record: &NewOrderRecord) -> Result<i64, sqlx::Error> {
    let status = record.decision.status.as_str();

    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO t_po_order (
            buyer_payload, branch_payload, line_items,
            buyer_name, tax_id, buyer_code,
            status_computed, status_override, status_effective, decision_result,
            document_name, document_bytes
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(Json(&record.request.buyer))
    .bind(Json(&record.request.branch))
    .bind(Json(&record.request.items))
    .bind(&record.buyer_name)
    .bind(&record.tax_id)
    .bind(&record.decision.buyer_code)
    .bind(status)
    .bind(Json(&record.decision))
    .bind(&record.document_name)
    .bind(&record.document_bytes)
    .fetch_one(pool)
    .await
}

/// 设置或清除人工状态; 返回是否找到记录
///
/// 清除时生效状态回到计算状态。人工状态为自由文本, 不做校验。
pub async fn set_override(
    pool: &PgPool,
    id: i64,
    status_override: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE t_po_order
        SET status_override = $2,
            status_effective = COALESCE($2, status_computed)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status_override)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 查询单据 (文件名, 字节)
pub async fn get_document(pool: &PgPool, id: i64) -> Result<Option<(String, Vec<u8>)>, sqlx::Error> {
    sqlx::query_as::<_, (String, Vec<u8>)>(
        r#"
        SELECT document_name, document_bytes
        FROM t_po_order
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// 查询完整订单记录
pub async fn get_order(pool: &PgPool, id: i64) -> Result<Option<OrderRecord>, sqlx::Error> {
    sqlx::query_as::<_, OrderRecord>(
        r#"
        SELECT id, created_at, buyer_payload, branch_payload, line_items,
               buyer_name, tax_id, buyer_code,
               status_computed, status_override, status_effective, decision_result,
               document_name, document_bytes
        FROM t_po_order
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// 订单摘要列表 (最新在前)
pub async fn list_summary(pool: &PgPool) -> Result<Vec<OrderSummary>, sqlx::Error> {
    sqlx::query_as::<_, OrderSummary>(
        r#"
        SELECT id, created_at, buyer_name, tax_id, buyer_code,
               status_computed, status_override, status_effective
        FROM t_po_order
        ORDER BY id DESC
        "#,
    )
    .fetch_all(pool)
    .await
}
