use crate::models::{NewRegistryEntry, RegistryEntry};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

/// 单条 INSERT 的最大行数
const CHUNK_SIZE: usize = 1000;

/// 按税号查询客户编码
pub async fn find_buyer_code(
    conn: &mut PgConnection,
    tax_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT buyer_code
        FROM t_po_registry
        WHERE tax_id = $1
        "#,
    )
    .bind(tax_id)
    .fetch_optional(conn)
    .await
}

/// 查询完整登记行
pub async fn get_entry(pool: &PgPool, tax_id: &str) -> Result<Option<RegistryEntry>, sqlx::Error> {
    sqlx::query_as::<_, RegistryEntry>(
        r#"
        SELECT tax_id, buyer_code, raw_attributes, refreshed_at
        FROM t_po_registry
        WHERE tax_id = $1
        "#,
    )
    .bind(tax_id)
    .fetch_optional(pool)
    .await
}

/// 批量 upsert (按税号, 后到覆盖); 单个事务
///
/// 同一批次内税号必须唯一, 否则 ON CONFLICT 会报错。
pub async fn upsert_entries(pool: &PgPool, entries: &[NewRegistryEntry]) -> Result<u64, sqlx::Error> {
    if entries.is_empty() {
        return Ok(0);
    }

    let start_time = std::time::Instant::now();
    let mut tx = pool.begin().await?;
    let mut affected = 0;

    for chunk in entries.chunks(CHUNK_SIZE) {
        let mut query_builder = sqlx::QueryBuilder::new(
            "INSERT INTO t_po_registry (tax_id, buyer_code, raw_attributes, refreshed_at) ",
        );
        query_builder.push_values(chunk, |mut b, entry| {
            b.push_bind(&entry.tax_id)
                .push_bind(&entry.buyer_code)
                .push_bind(Json(&entry.raw_attributes))
                .push("NOW()");
        });
        query_builder.push(
            " ON CONFLICT (tax_id) DO UPDATE SET \
             buyer_code = EXCLUDED.buyer_code, \
             raw_attributes = EXCLUDED.raw_attributes, \
             refreshed_at = NOW()",
        );

        affected += query_builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    tracing::debug!("Registry upsert: {} rows, 耗时: {:?}", affected, start_time.elapsed());
    Ok(affected)
}
