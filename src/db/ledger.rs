use crate::models::OpenItem;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

/// 单条 INSERT 的最大行数
const CHUNK_SIZE: usize = 1000;

/// 查询客户的未清项到期日 (结算凭证为空即未清)
pub async fn list_open_due_dates(
    conn: &mut PgConnection,
    buyer_code: &str,
) -> Result<Vec<Option<NaiveDate>>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<NaiveDate>>(
        r#"
        SELECT due_date
        FROM t_po_open_item
        WHERE buyer_code = $1
          AND (settlement_reference IS NULL OR TRIM(settlement_reference) = '')
        ORDER BY id
        "#,
    )
    .bind(buyer_code)
    .fetch_all(conn)
    .await
}

/// 整体替换账款明细: 先全部删除, 再批量插入; 单个事务
pub async fn replace_all(pool: &PgPool, items: &[OpenItem]) -> Result<u64, sqlx::Error> {
    let start_time = std::time::Instant::now();
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM t_po_open_item")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let mut inserted = 0;
    for chunk in items.chunks(CHUNK_SIZE) {
        let mut query_builder = sqlx::QueryBuilder::new(
            "INSERT INTO t_po_open_item (buyer_code, due_date, settlement_reference, amount, raw_attributes) ",
        );
        query_builder.push_values(chunk, |mut b, item| {
            b.push_bind(&item.buyer_code)
                .push_bind(item.due_date)
                .push_bind(&item.settlement_reference)
                .push_bind(item.amount.clone())
                .push_bind(Json(&item.raw_attributes));
        });
        inserted += query_builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    tracing::info!(
        "✓ Ledger replaced: {} removed, {} inserted, 耗时: {:?}",
        deleted, inserted, start_time.elapsed()
    );
    Ok(inserted)
}
