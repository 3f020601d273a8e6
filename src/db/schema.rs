use sqlx::PgPool;

const DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS t_po_registry (
        tax_id          TEXT PRIMARY KEY,
        buyer_code      TEXT NOT NULL,
        raw_attributes  JSONB NOT NULL DEFAULT '{}'::jsonb,
        refreshed_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS t_po_open_item (
        id                    BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
        buyer_code            TEXT NOT NULL,
        due_date              DATE,
        settlement_reference  TEXT,
        amount                NUMERIC,
        raw_attributes        JSONB NOT NULL DEFAULT '{}'::jsonb,
        imported_at           TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_po_open_item_buyer ON t_po_open_item (buyer_code)",
    r#"
    CREATE TABLE IF NOT EXISTS t_po_order (
        id                BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
        created_at        TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        buyer_payload     JSONB NOT NULL,
        branch_payload    JSONB NOT NULL,
        line_items        JSONB NOT NULL,
        buyer_name        TEXT NOT NULL,
        tax_id            TEXT NOT NULL,
        buyer_code        TEXT,
        status_computed   TEXT NOT NULL,
        status_override   TEXT,
        status_effective  TEXT NOT NULL,
        decision_result   JSONB NOT NULL,
        document_name     TEXT NOT NULL,
        document_bytes    BYTEA NOT NULL
    )
    "#,
];

/// 建表 (已存在则跳过)
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in DDL {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!("Schema ready ({} statements)", DDL.len());
    Ok(())
}
