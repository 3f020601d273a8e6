//! 授信判定场景 (需要 ORDER_TEST_DATABASE_URL, 未设置时跳过)
//!
//! 账款明细刷新会清空全表, 依赖明细的场景集中在同一个测试函数中顺序执行。

use chrono::{Duration, Local};
use order_release_rust::{
    config::ImportConfig, db, ensure_schema, models::ReleaseStatus, service::decision, ImportService,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("ORDER_TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new().max_connections(4).connect(&url).await.ok()?;
    ensure_schema(&pool).await.ok()?;
    Some(pool)
}

#[tokio::test]
async fn decisions_follow_registry_and_ledger() {
    let Some(pool) = test_pool().await else {
        eprintln!("ORDER_TEST_DATABASE_URL not set, skipping");
        return;
    };
    let imports = ImportService::new(pool.clone(), ImportConfig::default());
    let engine = order_release_rust::DecisionEngine::new(pool.clone());

    let today = Local::now().date_naive();
    let yesterday = (today - Duration::days(1)).format("%Y-%m-%d");
    let tomorrow = (today + Duration::days(1)).format("%d/%m/%Y");

    let report = imports
        .refresh_registry(
            "Número CNPJ;Cliente;Nome\n\
             90.100.100/0001-00;BP100;Atrasado\n\
             90.200.200/0001-00;BP200;A vencer\n\
             90.300.300/0001-00;BP300;Em dia\n"
                .as_bytes(),
        )
        .await
        .unwrap();
    assert_eq!(report.rows_imported, 3);

    let ledger = format!(
        "Cliente;Data base;Compensaç.;Montante em MI\n\
         BP100;{yesterday};;100,00\n\
         BP200;{tomorrow};;50,00\n\
         BP300;{yesterday};DOC-1;75,00\n"
    );
    imports.refresh_ledger(ledger.as_bytes()).await.unwrap();

    // 未登记: 即使账款表中有同名编码也不看明细
    let r = engine.evaluate_on("11.222.333/0001-81", today).await.unwrap();
    assert_eq!(r.status, ReleaseStatus::NoRegistration);
    assert_eq!(r.buyer_code, None);

    let r = engine.evaluate_on("90100100000100", today).await.unwrap();
    assert_eq!(r.status, ReleaseStatus::Block);
    assert_eq!(r.buyer_code.as_deref(), Some("BP100"));
    assert_eq!(r.rationale.counts.overdue, 1);

    let r = engine.evaluate_on("90.200.200/0001-00", today).await.unwrap();
    assert_eq!(r.status, ReleaseStatus::ReviewWithFinance);
    assert_eq!(r.rationale.reason, decision::REASON_UPCOMING);

    // 已结清的明细不算未清项
    let r = engine.evaluate_on("90300300000100", today).await.unwrap();
    assert_eq!(r.status, ReleaseStatus::Release);
    assert_eq!(r.rationale.counts.open, 0);

    // 整体替换: 新明细中没有 BP100, 之前的逾期项不再生效
    imports
        .refresh_ledger("Cliente;Data base;Compensaç.\nBP300;2000-01-01;\n".as_bytes())
        .await
        .unwrap();
    let r = engine.evaluate_on("90100100000100", today).await.unwrap();
    assert_eq!(r.status, ReleaseStatus::Release);
    let r = engine.evaluate_on("90300300000100", today).await.unwrap();
    assert_eq!(r.status, ReleaseStatus::Block);

    // 空表导入清空全部明细
    imports.refresh_ledger("Cliente;Data base;Compensaç.\n".as_bytes()).await.unwrap();
    let r = engine.evaluate_on("90300300000100", today).await.unwrap();
    assert_eq!(r.status, ReleaseStatus::Release);
}

#[tokio::test]
async fn registry_refresh_is_idempotent_and_last_write_wins() {
    let Some(pool) = test_pool().await else {
        eprintln!("ORDER_TEST_DATABASE_URL not set, skipping");
        return;
    };
    let imports = ImportService::new(pool.clone(), ImportConfig::default());
    let sheet = "Número CNPJ,Cliente\n91.000.000/0001-91,BP910\n";

    imports.refresh_registry(sheet.as_bytes()).await.unwrap();
    imports.refresh_registry(sheet.as_bytes()).await.unwrap();
    let entry = db::registry::get_entry(&pool, "91000000000191").await.unwrap().unwrap();
    assert_eq!(entry.buyer_code, "BP910");
    assert_eq!(entry.raw_attributes.0.get("Cliente").map(String::as_str), Some("BP910"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t_po_registry WHERE tax_id = $1")
        .bind("91000000000191")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    imports
        .refresh_registry("Número CNPJ,Cliente\n91000000000191,BP911\n".as_bytes())
        .await
        .unwrap();
    let entry = db::registry::get_entry(&pool, "91000000000191").await.unwrap().unwrap();
    assert_eq!(entry.buyer_code, "BP911");
}
