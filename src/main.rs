use order_release_rust::{
    api, create_pool, ensure_schema, AppConfig, DocumentAssembler, ImportService, OrderService,
};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!(
        "Starting server: {}:{}, admin token configured: {}",
        config.server.host,
        config.server.port,
        config.admin.token.is_some()
    );

    // 创建数据库连接池并建表
    let pool = create_pool(&config.database).await?;
    ensure_schema(&pool).await?;
    info!("Database pool created");

    let assembler = DocumentAssembler::from_config(&config.document);
    let orders = OrderService::new(pool.clone(), assembler);
    let imports = ImportService::new(pool, config.import.clone());
    let app = api::router(api::AppState::new(orders, imports, config.admin.token.clone()));

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/orders                  - 提交订单, 返回 PDF");
    info!("  GET  /api/decision/:tax_id        - 授信判定预览");
    info!("  GET  /api/admin/orders            - 订单列表 (需 X-Admin-Token)");
    info!("  POST /api/admin/import/registry   - 导入客户登记");
    info!("  POST /api/admin/import/ledger     - 导入账款明细");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
