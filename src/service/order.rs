use crate::db::orders;
use crate::error::{AppError, Result};
use crate::models::{NewOrderRecord, OrderRecord, OrderRequest, OrderSummary, SubmittedOrder};
use crate::service::decision::DecisionEngine;
use crate::service::document::{DocumentAssembler, EMPTY_ITEMS_MESSAGE};
use sqlx::PgPool;

/// 下单服务: 判定 → 生成单据 → 存档
pub struct OrderService {
    pool: PgPool,
    engine: DecisionEngine,
    assembler: DocumentAssembler,
}

impl OrderService {
    pub fn new(pool: PgPool, assembler: DocumentAssembler) -> Self {
        Self {
            engine: DecisionEngine::new(pool.clone()),
            pool,
            assembler,
        }
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// 提交订单; 返回的字节与存档字节完全一致
    ///
    /// 校验失败时不写入任何数据。
    pub async fn submit(&self, request: OrderRequest) -> Result<SubmittedOrder> {
        if request.items.is_empty() {
            return Err(AppError::Validation(EMPTY_ITEMS_MESSAGE.to_string()));
        }

        let tax_id = request.tax_id();
        let buyer_name = request.buyer_name();

        let decision = self.engine.evaluate(&tax_id).await?;
        let document_bytes = self.assembler.render(&request, &decision)?;
        let document_name = self.assembler.suggested_filename(&buyer_name);

        let record = NewOrderRecord {
            request,
            buyer_name,
            tax_id,
            decision,
            document_name,
            document_bytes,
        };
        let id = orders::create(&self.pool, &record).await?;

        tracing::info!(
            "Order {} archived: {} ({}), status {}, {} bytes",
            id,
            record.buyer_name,
            record.tax_id,
            record.decision.status,
            record.document_bytes.len()
        );

        Ok(SubmittedOrder {
            id,
            decision: record.decision,
            document_name: record.document_name,
            document_bytes: record.document_bytes,
        })
    }

    /// 设置/清除人工状态; 空白文本视为清除
    pub async fn set_override(&self, id: i64, status_override: Option<&str>) -> Result<()> {
        let status_override = status_override.map(str::trim).filter(|s| !s.is_empty());
        if !orders::set_override(&self.pool, id, status_override).await? {
            return Err(AppError::NotFound(format!("Ordem {id} não encontrada")));
        }
        tracing::info!("Order {} override set to {:?}", id, status_override);
        Ok(())
    }

    pub async fn get_document(&self, id: i64) -> Result<(String, Vec<u8>)> {
        orders::get_document(&self.pool, id)
            .await?
            .filter(|(_, bytes)| !bytes.is_empty())
            .ok_or_else(|| AppError::NotFound("PDF não encontrado".to_string()))
    }

    pub async fn get_order(&self, id: i64) -> Result<OrderRecord> {
        orders::get_order(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ordem {id} não encontrada")))
    }

    pub async fn list_summary(&self) -> Result<Vec<OrderSummary>> {
        Ok(orders::list_summary(&self.pool).await?)
    }
}
