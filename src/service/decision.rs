use crate::db::{ledger, registry};
use crate::error::Result;
use crate::models::{DecisionResult, OpenItemCounts, Rationale, ReleaseStatus};
use crate::normalize::only_digits;
use chrono::{Local, NaiveDate};
use sqlx::PgPool;

pub const REASON_NO_REGISTRATION: &str = "CNPJ não encontrado no cadastro de clientes.";
pub const REASON_OVERDUE: &str = "Existe(m) partida(s) em aberto vencida(s) (Data base < hoje).";
pub const REASON_UPCOMING: &str = "Existe(m) partida(s) em aberto a vencer (Data base >= hoje).";
pub const REASON_CLEAR: &str = "Sem partidas em aberto.";

/// 授信判定引擎 (只读)
pub struct DecisionEngine {
    pool: PgPool,
}

impl DecisionEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按服务器本地日期判定
    pub async fn evaluate(&self, tax_id: &str) -> Result<DecisionResult> {
        self.evaluate_on(tax_id, Local::now().date_naive()).await
    }

    /// 按指定日期判定
    ///
    /// 登记表与账款明细在同一个只读事务中读取, 保证单次判定读到一致的快照。
    pub async fn evaluate_on(&self, tax_id: &str, today: NaiveDate) -> Result<DecisionResult> {
        let tax_id = only_digits(tax_id);

        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let buyer_code = if tax_id.is_empty() {
            None
        } else {
            registry::find_buyer_code(&mut tx, &tax_id).await?
        };

        let due_dates = match &buyer_code {
            Some(code) => ledger::list_open_due_dates(&mut tx, code).await?,
            None => Vec::new(),
        };
        tx.commit().await?;

        let result = classify(&tax_id, buyer_code, &due_dates, today);
        tracing::info!(
            "Decision for {:?}: {} (open: {}, overdue: {}, upcoming: {})",
            result.rationale.tax_id,
            result.status,
            result.rationale.counts.open,
            result.rationale.counts.overdue,
            result.rationale.counts.upcoming
        );
        Ok(result)
    }
}

/// 判定规则: 未登记 > 有逾期 > 有未到期 > 放行, 首个命中即返回
///
/// 到期日早于今天为逾期; 到期日为空或不早于今天为未到期。
pub fn classify(
    tax_id: &str,
    buyer_code: Option<String>,
    open_due_dates: &[Option<NaiveDate>],
    today: NaiveDate,
) -> DecisionResult {
    let Some(code) = buyer_code else {
        return DecisionResult {
            status: ReleaseStatus::NoRegistration,
            buyer_code: None,
            rationale: Rationale {
                tax_id: tax_id.to_string(),
                buyer_code: None,
                reason: REASON_NO_REGISTRATION.to_string(),
                counts: OpenItemCounts::default(),
            },
        };
    };

    let overdue = open_due_dates
        .iter()
        .filter(|d| matches!(d, Some(due) if *due < today))
        .count();
    let counts = OpenItemCounts {
        open: open_due_dates.len(),
        overdue,
        upcoming: open_due_dates.len() - overdue,
    };

    let (status, reason) = if counts.overdue > 0 {
        (ReleaseStatus::Block, REASON_OVERDUE)
    } else if counts.upcoming > 0 {
        (ReleaseStatus::ReviewWithFinance, REASON_UPCOMING)
    } else {
        (ReleaseStatus::Release, REASON_CLEAR)
    };

    DecisionResult {
        status,
        buyer_code: Some(code.clone()),
        rationale: Rationale {
            tax_id: tax_id.to_string(),
            buyer_code: Some(code),
            reason: reason.to_string(),
            counts,
        },
    }
}
