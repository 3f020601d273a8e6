use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 账款明细 (t_po_open_item)
///
/// 结算凭证为空或空白时视为未清项。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenItem {
    pub buyer_code: String,
    pub due_date: Option<NaiveDate>,
    pub settlement_reference: Option<String>,
    pub amount: Option<BigDecimal>,
    pub raw_attributes: IndexMap<String, String>,
}

impl OpenItem {
    pub fn is_open(&self) -> bool {
        self.settlement_reference
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
    }
}

/// 导入统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub rows_read: usize,
    pub rows_imported: usize,
    pub rows_skipped: usize,
}
