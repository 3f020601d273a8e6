use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// 客户登记表 (t_po_registry): 税号 → 客户编码
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub tax_id: String,
    pub buyer_code: String,
    pub raw_attributes: Json<IndexMap<String, String>>,
    pub refreshed_at: DateTime<Utc>,
}

/// 待写入的登记行 (refreshed_at 由数据库填写)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistryEntry {
    pub tax_id: String,
    pub buyer_code: String,
    pub raw_attributes: IndexMap<String, String>,
}
