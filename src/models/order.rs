use crate::models::decision::DecisionResult;
use crate::normalize::{only_digits, parse_decimal_lenient};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

/// 未提供公司名称时的显示名
pub const DEFAULT_BUYER_NAME: &str = "Documento";

const TAX_ID_KEYS: &[&str] = &["CNPJ", "tax_id"];
const NAME_KEYS: &[&str] = &["Empresa", "name"];

/// 下单请求体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(default, alias = "cliente", deserialize_with = "text_map")]
    pub buyer: IndexMap<String, String>,
    #[serde(default, alias = "filial", deserialize_with = "text_map")]
    pub branch: IndexMap<String, String>,
    #[serde(default, alias = "itens")]
    pub items: Vec<LineItemInput>,
    #[serde(default, alias = "obs", deserialize_with = "text")]
    pub observations: String,
    #[serde(default, alias = "pagamento", deserialize_with = "text")]
    pub payment_terms: String,
    #[serde(default, alias = "prazo", deserialize_with = "text")]
    pub delivery_term: String,
}

/// 商品明细 (单价、小计由调用方计算)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItemInput {
    #[serde(default, alias = "qtd", deserialize_with = "decimal")]
    pub quantity: BigDecimal,
    #[serde(default, alias = "cod", deserialize_with = "text")]
    pub code: String,
    #[serde(default, alias = "desc", deserialize_with = "text")]
    pub description: String,
    #[serde(default, alias = "preco", deserialize_with = "decimal")]
    pub unit_price: BigDecimal,
    #[serde(default, alias = "tot", deserialize_with = "decimal")]
    pub line_total: BigDecimal,
}

impl OrderRequest {
    /// 买方税号 (仅数字); 缺失时为空串
    pub fn tax_id(&self) -> String {
        lookup(&self.buyer, TAX_ID_KEYS)
            .map(only_digits)
            .unwrap_or_default()
    }

    /// 买方显示名
    pub fn buyer_name(&self) -> String {
        lookup(&self.buyer, NAME_KEYS)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BUYER_NAME)
            .to_string()
    }
}

fn lookup<'a>(map: &'a IndexMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        map.iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    })
}

fn value_to_text(v: Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Value::deserialize(d).map(value_to_text)
}

fn text_map<'de, D: Deserializer<'de>>(d: D) -> Result<IndexMap<String, String>, D::Error> {
    let raw = Option::<IndexMap<String, Value>>::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, value_to_text(v)))
        .collect())
}

/// 数字或字符串; 空值按 0 处理, 超出范围的值拒绝
fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<BigDecimal, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(BigDecimal::zero()),
        Value::Number(n) => parse_decimal_lenient(&n.to_string())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid decimal: {n}"))),
        Value::String(s) if s.trim().is_empty() => Ok(BigDecimal::zero()),
        Value::String(s) => parse_decimal_lenient(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid decimal: {s}"))),
        other => Err(serde::de::Error::custom(format!("invalid decimal: {other}"))),
    }
}

/// 待写入的订单记录
#[derive(Debug, Clone)]
pub struct NewOrderRecord {
    pub request: OrderRequest,
    pub buyer_name: String,
    pub tax_id: String,
    pub decision: DecisionResult,
    pub document_name: String,
    pub document_bytes: Vec<u8>,
}

/// 订单记录 (t_po_order), 审计轨迹
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub buyer_payload: Json<IndexMap<String, String>>,
    pub branch_payload: Json<IndexMap<String, String>>,
    pub line_items: Json<Vec<LineItemInput>>,
    pub buyer_name: String,
    pub tax_id: String,
    pub buyer_code: Option<String>,
    pub status_computed: String,
    pub status_override: Option<String>,
    pub status_effective: String,
    pub decision_result: Json<DecisionResult>,
    pub document_name: String,
    #[serde(skip)]
    pub document_bytes: Vec<u8>,
}

/// 列表/导出用的摘要行
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub buyer_name: String,
    pub tax_id: String,
    pub buyer_code: Option<String>,
    pub status_computed: String,
    pub status_override: Option<String>,
    pub status_effective: String,
}

/// 下单结果: 返回给请求方的单据与判定
#[derive(Debug, Clone)]
pub struct SubmittedOrder {
    pub id: i64,
    pub decision: DecisionResult,
    pub document_name: String,
    pub document_bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn accepts_form_field_names_and_brazilian_numbers() {
        let req: OrderRequest = serde_json::from_value(serde_json::json!({
            "cliente": {"Empresa": "Drogaria Central", "CNPJ": "11.222.333/0001-81", "Filiais": 3},
            "filial": {"Filial": "Loja 12"},
            "itens": [
                {"qtd": "2", "cod": 789, "desc": "Dipirona 500mg", "preco": "1.234,50", "tot": "2.469,00"},
                {"qtd": 1.5, "cod": "A1", "desc": "Soro", "preco": 10, "tot": null}
            ],
            "obs": "Entregar pela manhã",
            "pagamento": "28 dias",
            "prazo": "5 dias úteis"
        }))
        .unwrap();

        assert_eq!(req.tax_id(), "11222333000181");
        assert_eq!(req.buyer_name(), "Drogaria Central");
        assert_eq!(req.buyer.get("Filiais").map(String::as_str), Some("3"));
        assert_eq!(req.buyer.keys().collect::<Vec<_>>(), vec!["Empresa", "CNPJ", "Filiais"]);
        assert_eq!(req.items.len(), 2);
        assert_eq!(req.items[0].code, "789");
        assert_eq!(req.items[0].unit_price, BigDecimal::from_str("1234.50").unwrap());
        assert_eq!(req.items[0].line_total, BigDecimal::from_str("2469").unwrap());
        assert_eq!(req.items[1].quantity, BigDecimal::from_str("1.5").unwrap());
        assert_eq!(req.items[1].line_total, BigDecimal::zero());
        assert_eq!(req.payment_terms, "28 dias");
        assert_eq!(req.delivery_term, "5 dias úteis");
    }

    #[test]
    fn missing_buyer_fields_fall_back() {
        let req: OrderRequest = serde_json::from_value(serde_json::json!({
            "buyer": {"empresa": "  "},
            "items": []
        }))
        .unwrap();

        assert_eq!(req.tax_id(), "");
        assert_eq!(req.buyer_name(), DEFAULT_BUYER_NAME);
        assert!(req.branch.is_empty());
        assert_eq!(req.observations, "");
    }

    #[test]
    fn rejects_non_numeric_price() {
        let err = serde_json::from_value::<LineItemInput>(serde_json::json!({"preco": "dez"}))
            .unwrap_err();
        assert!(err.to_string().contains("invalid decimal"));
    }

    #[test]
    fn rejects_out_of_range_amounts() {
        for tot in [serde_json::json!("1e200000000"), serde_json::json!(1e300)] {
            let err = serde_json::from_value::<LineItemInput>(serde_json::json!({"tot": tot}))
                .unwrap_err();
            assert!(err.to_string().contains("invalid decimal"), "{err}");
        }
    }
}
