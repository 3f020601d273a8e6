//! 单据版式: 自上而下的内容块

use super::money::{format_brl, format_quantity};
use crate::error::{AppError, Result};
use crate::models::{DecisionResult, OrderRequest};
use bigdecimal::{BigDecimal, Zero};

pub const TITLE: &str = "ORDEM DE COMPRA";
pub const TOTAL_LABEL: &str = "TOTAL GERAL";
pub const ITEM_HEADER: [&str; 6] = [
    "ITEM",
    "QTD",
    "CÓDIGO",
    "DESCRIÇÃO",
    "PREÇO UNIT (R$)",
    "TOTAL (R$)",
];
pub const NOTICE_SEND_TO: &str =
    "A ORDEM DE COMPRA DEVE SER ENVIADA PARA convenios@farmaciassaojoao.com.br";
pub const NOTICE_ORIGINAL: &str = "*A via original deve ser entregue na filial da venda*";
pub const SIGNATURE_LABEL: &str = "Assinatura e carimbo:";
pub const EMPTY_ITEMS_MESSAGE: &str = "Nenhum item adicionado.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Normal,
    Bold,
    Small,
    SmallItalic,
}

/// 商品行 (已格式化)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub sequence: usize,
    pub quantity: String,
    pub code: String,
    pub description: String,
    pub unit_price: String,
    pub line_total: String,
}

impl ItemRow {
    pub fn cells(&self) -> [String; 6] {
        [
            self.sequence.to_string(),
            self.quantity.clone(),
            self.code.clone(),
            self.description.clone(),
            self.unit_price.clone(),
            self.line_total.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    HeaderImage,
    Title(String),
    /// 居中的分节标题
    Caption(String),
    KeyValue(Vec<(String, String)>),
    /// 粗体标签 + 正文
    Labeled { label: String, text: String },
    Items { rows: Vec<ItemRow>, total: String },
    Text { text: String, style: TextStyle },
    Spacer(u16),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLayout {
    pub blocks: Vec<Block>,
}

impl DocumentLayout {
    /// 按固定顺序排版; 没有商品行时拒绝
    pub fn build(request: &OrderRequest, decision: &DecisionResult, with_header_image: bool) -> Result<Self> {
        if request.items.is_empty() {
            return Err(AppError::Validation(EMPTY_ITEMS_MESSAGE.to_string()));
        }

        let mut blocks = Vec::new();
        if with_header_image {
            blocks.push(Block::HeaderImage);
            blocks.push(Block::Spacer(4));
        }

        blocks.push(Block::Title(TITLE.to_string()));
        blocks.push(Block::Spacer(6));

        blocks.push(Block::Caption("EMPRESA SOLICITANTE".to_string()));
        blocks.push(Block::KeyValue(pairs(&request.buyer)));
        blocks.push(Block::Spacer(10));

        blocks.push(Block::Caption("FILIAL / FORNECEDOR".to_string()));
        blocks.push(Block::KeyValue(pairs(&request.branch)));
        blocks.push(Block::Spacer(12));

        blocks.push(Block::Labeled {
            label: "Prazo de Entrega:".to_string(),
            text: request.delivery_term.clone(),
        });
        blocks.push(Block::Spacer(16));

        blocks.push(Block::Caption("LISTAGEM DE PRODUTOS".to_string()));
        blocks.push(Block::Spacer(8));

        let mut total = BigDecimal::zero();
        let rows = request
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                total += &item.line_total;
                ItemRow {
                    sequence: idx + 1,
                    quantity: format_quantity(&item.quantity),
                    code: item.code.clone(),
                    description: item.description.clone(),
                    unit_price: format_brl(&item.unit_price),
                    line_total: format_brl(&item.line_total),
                }
            })
            .collect();
        blocks.push(Block::Items {
            rows,
            total: format_brl(&total),
        });
        blocks.push(Block::Spacer(20));

        blocks.push(Block::Labeled {
            label: "Condição de Pagamento:".to_string(),
            text: format!("Boleto em {}", request.payment_terms),
        });
        blocks.push(Block::Spacer(10));

        if !request.observations.trim().is_empty() {
            blocks.push(Block::Text {
                text: "OBSERVAÇÕES:".to_string(),
                style: TextStyle::Bold,
            });
            blocks.push(Block::Text {
                text: request.observations.clone(),
                style: TextStyle::Normal,
            });
            blocks.push(Block::Spacer(12));
        }

        let rationale = &decision.rationale;
        blocks.push(Block::Caption("SITUAÇÃO DO CLIENTE".to_string()));
        blocks.push(Block::KeyValue(vec![
            ("Status".to_string(), decision.status.label().to_string()),
            (
                "BP".to_string(),
                rationale.buyer_code.clone().unwrap_or_else(|| "-".to_string()),
            ),
            ("Motivo".to_string(), rationale.reason.clone()),
            (
                "Partidas em aberto".to_string(),
                format!(
                    "{} (vencidas: {}, a vencer: {})",
                    rationale.counts.open, rationale.counts.overdue, rationale.counts.upcoming
                ),
            ),
        ]));
        blocks.push(Block::Spacer(12));

        blocks.push(Block::Text {
            text: NOTICE_SEND_TO.to_string(),
            style: TextStyle::Small,
        });
        blocks.push(Block::Text {
            text: NOTICE_ORIGINAL.to_string(),
            style: TextStyle::SmallItalic,
        });
        blocks.push(Block::Spacer(36));
        blocks.push(Block::Labeled {
            label: SIGNATURE_LABEL.to_string(),
            text: "_________________________________".to_string(),
        });

        Ok(Self { blocks })
    }

    pub fn items_total(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            Block::Items { total, .. } => Some(total.as_str()),
            _ => None,
        })
    }
}

fn pairs(map: &indexmap::IndexMap<String, String>) -> Vec<(String, String)> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}
