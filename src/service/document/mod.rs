//! 订单单据生成 (纯计算, 不访问网络或数据库)

pub mod layout;
pub mod money;
pub mod pdf;

pub use layout::{Block, DocumentLayout, ItemRow, EMPTY_ITEMS_MESSAGE};
pub use money::{format_brl, format_quantity};
pub use pdf::HeaderImage;

use crate::config::DocumentConfig;
use crate::error::Result;
use crate::models::{DecisionResult, OrderRequest};

/// 文件名中的替代名称
const FALLBACK_NAME: &str = "Documento";

#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    filename_prefix: String,
    header_image: Option<HeaderImage>,
}

impl DocumentAssembler {
    pub fn new(filename_prefix: impl Into<String>, header_image: Option<HeaderImage>) -> Self {
        Self {
            filename_prefix: filename_prefix.into(),
            header_image,
        }
    }

    pub fn from_config(config: &DocumentConfig) -> Self {
        let header_image = config.logo_path.as_deref().and_then(HeaderImage::load);
        Self::new(config.filename_prefix.clone(), header_image)
    }

    /// 排版 (不生成字节)
    pub fn layout(&self, request: &OrderRequest, decision: &DecisionResult) -> Result<DocumentLayout> {
        DocumentLayout::build(request, decision, self.header_image.is_some())
    }

    /// 生成 PDF; 商品行为空时返回校验错误
    pub fn render(&self, request: &OrderRequest, decision: &DecisionResult) -> Result<Vec<u8>> {
        let layout = self.layout(request, decision)?;
        pdf::write_pdf(&layout, self.header_image.as_ref())
    }

    /// 前缀_名称.pdf; 空格转为 "_", 只保留字母数字与 "_" "-" "."
    pub fn suggested_filename(&self, buyer_name: &str) -> String {
        let name: String = buyer_name
            .trim()
            .replace(' ', "_")
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
            .collect();
        let name = name.trim_matches('.');
        let name = if name.is_empty() { FALLBACK_NAME } else { name };
        format!("{}_{}.pdf", self.filename_prefix, name)
    }
}
