//! 统一错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// 必填输入缺失或为空; 请求被拒绝, 不产生任何写入
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// 连接或约束错误; 不重试
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// 导入表格缺少必需列, 在处理任何行之前拒绝
    #[error("missing columns {missing:?}; found columns {found:?}")]
    ImportSchemaMismatch {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// 上传的 .xlsx 无法读取
    #[error("workbook error: {0}")]
    Workbook(String),

    #[error("document error: {0}")]
    Document(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
