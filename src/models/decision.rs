use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 放行状态 (按优先级从高到低)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseStatus {
    NoRegistration,
    Block,
    ReviewWithFinance,
    Release,
}

impl ReleaseStatus {
    /// 持久化与接口中使用的代码
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::NoRegistration => "NO_REGISTRATION",
            ReleaseStatus::Block => "BLOCK",
            ReleaseStatus::ReviewWithFinance => "REVIEW_WITH_FINANCE",
            ReleaseStatus::Release => "RELEASE",
        }
    }

    /// 单据上显示的文字
    pub fn label(&self) -> &'static str {
        match self {
            ReleaseStatus::NoRegistration => "NÃO POSSUI CADASTRO",
            ReleaseStatus::Block => "NÃO LIBERAR",
            ReleaseStatus::ReviewWithFinance => "VERIFICAR COM FINANCEIRO",
            ReleaseStatus::Release => "LIBERAR",
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NO_REGISTRATION" => Ok(ReleaseStatus::NoRegistration),
            "BLOCK" => Ok(ReleaseStatus::Block),
            "REVIEW_WITH_FINANCE" => Ok(ReleaseStatus::ReviewWithFinance),
            "RELEASE" => Ok(ReleaseStatus::Release),
            other => Err(format!("unknown release status: {other}")),
        }
    }
}

/// 未清项统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenItemCounts {
    pub open: usize,
    pub overdue: usize,
    pub upcoming: usize,
}

/// 判定依据 (随单据存档)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rationale {
    pub tax_id: String,
    pub buyer_code: Option<String>,
    pub reason: String,
    pub counts: OpenItemCounts,
}

/// 授信判定结果; 每次下单实时计算, 不缓存
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub status: ReleaseStatus,
    pub buyer_code: Option<String>,
    pub rationale: Rationale,
}
