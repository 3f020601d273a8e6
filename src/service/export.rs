use crate::error::{AppError, Result};
use crate::models::OrderSummary;

pub const EXPORT_HEADER: [&str; 8] = [
    "ID",
    "Data",
    "Empresa",
    "CNPJ",
    "BP",
    "Status Auto",
    "Status Manual",
    "Status Final",
];

/// 订单摘要导出为 CSV (时间按 UTC, 精确到秒)
pub fn summaries_to_csv(summaries: &[OrderSummary]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER).map_err(export_error)?;

    for s in summaries {
        writer.write_record([
            s.id.to_string(),
            s.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            s.buyer_name.clone(),
            s.tax_id.clone(),
            s.buyer_code.clone().unwrap_or_default(),
            s.status_computed.clone(),
            s.status_override.clone().unwrap_or_default(),
            s.status_effective.clone(),
        ])
        .map_err(export_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Document(e.to_string()))
}

/// 导出失败按服务端错误返回 (500)
fn export_error(e: csv::Error) -> AppError {
    AppError::Document(format!("CSV export: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn exports_header_and_quotes_fields() {
        let rows = vec![OrderSummary {
            id: 7,
            created_at: Utc.with_ymd_and_hms(2024, 5, 2, 13, 4, 5).unwrap(),
            buyer_name: "Drogaria Central, Ltda".to_string(),
            tax_id: "11222333000181".to_string(),
            buyer_code: None,
            status_computed: "NO_REGISTRATION".to_string(),
            status_override: Some("LIBERADO MANUAL".to_string()),
            status_effective: "LIBERADO MANUAL".to_string(),
        }];

        let text = String::from_utf8(summaries_to_csv(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "ID,Data,Empresa,CNPJ,BP,Status Auto,Status Manual,Status Final");
        assert_eq!(
            lines[1],
            "7,2024-05-02 13:04:05,\"Drogaria Central, Ltda\",11222333000181,,NO_REGISTRATION,LIBERADO MANUAL,LIBERADO MANUAL"
        );
    }
}
