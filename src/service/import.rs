use crate::config::ImportConfig;
use crate::db::{ledger, registry};
use crate::error::Result;
use crate::models::{ImportReport, NewRegistryEntry, OpenItem, SheetTable};
use crate::normalize::{only_digits, parse_date_lenient, parse_decimal_lenient};
use indexmap::IndexMap;
use sqlx::PgPool;

/// ERP 表格导入: 客户登记 (增量 upsert) 与账款明细 (整体替换)
pub struct ImportService {
    pool: PgPool,
    columns: ImportConfig,
}

impl ImportService {
    pub fn new(pool: PgPool, columns: ImportConfig) -> Self {
        Self { pool, columns }
    }

    /// 导入请求体上限 (字节)
    pub fn max_body_bytes(&self) -> usize {
        self.columns.max_body_bytes
    }

    /// 刷新客户登记表 (CSV 文本或 .xlsx)
    pub async fn refresh_registry(&self, upload: &[u8]) -> Result<ImportReport> {
        let sheet = SheetTable::from_upload(upload)?;
        let (entries, report) = map_registry_rows(&sheet, &self.columns)?;

        registry::upsert_entries(&self.pool, &entries).await?;
        tracing::info!(
            "Registry import: read {}, imported {}, skipped {}, distinct tax ids {}",
            report.rows_read, report.rows_imported, report.rows_skipped, entries.len()
        );
        Ok(report)
    }

    /// 刷新账款明细; 之前的全部明细被丢弃
    pub async fn refresh_ledger(&self, upload: &[u8]) -> Result<ImportReport> {
        let sheet = SheetTable::from_upload(upload)?;
        let (items, report) = map_ledger_rows(&sheet, &self.columns)?;

        ledger::replace_all(&self.pool, &items).await?;
        tracing::info!(
            "Ledger import: read {}, imported {} ({} open), skipped {}",
            report.rows_read,
            report.rows_imported,
            items.iter().filter(|i| i.is_open()).count(),
            report.rows_skipped
        );
        Ok(report)
    }
}

/// 登记表行映射; 税号为空或客户编码为空的行跳过, 同一税号后出现的行覆盖前面的
pub fn map_registry_rows(
    sheet: &SheetTable,
    columns: &ImportConfig,
) -> Result<(Vec<NewRegistryEntry>, ImportReport)> {
    let idx = sheet.require_columns(&[
        &columns.registry_tax_id_column,
        &columns.registry_buyer_code_column,
    ])?;
    let (idx_tax_id, idx_buyer) = (idx[0], idx[1]);

    let mut report = ImportReport::default();
    let mut entries: IndexMap<String, NewRegistryEntry> = IndexMap::new();

    for row in &sheet.rows {
        report.rows_read += 1;
        let tax_id = only_digits(sheet.cell(row, idx_tax_id));
        let buyer_code = sheet.cell(row, idx_buyer);
        if tax_id.is_empty() || buyer_code.is_empty() {
            report.rows_skipped += 1;
            tracing::warn!("Registry row {} skipped: empty tax id or buyer code", report.rows_read);
            continue;
        }

        report.rows_imported += 1;
        entries.insert(
            tax_id.clone(),
            NewRegistryEntry {
                tax_id,
                buyer_code: buyer_code.to_string(),
                raw_attributes: sheet.raw_attributes(row),
            },
        );
    }

    Ok((entries.into_values().collect(), report))
}

/// 账款明细行映射; 客户编码为空的行跳过, 金额列可选
pub fn map_ledger_rows(
    sheet: &SheetTable,
    columns: &ImportConfig,
) -> Result<(Vec<OpenItem>, ImportReport)> {
    let idx = sheet.require_columns(&[
        &columns.ledger_buyer_code_column,
        &columns.ledger_due_date_column,
        &columns.ledger_settlement_column,
    ])?;
    let (idx_buyer, idx_due, idx_settlement) = (idx[0], idx[1], idx[2]);
    let idx_amount = sheet.column_index(&columns.ledger_amount_column);

    let mut report = ImportReport::default();
    let mut items = Vec::with_capacity(sheet.rows.len());

    for row in &sheet.rows {
        report.rows_read += 1;
        let buyer_code = sheet.cell(row, idx_buyer);
        if buyer_code.is_empty() {
            report.rows_skipped += 1;
            continue;
        }

        let settlement = sheet.cell(row, idx_settlement);
        items.push(OpenItem {
            buyer_code: buyer_code.to_string(),
            due_date: parse_date_lenient(sheet.cell(row, idx_due)),
            settlement_reference: Some(settlement.to_string()).filter(|s| !s.is_empty()),
            amount: idx_amount.and_then(|i| parse_decimal_lenient(sheet.cell(row, i))),
            raw_attributes: sheet.raw_attributes(row),
        });
        report.rows_imported += 1;
    }

    Ok((items, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::ReleaseStatus;
    use crate::service::decision::classify;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[test]
    fn registry_rows_are_normalized_and_deduplicated() {
        let sheet = SheetTable::from_delimited(
            "Número CNPJ;Cliente;Nome\n\
             11.222.333/0001-81;BP100;Antigo\n\
             ;BP999;Sem CNPJ\n\
             22333444000155;;Sem BP\n\
             11222333000181;BP101;Novo\n",
        )
        .unwrap();

        let (entries, report) = map_registry_rows(&sheet, &ImportConfig::default()).unwrap();

        assert_eq!(report, ImportReport { rows_read: 4, rows_imported: 2, rows_skipped: 2 });
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tax_id, "11222333000181");
        assert_eq!(entries[0].buyer_code, "BP101");
        assert_eq!(entries[0].raw_attributes.get("Nome").map(String::as_str), Some("Novo"));
    }

    #[test]
    fn ledger_rows_parse_dates_amounts_and_settlement() {
        let sheet = SheetTable::from_delimited(
            "Cliente;Data base;Compensaç.;Montante em MI\n\
             BP100;2024-05-01;;1.500,00\n\
             BP100;15/06/2024;DOC123;10\n\
             BP200;sem data; ;abc\n\
             ;2024-01-01;;5\n",
        )
        .unwrap();

        let (items, report) = map_ledger_rows(&sheet, &ImportConfig::default()).unwrap();

        assert_eq!(report, ImportReport { rows_read: 4, rows_imported: 3, rows_skipped: 1 });
        assert_eq!(items[0].due_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(items[0].amount, Some(BigDecimal::from_str("1500").unwrap()));
        assert!(items[0].is_open());

        assert_eq!(items[1].due_date, NaiveDate::from_ymd_opt(2024, 6, 15));
        assert_eq!(items[1].settlement_reference.as_deref(), Some("DOC123"));
        assert!(!items[1].is_open());

        assert_eq!(items[2].due_date, None);
        assert_eq!(items[2].amount, None);
        assert_eq!(items[2].settlement_reference, None);
        assert!(items[2].is_open());
    }

    #[test]
    fn ledger_amount_column_is_optional() {
        let sheet =
            SheetTable::from_delimited("Cliente,Data base,Compensaç.\nBP1,2024-01-01,\n").unwrap();
        let (items, _) = map_ledger_rows(&sheet, &ImportConfig::default()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, None);
    }

    #[test]
    fn missing_required_column_aborts_before_rows() {
        let sheet = SheetTable::from_delimited("Cliente;Vencimento\nBP1;2024-01-01\n").unwrap();
        let err = map_ledger_rows(&sheet, &ImportConfig::default()).unwrap_err();
        match err {
            AppError::ImportSchemaMismatch { missing, found } => {
                assert_eq!(missing, vec!["Data base", "Compensaç."]);
                assert_eq!(found, vec!["Cliente", "Vencimento"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// 与 db::ledger::list_open_due_dates 相同的筛选
    fn open_due_dates(items: &[OpenItem], buyer_code: &str) -> Vec<Option<NaiveDate>> {
        items
            .iter()
            .filter(|i| i.buyer_code == buyer_code && i.is_open())
            .map(|i| i.due_date)
            .collect()
    }

    #[test]
    fn second_ledger_export_fully_supersedes_the_first() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let columns = ImportConfig::default();
        let first = SheetTable::from_delimited(
            "Cliente;Data base;Compensaç.\nBP100;2024-06-01;\nBP200;2024-05-01;\n",
        )
        .unwrap();
        let second =
            SheetTable::from_delimited("Cliente;Data base;Compensaç.\nBP200;2024-07-01;\n").unwrap();

        let (ledger, _) = map_ledger_rows(&first, &columns).unwrap();
        let status = |ledger: &[OpenItem], code: &str| {
            classify("1", Some(code.to_string()), &open_due_dates(ledger, code), today).status
        };
        assert_eq!(status(&ledger, "BP100"), ReleaseStatus::Block);
        assert_eq!(status(&ledger, "BP200"), ReleaseStatus::Block);

        let (ledger, report) = map_ledger_rows(&second, &columns).unwrap();
        assert_eq!(report.rows_imported, 1);
        assert_eq!(status(&ledger, "BP100"), ReleaseStatus::Release);
        assert_eq!(status(&ledger, "BP200"), ReleaseStatus::ReviewWithFinance);
    }
}
