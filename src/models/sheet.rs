use crate::error::{AppError, Result};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::NaiveTime;
use indexmap::IndexMap;
use std::io::Cursor;

/// .xlsx 是 zip 容器
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// ERP 表格导出 (第一行为表头)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    /// 按内容识别: zip 头按 .xlsx 读取第一个工作表, 否则按 UTF-8 分隔文本
    pub fn from_upload(bytes: &[u8]) -> Result<Self> {
        if bytes.starts_with(ZIP_MAGIC) {
            return Self::from_xlsx(bytes);
        }
        let text = std::str::from_utf8(bytes).map_err(|_| {
            AppError::Validation("Arquivo deve ser CSV em UTF-8 ou planilha .xlsx".to_string())
        })?;
        Self::from_delimited(text)
    }

    /// 读取 .xlsx 的第一个工作表 (第一行为表头)
    pub fn from_xlsx(bytes: &[u8]) -> Result<Self> {
        let mut workbook: Xlsx<Cursor<&[u8]>> = open_workbook_from_rs(Cursor::new(bytes))
            .map_err(|e: calamine::XlsxError| AppError::Workbook(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AppError::Workbook("workbook has no sheets".to_string()))?
            .map_err(|e| AppError::Workbook(e.to_string()))?;

        let mut rows = range.rows().map(|r| r.iter().map(cell_text).collect::<Vec<_>>());
        let header = rows
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();
        let rows = rows
            .filter(|r| !r.iter().all(|cell| cell.trim().is_empty()))
            .collect();

        Ok(Self { header, rows })
    }

    /// 解析分隔文本; 分隔符按表头行中 ";" 与 "," 的数量判断
    pub fn from_delimited(text: &str) -> Result<Self> {
        let text = text.trim_start_matches('\u{feff}');
        let first_line = text.lines().next().unwrap_or_default();
        let delimiter = if first_line.matches(';').count() > first_line.matches(',').count() {
            b';'
        } else {
            b','
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let header = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { header, rows })
    }

    /// 按列名查找 (去空白, 不区分大小写)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.header
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }

    /// 查找全部必需列; 任一缺失则整体拒绝
    pub fn require_columns(&self, names: &[&str]) -> Result<Vec<usize>> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| self.column_index(n).is_none())
            .map(|n| n.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::ImportSchemaMismatch {
                missing,
                found: self.header.clone(),
            });
        }
        Ok(names.iter().filter_map(|n| self.column_index(n)).collect())
    }

    /// 单元格 (去空白); 短行缺失的单元格视为空
    pub fn cell<'a>(&self, row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(|s| s.trim()).unwrap_or_default()
    }

    /// 整行原始数据: 表头 → 单元格
    pub fn raw_attributes(&self, row: &[String]) -> IndexMap<String, String> {
        self.header
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), row.get(i).cloned().unwrap_or_default()))
            .collect()
    }
}

/// 单元格转文本; 日期按 ISO 写出 (午夜时只写日期)
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) if d.time() == NaiveTime::MIN => d.format("%Y-%m-%d").to_string(),
            Some(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        _ => String::new(),
    }
}
