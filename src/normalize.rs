//! 输入归一化: 税号、十进制数、日期
//!
//! 表格导出的格式并不统一, 这里的解析函数都是宽松的:
//! 无法识别时返回 `None`, 不报错。

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use std::str::FromStr;

/// 依次尝试的日期格式 (仅日期)
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y"];

/// 依次尝试的日期时间格式 (取日期部分)
pub const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// 十进制数的小数位/指数上限 (绝对值)
pub const MAX_DECIMAL_EXPONENT: i64 = 32;

/// 十进制数有效数字的位宽上限 (约 38 位十进制)
pub const MAX_DECIMAL_BITS: u64 = 128;

/// 只保留数字字符
pub fn only_digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// 解析日期; 空白或无法识别时返回 None
pub fn parse_date_lenient(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(d);
    }

    // 带小数秒的导出 ("2024-03-01T00:00:00.000")
    let s = s.split('.').next().unwrap_or(s);
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// 解析十进制数
///
/// 含 "," 时按巴西写法 ("1.234,56"), 否则按普通写法 ("1234.56")。
/// 指数或有效数字超出范围 ("1e200000000") 时返回 None。
pub fn parse_decimal_lenient(raw: &str) -> Option<BigDecimal> {
    let s: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return None;
    }

    let canonical = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else {
        s
    };
    BigDecimal::from_str(&canonical).ok().filter(within_bounds)
}

fn within_bounds(value: &BigDecimal) -> bool {
    let (digits, exponent) = value.as_bigint_and_exponent();
    exponent.abs() <= MAX_DECIMAL_EXPONENT && digits.bits() <= MAX_DECIMAL_BITS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn digits_are_extracted_from_formatted_tax_id() {
        assert_eq!(only_digits("11.222.333/0001-81"), "11222333000181");
        assert_eq!(only_digits("  "), "");
    }

    #[test]
    fn dates_in_each_accepted_format() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        for raw in [
            "2024-03-01",
            "01/03/2024",
            "01.03.2024",
            "2024-03-01T10:20:30",
            "2024-03-01 00:00:00",
            "2024-03-01T00:00:00.000",
            " 2024-03-01 ",
        ] {
            assert_eq!(parse_date_lenient(raw), Some(expected), "format {raw:?}");
        }
    }

    #[test]
    fn unparseable_dates_become_none() {
        assert_eq!(parse_date_lenient(""), None);
        assert_eq!(parse_date_lenient("amanhã"), None);
        assert_eq!(parse_date_lenient("31/02/2024"), None);
    }

    #[test]
    fn decimals_in_brazilian_and_plain_notation() {
        assert_eq!(parse_decimal_lenient("1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_decimal_lenient("R$ 10,5"), Some(dec("10.5")));
        assert_eq!(parse_decimal_lenient("1234.56"), Some(dec("1234.56")));
        assert_eq!(parse_decimal_lenient("-7"), Some(dec("-7")));
        assert_eq!(parse_decimal_lenient(""), None);
        assert_eq!(parse_decimal_lenient("abc"), None);
    }

    #[test]
    fn out_of_range_decimals_are_rejected() {
        assert_eq!(parse_decimal_lenient("1e200000000"), None);
        assert_eq!(parse_decimal_lenient("1E-200000000"), None);
        assert_eq!(parse_decimal_lenient(&"9".repeat(60)), None);
        assert_eq!(parse_decimal_lenient("1e10"), Some(dec("10000000000")));
        assert_eq!(parse_decimal_lenient("0,000001"), Some(dec("0.000001")));
    }
}
