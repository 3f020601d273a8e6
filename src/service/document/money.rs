//! 巴西格式数字: 千位 ".", 小数 ","

use bigdecimal::{BigDecimal, Signed};
use std::str::FromStr;

/// "R$ 1.234,50"; 负数为 "R$ -1.234,50"
pub fn format_brl(value: &BigDecimal) -> String {
    let (negative, int_part, frac_part) = fixed_parts(value, 2);
    let sign = if negative { "-" } else { "" };
    format!("R$ {}{},{}", sign, group_thousands(&int_part), frac_part)
}

/// 数量: 最多三位小数, 去掉末尾的 0 ("2", "1,5")
pub fn format_quantity(value: &BigDecimal) -> String {
    let (negative, int_part, frac_part) = fixed_parts(value, 3);
    let sign = if negative { "-" } else { "" };
    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}{}", sign, group_thousands(&int_part))
    } else {
        format!("{}{},{}", sign, group_thousands(&int_part), frac)
    }
}

/// 四舍五入到 scale 位, 返回 (是否为负, 整数位, 小数位)
fn fixed_parts(value: &BigDecimal, scale: usize) -> (bool, String, String) {
    let half = BigDecimal::from_str(&format!("0.{}5", "0".repeat(scale)))
        .unwrap_or_default();
    let rounded = (value.abs() + half).with_scale(scale as i64);
    let text = rounded.to_string();

    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let mut frac = frac_part.to_string();
    while frac.len() < scale {
        frac.push('0');
    }

    let is_zero = int_part.trim_start_matches('0').is_empty() && frac.trim_matches('0').is_empty();
    (value.is_negative() && !is_zero, int_part.to_string(), frac)
}

fn group_thousands(digits: &str) -> String {
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return "0".to_string();
    }

    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
