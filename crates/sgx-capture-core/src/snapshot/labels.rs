//! Lenient parsing of the human-formatted labels found in dividend feeds,
//! e.g. `"SGD 0.060"`, `"4.31%"`, `"1,234.5"`.

use rust_decimal::Decimal;
use std::str::FromStr;

const UNICODE_MINUS: char = '\u{2212}';

/// First signed decimal number in `label`, ignoring thousands separators.
pub fn parse_amount(label: &str) -> Option<Decimal> {
    let cleaned: String = label.chars().filter(|c| *c != ',').collect();
    let chars: Vec<char> = cleaned.trim().chars().collect();

    let start = chars.iter().position(|c| c.is_ascii_digit())?;
    let mut number = String::new();
    if start > 0 && chars[start - 1] == '-' {
        number.push('-');
    }

    let mut i = start;
    while i < chars.len() && chars[i].is_ascii_digit() {
        number.push(chars[i]);
        i += 1;
    }
    if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
        number.push('.');
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            number.push(chars[i]);
            i += 1;
        }
    }

    Decimal::from_str(&number).ok()
}

/// Percentage label to its numeric value: `"4.31%"` -> 4.31.
pub fn parse_percentage(label: &str) -> Option<Decimal> {
    let cleaned: String = label
        .chars()
        .filter(|c| *c != '%' && *c != ',')
        .map(|c| if c == UNICODE_MINUS { '-' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(cleaned).ok()
}
