//! Parsing of heterogeneous cell inputs into numbers, and currency/percent rendering.

use serde::{Deserialize, Serialize};

use crate::sheet::CellValue;

/// Rendering preferences for currency amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyFormat {
    pub symbol: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub precision: u8,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: "$".into(),
            decimal_separator: '.',
            grouping_separator: ',',
            precision: 2,
        }
    }
}

impl CurrencyFormat {
    pub fn for_code(code: &str) -> Self {
        Self {
            symbol: symbol_for(&code.to_uppercase()),
            precision: minor_units_for(&code.to_uppercase()),
            ..Self::default()
        }
    }
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        "AUD" => "A$".into(),
        _ => code.into(),
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

/// Parses a currency-like cell written in the default `$1,234.56` style.
pub fn parse_currency(value: &CellValue) -> f64 {
    parse_currency_in(value, &CurrencyFormat::default())
}

/// Parses a currency-like cell written with `format`'s separators.
///
/// Numbers pass through. Text loses the symbol and grouping, and the
/// format's decimal separator is read as the decimal point, so whatever
/// `format_currency` writes reads back as the same amount. Anything
/// unparseable is zero.
pub fn parse_currency_in(value: &CellValue, format: &CurrencyFormat) -> f64 {
    match value {
        CellValue::Number(number) if number.is_finite() => *number,
        CellValue::Text(text) => parse_decimal(&strip_currency(text, format)).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Parses a percentage-like cell into a value on the 0–100 scale.
///
/// Text with a `%` sign is taken literally (`"50%"` is 50). Bare numbers in
/// `(0, 1]` are read as fractions and scaled (`0.5` is 50); other bare numbers
/// are already percentages. A bare `1` therefore means 100%.
pub fn parse_percentage(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(number) if number.is_finite() => scale_fraction(*number),
        CellValue::Text(text) if text.contains('%') => {
            parse_decimal(&text.replace('%', "")).unwrap_or(0.0)
        }
        CellValue::Text(text) => parse_decimal(text).map(scale_fraction).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn scale_fraction(number: f64) -> f64 {
    if number > 0.0 && number <= 1.0 {
        number * 100.0
    } else {
        number
    }
}

/// Whether a cell counts as a ticked checkbox.
pub fn is_checked(value: &CellValue) -> bool {
    match value {
        CellValue::Bool(checked) => *checked,
        CellValue::Number(number) => number.is_finite() && *number != 0.0,
        CellValue::Text(text) => matches!(
            text.trim().to_lowercase().as_str(),
            "true" | "yes" | "y" | "x" | "✓" | "✔"
        ),
        CellValue::Empty => false,
    }
}

fn strip_currency(text: &str, format: &CurrencyFormat) -> String {
    let without_symbol = if format.symbol.is_empty() {
        text.to_string()
    } else {
        text.replace(format.symbol.as_str(), "")
    };
    without_symbol
        .chars()
        .filter_map(|ch| match ch {
            _ if ch == format.decimal_separator => Some('.'),
            _ if ch.is_ascii_digit() || matches!(ch, '-' | '+') => Some(ch),
            _ => None,
        })
        .collect()
}

fn parse_decimal(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

pub fn format_number(format: &CurrencyFormat, value: f64) -> String {
    let mut body = format!("{:.*}", format.precision as usize, value);
    if format.decimal_separator != '.' {
        if let Some(pos) = body.find('.') {
            body.replace_range(pos..=pos, &format.decimal_separator.to_string());
        }
    }
    if let Some(pos) = body.find(format.decimal_separator) {
        let mut int_part = body[..pos].to_string();
        insert_grouping(&mut int_part, format.grouping_separator);
        body = format!("{}{}", int_part, &body[pos..]);
    } else {
        insert_grouping(&mut body, format.grouping_separator);
    }
    body
}

fn insert_grouping(int_part: &mut String, separator: char) {
    let mut cleaned = int_part.replace(separator, "");
    if cleaned.starts_with('-') {
        let sign = cleaned.remove(0);
        *int_part = format!("{}{}", sign, group_digits(&cleaned, separator));
    } else {
        *int_part = group_digits(&cleaned, separator);
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}

/// Renders `amount` as `$1,234.56`; negatives as `-$5.00`.
pub fn format_currency(amount: f64, format: &CurrencyFormat) -> String {
    let body = format_number(format, amount.abs());
    if amount < 0.0 && body.chars().any(|ch| ch.is_ascii_digit() && ch != '0') {
        format!("-{}{}", format.symbol, body)
    } else {
        format!("{}{}", format.symbol, body)
    }
}

/// Renders a 0–100 value as `40%`, keeping at most four decimals.
pub fn format_percent(value: f64) -> String {
    let mut body = format!("{:.4}", value);
    if body.contains('.') {
        while body.ends_with('0') {
            body.pop();
        }
        if body.ends_with('.') {
            body.pop();
        }
    }
    if body == "-0" {
        body = "0".into();
    }
    format!("{}%", body)
}
