//! Formatting helpers shared by the fintrack crates

/// Insert a thousands separator into a string of digits
pub fn group_thousands(digits: &str, separator: &str) -> String {
    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push_str(&separator.chars().rev().collect::<String>());
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    result.chars().rev().collect()
}

/// Format an amount with grouping and a custom decimal separator.
///
/// Non-finite values render as "N/A".
pub fn format_amount(value: f64, decimals: u32, thousands: &str, decimal: &str) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }

    let fixed = format!("{:.*}", decimals as usize, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::new();
    // "-0.00" reads badly
    if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part, thousands));
    if let Some(frac) = frac_part {
        out.push_str(decimal);
        out.push_str(frac);
    }
    out
}

/// Format a percentage value (already multiplied by 100)
pub fn format_percent(value: f64, decimals: u32) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }
    format!("{:.*} %", decimals as usize, value)
}

/// Attach a currency symbol before or after a formatted amount
pub fn with_symbol(formatted: &str, symbol: &str, before: bool) -> String {
    if before {
        format!("{}{}", symbol, formatted)
    } else {
        format!("{} {}", formatted, symbol)
    }
}
