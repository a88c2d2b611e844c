/// Format a dollar price for display.
/// Whole-dollar prices get thousands separators and two decimals; sub-dollar
/// prices keep six decimals so small-cap assets do not render as $0.00.
pub fn format_price(price: f64) -> String {
    if price >= 1.0 {
        let cents = (price * 100.0).round() as u64;
        format!("${}.{:02}", group_thousands(&(cents / 100).to_string()), cents % 100)
    } else if price > 0.0 {
        format!("${:.6}", price)
    } else {
        "$0.00".to_string()
    }
}

/// Format a 24h change percentage with an explicit sign.
pub fn format_change(change: f64) -> String {
    if change >= 0.0 {
        format!("+{:.2}%", change)
    } else {
        format!("{:.2}%", change)
    }
}

/// Compact notation for market cap and volume (1.26T, 31.00B, 5.20M).
pub fn format_compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("{:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        format!("{:.0}", value)
    }
}

/// Format a history sample timestamp. Some backends send epoch millis; any
/// value past year 2100 in seconds is treated as millis.
pub fn format_timestamp(ts: i64) -> String {
    let secs = if ts > 4_102_444_800 { ts / 1000 } else { ts };
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(dt) => dt.format("%b %d %H:%M").to_string(),
        None => ts.to_string(),
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
