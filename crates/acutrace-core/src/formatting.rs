/// Format a rupee amount with Indian digit grouping and at most two decimal
/// places, dropping trailing zeros.
///
/// # Examples
///
/// ```
/// use acutrace_core::formatting::format_inr;
///
/// assert_eq!(format_inr(123456.5), "₹1,23,456.5");
/// assert_eq!(format_inr(1000.0), "₹1,000");
/// assert_eq!(format_inr(-250.25), "-₹250.25");
/// ```
pub fn format_inr(amount: f64) -> String {
    let negative = amount < 0.0;
    let rounded = (amount.abs() * 100.0).round() / 100.0;

    let integer_part = rounded.trunc() as u64;
    let paise = ((rounded - rounded.trunc()) * 100.0).round() as u64;

    let mut result = group_indian(&integer_part.to_string());
    if paise > 0 {
        let frac = format!("{:02}", paise);
        result.push('.');
        result.push_str(frac.trim_end_matches('0'));
    }

    if negative && (integer_part > 0 || paise > 0) {
        format!("-₹{}", result)
    } else {
        format!("₹{}", result)
    }
}

/// Human-readable file size.
///
/// * `< 1 KiB` → `"512 B"`
/// * `< 1 MiB` → one decimal, `"1.5 KB"`
/// * otherwise → two decimals, `"2.00 MB"`
///
/// # Examples
///
/// ```
/// use acutrace_core::formatting::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// assert_eq!(format_size(2 * 1024 * 1024), "2.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Indian grouping: the last three digits, then pairs (`12,34,567`).
fn group_indian(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let (head, tail) = s.split_at(s.len() - 3);
    let head_chars: Vec<char> = head.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 2);
    let remainder = head_chars.len() % 2;
    for (i, &c) in head_chars.iter().enumerate() {
        if i != 0 && (i % 2 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result.push(',');
    result.push_str(tail);
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_inr ───────────────────────────────────────────────────────────

    #[test]
    fn test_format_inr_zero() {
        assert_eq!(format_inr(0.0), "₹0");
        assert_eq!(format_inr(-0.0), "₹0");
    }

    #[test]
    fn test_format_inr_small() {
        assert_eq!(format_inr(999.0), "₹999");
    }

    #[test]
    fn test_format_inr_lakh_grouping() {
        assert_eq!(format_inr(123_456.0), "₹1,23,456");
        assert_eq!(format_inr(12_345_678.0), "₹1,23,45,678");
    }

    #[test]
    fn test_format_inr_decimals_trimmed() {
        assert_eq!(format_inr(10.5), "₹10.5");
        assert_eq!(format_inr(10.05), "₹10.05");
        assert_eq!(format_inr(10.004), "₹10");
    }

    #[test]
    fn test_format_inr_negative() {
        assert_eq!(format_inr(-60.0), "-₹60");
    }

    // ── format_size ──────────────────────────────────────────────────────────

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_kilobytes() {
        assert_eq!(format_size(1024), "1.0 KB");
    }

    #[test]
    fn test_format_size_megabytes() {
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.50 MB");
    }

    // ── group_indian ─────────────────────────────────────────────────────────

    #[test]
    fn test_group_indian_boundaries() {
        assert_eq!(group_indian("1000"), "1,000");
        assert_eq!(group_indian("10000"), "10,000");
        assert_eq!(group_indian("100000"), "1,00,000");
    }
}
