/// Group the digits of a non-negative integer string with `.` separators.
fn group_thousands(int_part: &str) -> String {
    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    grouped.chars().rev().collect()
}

/// Format a currency amount rounded to whole units: `82.465 kr.`
pub fn amount(val: f64, currency: &str) -> String {
    let rounded = format!("{:.0}", val.abs());
    let sign = if val < 0.0 && rounded != "0" { "-" } else { "" };
    let grouped = group_thousands(&rounded);
    if currency.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped} {currency}")
    }
}

/// Compact axis label: `25k`, `1.5M`.
pub fn compact(val: f64) -> String {
    if val >= 1_000_000.0 {
        let m = val / 1_000_000.0;
        if m == m.floor() {
            format!("{}M", m as u64)
        } else {
            format!("{:.1}M", m)
        }
    } else if val >= 1000.0 {
        let k = val / 1000.0;
        if k == k.floor() {
            format!("{}k", k as u64)
        } else {
            format!("{:.1}k", k)
        }
    } else {
        format!("{}", val.max(0.0) as u64)
    }
}

/// A 0..=1 fraction as a percentage with two decimals: `52.31%`
pub fn percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}
