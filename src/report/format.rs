//! Display formatting for times and tuple counts.
//!
//! The exact strings are consumed by downstream tooling, so the rounding and
//! the quirks below are part of the output format.

/// A derived table cell before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Seconds, or any other float; formatted with [`format_time`].
    Float(f64),
    /// Tuple counts; formatted with [`format_num`].
    Count(i64),
    Text(String),
    Empty,
}

/// Format seconds.
///
/// - NaN: `-`
/// - 100s and up: minutes (`5.3m`, `42m`), hours (`16h`) or days (`4D`)
/// - 10s to 100s: whole seconds
/// - 1s to 10s: two decimals
/// - 1ms to 1s: three decimals, no leading zero (`.045`)
pub fn format_time(time: f64) -> String {
    if time.is_nan() {
        return "-".to_string();
    }

    let sec = (time + 0.5).floor() as i64;
    if sec >= 100 {
        let minutes = sec / 60;
        if minutes < 100 {
            if minutes < 10 {
                // First digit of the remainder as a percentage of a minute.
                let frac = ((sec - minutes * 60) as f64 / 60.0) * 100.0;
                let digit = frac.to_string().chars().next().unwrap_or('0');
                return format!("{}.{}m", minutes, digit);
            }
            return format!("{}m", minutes);
        }
        let hours = minutes / 60;
        if hours < 100 {
            return format!("{}h", hours);
        }
        return format!("{}D", hours / 24);
    }

    if sec >= 10 {
        sec.to_string()
    } else if time >= 1.0 {
        format!("{:.2}", time)
    } else if time >= 0.001 {
        let s = format!("{:.3}", time);
        match s.strip_prefix('0') {
            Some(rest) => rest.to_string(),
            None => s,
        }
    } else {
        ".000".to_string()
    }
}

/// Format a tuple count. A precision of `-1` prints the raw integer.
///
/// Otherwise counts of a billion and up print as `1.23B`, from 1e8 as whole
/// millions (`123M`, no separators), from 1e6 as millions with two decimals
/// (`1.23M`), and anything smaller with thousands separators.
pub fn format_num(precision: i32, amount: i64) -> String {
    if precision == -1 {
        return amount.to_string();
    }

    if amount >= 1_000_000_000 {
        let scaled = (amount.saturating_add(5_000_000) / 10_000_000).to_string();
        format!("{}.{}B", &scaled[..1], &scaled[1..])
    } else if amount >= 100_000_000 {
        format!("{}M", amount.saturating_add(500_000) / 1_000_000)
    } else if amount >= 1_000_000 {
        let scaled = (amount.saturating_add(5_000) / 10_000).to_string();
        let split = scaled.len() - 2;
        format!("{}.{}M", &scaled[..split], &scaled[split..])
    } else {
        group_thousands(amount)
    }
}

pub fn format_cell(cell: &Cell, precision: i32) -> String {
    match cell {
        Cell::Float(v) => format_time(*v),
        Cell::Count(n) => format_num(precision, *n),
        Cell::Text(s) => s.clone(),
        Cell::Empty => "-".to_string(),
    }
}

/// Format every cell of a derived table.
pub fn format_table(rows: &[Vec<Cell>], precision: i32) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|c| format_cell(c, precision)).collect())
        .collect()
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sub_second_times() {
        assert_eq!(format_time(f64::NAN), "-");
        assert_eq!(format_time(0.0), ".000");
        assert_eq!(format_time(0.0004), ".000");
        assert_eq!(format_time(0.045), ".045");
        assert_eq!(format_time(0.9996), "1.000");
    }

    #[test]
    fn second_range_times() {
        assert_eq!(format_time(1.0), "1.00");
        assert_eq!(format_time(3.14159), "3.14");
        assert_eq!(format_time(9.4), "9.40");
        assert_eq!(format_time(9.6), "10");
        assert_eq!(format_time(42.4), "42");
        assert_eq!(format_time(99.4), "99");
    }

    #[test]
    fn long_times_switch_units() {
        assert_eq!(format_time(318.0), "5.3m");
        assert_eq!(format_time(100.0), "1.6m");
        assert_eq!(format_time(600.0), "10m");
        assert_eq!(format_time(5999.0), "99m");
        assert_eq!(format_time(6000.0), "1h");
        assert_eq!(format_time(60_000.0), "16h");
        assert_eq!(format_time(360_000.0), "4D");
    }

    #[test]
    fn raw_counts_with_negative_precision() {
        assert_eq!(format_num(-1, 1_234_567_890), "1234567890");
        assert_eq!(format_num(-1, 0), "0");
    }

    #[test]
    fn counts_below_a_million_are_grouped() {
        assert_eq!(format_num(0, 0), "0");
        assert_eq!(format_num(0, 999), "999");
        assert_eq!(format_num(0, 1_000), "1,000");
        assert_eq!(format_num(0, 999_999), "999,999");
        assert_eq!(format_num(0, -12_345), "-12,345");
    }

    #[test]
    fn large_counts_use_suffixes() {
        assert_eq!(format_num(0, 1_000_000), "1.00M");
        assert_eq!(format_num(0, 1_234_567), "1.23M");
        assert_eq!(format_num(0, 12_345_678), "12.35M");
        // Whole millions print without separators.
        assert_eq!(format_num(0, 123_456_789), "123M");
        assert_eq!(format_num(0, 999_400_000), "999M");
        assert_eq!(format_num(0, 1_234_567_890), "1.23B");
    }

    #[test]
    fn extreme_counts_clamp_instead_of_overflowing() {
        assert_eq!(format_num(0, i64::MAX), "9.22337203685B");
        assert_eq!(format_num(-1, i64::MAX), "9223372036854775807");
    }

    #[test]
    fn table_cells_format_by_type() {
        let rows = vec![vec![
            Cell::Float(0.5),
            Cell::Count(1_500),
            Cell::Text("R1".to_string()),
            Cell::Empty,
        ]];
        assert_eq!(
            format_table(&rows, 0),
            vec![vec![".500", "1,500", "R1", "-"]]
        );
    }
}
