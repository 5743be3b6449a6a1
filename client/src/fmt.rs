/// Format a quantity rounded to the nearest whole unit with thousands
/// separators, e.g. `1234567.4` -> `"1,234,567"`.
pub fn format_number(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    let first_group = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - first_group) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a quantity with its unit, e.g. `"1,200 ft"`. Falls back to the
/// bare number when no unit is known.
pub fn format_qty(value: f64, unit: Option<&str>) -> String {
    match unit {
        Some(unit) if !unit.is_empty() => format!("{} {unit}", format_number(value)),
        _ => format_number(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(1000.0), "1,000");
        assert_eq!(format_number(1234567.0), "1,234,567");
    }

    #[test]
    fn rounds_to_whole_units() {
        assert_eq!(format_number(1499.5), "1,500");
        assert_eq!(format_number(1499.4), "1,499");
    }

    #[test]
    fn handles_negatives() {
        assert_eq!(format_number(-1234.0), "-1,234");
    }

    #[test]
    fn qty_includes_unit_when_present() {
        assert_eq!(format_qty(1200.0, Some("ft")), "1,200 ft");
        assert_eq!(format_qty(1200.0, None), "1,200");
        assert_eq!(format_qty(1200.0, Some("")), "1,200");
    }
}
