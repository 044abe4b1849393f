//! Number rendering matching the interpreter's `%.14g` conversion

/// Significant digits kept when printing numbers
const PRECISION: i32 = 14;

/// Render a number the way the interpreter converts numbers to strings
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, n);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_drop_the_fraction() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-7.0), "-7");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(100000000000000.0), "1e+14");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(format_number(3.5), "3.5");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(-2.25), "-2.25");
        assert_eq!(format_number(0.0001), "0.0001");
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(format_number(1e20), "1e+20");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(9007199254740992.0), "9.007199254741e+15");
        assert_eq!(format_number(1.5e-300), "1.5e-300");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_number(f64::INFINITY), "inf");
        assert_eq!(format_number(f64::NEG_INFINITY), "-inf");
    }
}
