use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

/// Money is an exact decimal, so sums of legs never drift.
/// There is a single implicit currency.
pub type Amount = Decimal;

/// Format an amount as a plain decimal string with at least two fraction digits.
/// Example: 50 -> "50.00", -12.345 -> "-12.345"
pub fn format_amount(amount: Amount) -> String {
    let normalized = amount.normalize();
    if normalized.scale() < 2 {
        let mut padded = normalized;
        padded.rescale(2);
        padded.to_string()
    } else {
        normalized.to_string()
    }
}

/// Parse a decimal string into an amount.
/// Example: "50.00" -> 50, "12.5" -> 12.5, ".5" -> 0.5
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    // Decimal::from_str rejects a bare leading dot
    let normalized = match input.strip_prefix('.') {
        Some(rest) => format!("0.{}", rest),
        None => match input.strip_prefix("-.") {
            Some(rest) => format!("-0.{}", rest),
            None => input.to_string(),
        },
    };

    Decimal::from_str(&normalized).map_err(|_| ParseAmountError::InvalidFormat(input.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat(String),
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "empty amount"),
            ParseAmountError::InvalidFormat(s) => write!(f, "invalid money format: {}", s),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::new(5000, 2)), "50.00");
        assert_eq!(format_amount(Decimal::new(1234, 2)), "12.34");
        assert_eq!(format_amount(Decimal::from(1)), "1.00");
        assert_eq!(format_amount(Decimal::new(1, 2)), "0.01");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
        assert_eq!(format_amount(Decimal::new(-5000, 2)), "-50.00");
        assert_eq!(format_amount(Decimal::new(12345, 3)), "12.345");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("50.00"), Ok(Decimal::from(50)));
        assert_eq!(parse_amount("50"), Ok(Decimal::from(50)));
        assert_eq!(parse_amount("12.34"), Ok(Decimal::new(1234, 2)));
        assert_eq!(parse_amount(".50"), Ok(Decimal::new(5, 1)));
        assert_eq!(parse_amount("-.5"), Ok(Decimal::new(-5, 1)));
        assert_eq!(parse_amount(" -50.00 "), Ok(Decimal::from(-50)));
        assert_eq!(parse_amount("100.999"), Ok(Decimal::new(100999, 3)));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert_eq!(parse_amount(""), Err(ParseAmountError::Empty));
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("12.34.56").is_err());
    }
}
