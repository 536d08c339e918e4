//! Numeric extraction from scraped rate text

use crate::ParseError;

/// Parse a rate out of loosely formatted text.
///
/// Every character outside `[0-9.]` is dropped before parsing, so currency
/// symbols, thousands separators and units are ignored. Signs and exponents
/// are dropped as well; this is a cleanup of extractor output, not a general
/// number parser.
pub fn parse_rate(raw: &str) -> Result<f64, ParseError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return Err(ParseError::Empty(raw.to_string()));
    }

    cleaned.parse::<f64>().map_err(|_| ParseError::Invalid {
        raw: raw.to_string(),
        cleaned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_currency_formatting() {
        assert_eq!(parse_rate("$1,234.56 USD").unwrap(), 1234.56);
        assert_eq!(parse_rate("1.08512").unwrap(), 1.08512);
        assert_eq!(parse_rate(" 42 ").unwrap(), 42.0);
    }

    #[test]
    fn test_rejects_non_numeric() {
        assert_eq!(parse_rate("n/a"), Err(ParseError::Empty("n/a".into())));
        assert!(matches!(parse_rate(""), Err(ParseError::Empty(_))));
    }

    #[test]
    fn test_rejects_multiple_points() {
        let err = parse_rate("1.2.3").unwrap_err();
        assert_eq!(
            err,
            ParseError::Invalid { raw: "1.2.3".into(), cleaned: "1.2.3".into() }
        );
        assert!(parse_rate("v1.0 costs 2.50").is_err());
        assert!(parse_rate(".").is_err());
    }

    #[test]
    fn test_sign_is_dropped() {
        assert_eq!(parse_rate("-3.5").unwrap(), 3.5);
    }

    proptest! {
        #[test]
        fn prop_formatted_amounts_round_trip(cents in 0u64..10_000_000_000u64) {
            let text = format!("${}.{:02} USD", cents / 100, cents % 100);
            let expected: f64 = format!("{}.{:02}", cents / 100, cents % 100).parse().unwrap();
            prop_assert_eq!(parse_rate(&text).unwrap(), expected);
        }

        #[test]
        fn prop_text_without_digits_fails(text in "[a-zA-Z ,$%/-]*") {
            prop_assert!(parse_rate(&text).is_err());
        }
    }
}
