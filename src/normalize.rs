//! Text cleanup for values scraped out of the registry's markup.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?\d*[.,]\d+|\d+").expect("valid regex"));
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Collapses every whitespace run (including CR/LF and non-breaking spaces)
/// to a single space and trims the ends.
pub fn normalize_text(input: &str) -> String {
    WHITESPACE.replace_all(input, " ").trim().to_owned()
}

/// Best-effort numeric extraction from noisy cell text.
///
/// Strips internal whitespace, takes the first decimal-or-integer token and
/// parses it with a comma accepted as the decimal separator. `None` means
/// "unknown", never zero.
pub fn parse_number(input: &str) -> Option<f64> {
    let compact = WHITESPACE.replace_all(input, "");
    let token = NUMBER.find(&compact)?;
    token.as_str().replace(',', ".").parse().ok()
}

/// First run of digits in the input, whitespace ignored.
/// The registry renders result counts like `"Результатов: 4 523"`.
pub fn first_integer(input: &str) -> Option<u64> {
    let compact = WHITESPACE.replace_all(input, "");
    INTEGER.find(&compact)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_runs_collapse_to_single_spaces() {
        assert_eq!(normalize_text("  Поставка \r\n бумаги\t офисной  "), "Поставка бумаги офисной");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn numbers_parse_with_grouped_digits_and_comma_separator() {
        assert_eq!(parse_number("1 234,56"), Some(1234.56));
        assert_eq!(parse_number("1\u{a0}500\u{a0}000,00 ₽"), Some(1_500_000.0));
        assert_eq!(parse_number("12"), Some(12.0));
        assert_eq!(parse_number(",56"), Some(0.56));
    }

    #[test]
    fn unparseable_input_is_unknown_not_zero() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("н/д"), None);
        assert_eq!(parse_number("Российский рубль"), None);
    }

    #[test]
    fn first_integer_skips_label_text() {
        assert_eq!(first_integer("Результатов: 4 523"), Some(4523));
        assert_eq!(first_integer("ничего"), None);
    }
}
