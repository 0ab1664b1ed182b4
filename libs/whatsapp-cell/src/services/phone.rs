//! Brazilian phone handling for WhatsApp identities.

use shared_database::digits_only;

const COUNTRY_CODE: &str = "55";

/// Digits only, minus a leading `55` when the result is a full international
/// number (12 or 13 digits). Shorter inputs are left alone so a local number
/// that happens to start with 55 keeps its area code.
pub fn normalize_phone(raw: &str) -> String {
    let digits = digits_only(raw);
    if (digits.len() == 12 || digits.len() == 13) && digits.starts_with(COUNTRY_CODE) {
        digits[COUNTRY_CODE.len()..].to_string()
    } else {
        digits
    }
}

/// Exact comparison after normalization. Empty numbers never match.
pub fn same_phone(a: &str, b: &str) -> bool {
    let (a, b) = (normalize_phone(a), normalize_phone(b));
    !a.is_empty() && a == b
}

/// Number in the form Evolution API expects: digits with the country code.
pub fn with_country_code(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.starts_with(COUNTRY_CODE) {
        digits
    } else {
        format!("{}{}", COUNTRY_CODE, digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_country_code_from_full_numbers() {
        assert_eq!(normalize_phone("5511999998888"), "11999998888");
        assert_eq!(normalize_phone("551133334444"), "1133334444");
        assert_eq!(normalize_phone("+55 (11) 99999-8888"), "11999998888");
    }

    #[test]
    fn leaves_local_numbers_untouched() {
        assert_eq!(normalize_phone("(11) 99999-8888"), "11999998888");
        assert_eq!(normalize_phone("5533334444"), "5533334444");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn compares_normalized_values() {
        assert!(same_phone("5511999998888", "11 99999-8888"));
        assert!(!same_phone("5511999998888", "11999990000"));
        assert!(!same_phone("", "---"));
    }

    #[test]
    fn adds_country_code_once() {
        assert_eq!(with_country_code("(11) 99999-8888"), "5511999998888");
        assert_eq!(with_country_code("5511999998888"), "5511999998888");
    }
}
