//! Phone number normalization into the gateway's canonical addressing form.

/// Minimum number of digits in a valid phone number.
pub const MIN_DIGITS: usize = 10;

/// Maximum number of digits in a valid phone number.
pub const MAX_DIGITS: usize = 15;

/// Normalizes locally-entered phone numbers.
///
/// `normalize(normalize(x)) == normalize(x)` holds as long as the country
/// code does not itself start with the trunk prefix; settings validation
/// enforces that.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhoneFormatter {
    country_code: String,
    trunk_prefix: char,
}

impl PhoneFormatter {
    /// Create a formatter for the given country code and trunk prefix digit.
    pub fn new(country_code: impl Into<String>, trunk_prefix: char) -> Self {
        let country_code = country_code
            .into()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        Self {
            country_code,
            trunk_prefix,
        }
    }

    /// The country code prepended to local numbers.
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Strip non-digits, swap a leading trunk digit for the country code,
    /// and prepend the country code if it is still missing.
    pub fn normalize(&self, raw: &str) -> String {
        let digits = digits_only(raw);

        let local = if digits.starts_with(self.trunk_prefix) {
            format!(
                "{}{}",
                self.country_code,
                &digits[self.trunk_prefix.len_utf8()..]
            )
        } else {
            digits
        };

        if local.starts_with(&self.country_code) {
            local
        } else {
            format!("{}{local}", self.country_code)
        }
    }

    /// Digit count (after stripping non-digits) must be within
    /// [`MIN_DIGITS`]..=[`MAX_DIGITS`].
    pub fn is_valid(&self, raw: &str) -> bool {
        is_valid(raw)
    }

    /// Chat id the gateway uses for a normalized number.
    pub fn to_chat_id(&self, raw: &str) -> String {
        format!("{}@c.us", self.normalize(raw))
    }
}

impl Default for PhoneFormatter {
    fn default() -> Self {
        Self::new("62", '0')
    }
}

/// Digit-count validation, independent of the country code.
pub fn is_valid(raw: &str) -> bool {
    let count = raw.chars().filter(char::is_ascii_digit).count();
    (MIN_DIGITS..=MAX_DIGITS).contains(&count)
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trunk_prefix_replaced() {
        let f = PhoneFormatter::default();
        assert_eq!(f.normalize("0812345678901"), "62812345678901");
    }

    #[test]
    fn local_and_international_agree() {
        let f = PhoneFormatter::default();
        assert_eq!(f.normalize("0812-3456-7890"), f.normalize("62812 3456 7890"));
        assert_eq!(f.normalize("+62 812 3456 7890"), "6281234567890");
    }

    #[test]
    fn missing_country_code_prepended() {
        let f = PhoneFormatter::default();
        assert_eq!(f.normalize("812345678"), "62812345678");
    }

    #[test]
    fn degenerate_inputs() {
        let f = PhoneFormatter::default();
        assert_eq!(f.normalize(""), "62");
        assert_eq!(f.normalize("abc"), "62");
        assert_eq!(f.normalize("0"), "62");
    }

    #[test]
    fn validity_bounds() {
        assert!(!is_valid("123"));
        assert!(!is_valid("123456789"));
        assert!(is_valid("1234567890"));
        assert!(is_valid("123456789012345"));
        assert!(!is_valid("1234567890123456"));
        assert!(is_valid("(0812) 3456-7890"));
    }

    #[test]
    fn chat_id() {
        let f = PhoneFormatter::default();
        assert_eq!(f.to_chat_id("08123456789"), "628123456789@c.us");
    }

    #[test]
    fn custom_country_code() {
        let f = PhoneFormatter::new("+44", '0');
        assert_eq!(f.country_code(), "44");
        assert_eq!(f.normalize("07700 900123"), "447700900123");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalize_is_idempotent(raw in ".{0,24}") {
                let f = PhoneFormatter::default();
                let once = f.normalize(&raw);
                prop_assert_eq!(f.normalize(&once), once);
            }

            #[test]
            fn normalize_output_is_digits_with_country_code(raw in "[0-9 +()-]{0,20}") {
                let f = PhoneFormatter::default();
                let out = f.normalize(&raw);
                prop_assert!(out.starts_with("62"));
                prop_assert!(out.chars().all(|c| c.is_ascii_digit()));
            }

            #[test]
            fn trunk_and_country_forms_agree(rest in "[1-9][0-9]{8,11}") {
                let f = PhoneFormatter::default();
                prop_assert_eq!(f.normalize(&format!("0{rest}")), f.normalize(&format!("62{rest}")));
            }
        }
    }
}
