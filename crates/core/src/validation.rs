//! Field validators.
//!
//! Every check is pure: it either returns the normalised value or an
//! [`Error::Validation`] explaining what the field should look like.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::{Error, Result},
    models::IdType,
};

/// Calendar date format accepted everywhere (`2024-01-31`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Oldest model year accepted for a vehicle.
pub const MIN_VEHICLE_YEAR: i32 = 1990;
/// Maximum number of passengers a vehicle may declare.
pub const MAX_PASSENGERS: u8 = 15;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("invalid email regex"));
static PASSPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{6,12}$").expect("invalid passport regex"));
static EXPIRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})-(\d{4})$").expect("invalid expiry regex"));

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(field: &'static str, input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| {
        Error::validation(field, format!("`{trimmed}` is not a YYYY-MM-DD date"))
    })
}

/// Whether `input` is a valid `YYYY-MM-DD` date.
pub fn is_valid_date(input: &str) -> bool {
    parse_date("date", input).is_ok()
}

/// Validate a payment card number and return its digits.
///
/// Spaces and dashes between digit groups are ignored.
pub fn card_number(input: &str) -> Result<String> {
    let digits: String = input
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '-'))
        .collect();
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(Error::validation("card number", "must contain only digits"));
    }
    if !matches!(digits.len(), 13 | 16) {
        return Err(Error::validation(
            "card number",
            format!("expected 13 or 16 digits, got {}", digits.len()),
        ));
    }
    Ok(digits)
}

/// Whether `input` is an acceptable card number.
pub fn is_valid_card_number(input: &str) -> bool {
    card_number(input).is_ok()
}

/// Mask a card number so that only the last four digits remain visible.
pub fn mask_card(digits: &str) -> String {
    let visible = digits.len().saturating_sub(4);
    let mut masked = "*".repeat(visible);
    masked.push_str(&digits[visible..]);
    masked
}

/// Validate a `MM-YYYY` card expiration that has not lapsed by `today`.
pub fn card_expiration(input: &str, today: NaiveDate) -> Result<String> {
    let input = input.trim();
    let caps = EXPIRY_RE
        .captures(input)
        .ok_or_else(|| Error::validation("card expiration", "expected MM-YYYY"))?;
    let month: u32 = caps[1]
        .parse()
        .map_err(|_| Error::validation("card expiration", "month is not a number"))?;
    let year: i32 = caps[2]
        .parse()
        .map_err(|_| Error::validation("card expiration", "year is not a number"))?;
    if !(1..=12).contains(&month) {
        return Err(Error::validation("card expiration", "month must be 01-12"));
    }
    if (year, month) < (today.year(), today.month()) {
        return Err(Error::validation("card expiration", "card has expired"));
    }
    Ok(input.to_string())
}

/// Validate an email address.
pub fn email(input: &str) -> Result<String> {
    let input = input.trim();
    if EMAIL_RE.is_match(input) {
        Ok(input.to_string())
    } else {
        Err(Error::validation("email", "expected name@domain.tld"))
    }
}

/// Whether `input` is a valid email address.
pub fn is_valid_email(input: &str) -> bool {
    email(input).is_ok()
}

/// Validate a national identification number for the given document type.
pub fn national_id(id_type: IdType, input: &str) -> Result<String> {
    let input = input.trim();
    let all_digits = !input.is_empty() && input.chars().all(|ch| ch.is_ascii_digit());
    let ok = match id_type {
        IdType::Fisica => {
            all_digits
                && input.len() == 9
                && matches!(input.as_bytes()[0], b'1'..=b'7')
        }
        IdType::Juridica => all_digits && input.len() == 10,
        IdType::Dimex => all_digits && matches!(input.len(), 11 | 12),
        IdType::Pasaporte => PASSPORT_RE.is_match(input),
    };
    if ok {
        Ok(input.to_string())
    } else {
        Err(Error::validation("national id", id_type.format_hint()))
    }
}

/// Whether `input` is a valid identification number for `id_type`.
pub fn is_valid_national_id(id_type: IdType, input: &str) -> bool {
    national_id(id_type, input).is_ok()
}

/// Reject blank input, returning the trimmed value.
pub fn non_empty(field: &'static str, input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Err(Error::validation(field, "must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Parse an unsigned integer within `range`.
pub fn number_in<T>(
    field: &'static str,
    input: &str,
    range: std::ops::RangeInclusive<T>,
) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(Error::validation(field, "must be a whole number"));
    }
    let value: T = trimmed
        .parse()
        .map_err(|_| Error::validation(field, "number out of range"))?;
    if !range.contains(&value) {
        return Err(Error::validation(
            field,
            format!("must be between {} and {}", range.start(), range.end()),
        ));
    }
    Ok(value)
}

/// Person or company name: letters and spaces, more than three letters.
pub fn person_name(field: &'static str, input: &str) -> Result<String> {
    letters(field, input, 4)
}

/// Word-like values such as brand or color: letters and spaces, three or more letters.
pub fn word(field: &'static str, input: &str) -> Result<String> {
    letters(field, input, 3)
}

fn letters(field: &'static str, input: &str, min: usize) -> Result<String> {
    let trimmed = input.trim();
    let count = trimmed.chars().filter(|ch| !ch.is_whitespace()).count();
    let only_letters = trimmed
        .chars()
        .all(|ch| ch.is_alphabetic() || ch == ' ');
    if !only_letters {
        return Err(Error::validation(field, "only letters and spaces are allowed"));
    }
    if count < min {
        return Err(Error::validation(
            field,
            format!("needs at least {min} letters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Vehicle model: alphanumerics and spaces, at least two characters.
pub fn model(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let ok = trimmed.chars().filter(|ch| !ch.is_whitespace()).count() >= 2
        && trimmed.chars().all(|ch| ch.is_alphanumeric() || ch == ' ');
    if ok {
        Ok(trimmed.to_string())
    } else {
        Err(Error::validation(
            "model",
            "needs at least 2 letters or digits",
        ))
    }
}

/// Licence plate: exactly six alphanumeric characters, stored upper-case.
pub fn plate(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.len() == 6 && trimmed.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(Error::validation("plate", "expected 6 letters or digits"))
    }
}

/// Model year between [`MIN_VEHICLE_YEAR`] and the year after `today`.
pub fn vehicle_year(input: &str, today: NaiveDate) -> Result<i32> {
    number_in("year", input, MIN_VEHICLE_YEAR..=today.year() + 1)
}

/// Passenger capacity between 1 and [`MAX_PASSENGERS`].
pub fn passengers(input: &str) -> Result<u8> {
    number_in("passengers", input, 1..=MAX_PASSENGERS)
}

/// Password length between 8 and 12 characters.
pub fn password(input: &str) -> Result<String> {
    let len = input.chars().count();
    if (8..=12).contains(&len) {
        Ok(input.to_string())
    } else {
        Err(Error::validation("password", "must be 8 to 12 characters"))
    }
}

/// Phone number: 8 to 15 digits, optional leading `+`.
pub fn phone(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if (8..=15).contains(&digits.len()) && digits.chars().all(|ch| ch.is_ascii_digit()) {
        Ok(trimmed.to_string())
    } else {
        Err(Error::validation("phone", "expected 8 to 15 digits"))
    }
}

/// Daily rental cost: a positive whole number.
pub fn cost_per_day(input: &str) -> Result<u32> {
    number_in("cost per day", input, 1..=u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dates_follow_iso_format() {
        for valid in ["2024-01-01", "2024-02-29", "1999-12-31", " 2023-06-15 "] {
            assert!(is_valid_date(valid), "{valid} should be accepted");
        }
        for invalid in [
            "",
            "2024-1-1x",
            "01-01-2024",
            "2023-02-29",
            "2024/01/01",
            "2024-13-01",
            "yesterday",
        ] {
            assert!(!is_valid_date(invalid), "{invalid} should be rejected");
        }
        assert_eq!(parse_date("start", "2024-01-01").unwrap(), day(2024, 1, 1));
    }

    #[test]
    fn card_numbers_need_13_or_16_digits() {
        assert_eq!(card_number("4111 1111 1111 1111").unwrap(), "4111111111111111");
        assert!(is_valid_card_number("4222222222222"));
        assert!(!is_valid_card_number("411111111111111"));
        assert!(!is_valid_card_number("4111-1111-1111-111a"));
        assert!(!is_valid_card_number(""));
        assert_eq!(mask_card("4111111111111234"), "************1234");
    }

    #[test]
    fn card_expiration_must_not_have_lapsed() {
        let today = day(2024, 6, 15);
        assert!(card_expiration("06-2024", today).is_ok());
        assert!(card_expiration("01-2030", today).is_ok());
        assert!(card_expiration("05-2024", today).is_err());
        assert!(card_expiration("13-2030", today).is_err());
        assert!(card_expiration("2030-01", today).is_err());
    }

    #[test]
    fn emails_need_local_domain_and_tld() {
        assert!(is_valid_email("ana.perez@correo.co.cr"));
        assert!(is_valid_email("j_doe-1@example.com"));
        assert!(!is_valid_email("ana@localhost"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana perez@example.com"));
    }

    #[test]
    fn national_ids_depend_on_document_type() {
        assert!(is_valid_national_id(IdType::Fisica, "112340567"));
        assert!(!is_valid_national_id(IdType::Fisica, "812340567"));
        assert!(!is_valid_national_id(IdType::Fisica, "11234056"));
        assert!(is_valid_national_id(IdType::Juridica, "3101123456"));
        assert!(!is_valid_national_id(IdType::Juridica, "310112345"));
        assert!(is_valid_national_id(IdType::Dimex, "15581234567"));
        assert!(is_valid_national_id(IdType::Dimex, "155812345678"));
        assert!(!is_valid_national_id(IdType::Dimex, "1558123456"));
        assert!(is_valid_national_id(IdType::Pasaporte, "AB12345"));
        assert!(!is_valid_national_id(IdType::Pasaporte, "AB-12345"));
    }

    #[test]
    fn vehicle_fields() {
        let today = day(2024, 3, 1);
        assert_eq!(plate("abc123").unwrap(), "ABC123");
        assert!(plate("AB123").is_err());
        assert!(plate("ABC-12").is_err());
        assert_eq!(vehicle_year("2025", today).unwrap(), 2025);
        assert!(vehicle_year("2026", today).is_err());
        assert!(vehicle_year("1989", today).is_err());
        assert_eq!(passengers("5").unwrap(), 5);
        assert!(passengers("0").is_err());
        assert!(passengers("16").is_err());
        assert!(model("X5").is_ok());
        assert!(model("Y").is_err());
        assert!(word("color", "Red").is_ok());
        assert!(word("color", "R3d").is_err());
    }

    #[test]
    fn people_fields() {
        assert!(person_name("name", "Ana Perez").is_ok());
        assert!(person_name("name", "Ana").is_err());
        assert!(person_name("name", "Ana 2").is_err());
        assert!(password("secret12").is_ok());
        assert!(password("short").is_err());
        assert!(password("much-too-long-password").is_err());
        assert!(phone("+50688887777").is_ok());
        assert!(phone("8888-7777").is_err());
        assert!(non_empty("address", "   ").is_err());
        assert_eq!(cost_per_day("35000").unwrap(), 35000);
        assert!(cost_per_day("0").is_err());
        assert!(cost_per_day("-5").is_err());
    }
}
