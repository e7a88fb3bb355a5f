// core/src/phone.rs

//! Phone number helpers for the messaging gateway.
//!
//! Canonical form is the international digit string used by the WhatsApp
//! gateway: country code `62` followed by the subscriber number, no `+`,
//! no separators.

const COUNTRY_CODE: &str = "62";
const MIN_DIGITS: usize = 9;
const MAX_DIGITS: usize = 18;

fn digits_only(input: &str) -> String {
  input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Converts a local or international phone number into canonical `62...` form.
///
/// `0812...` becomes `62812...`, `812...` becomes `62812...`, `+62 812-...`
/// becomes `62812...`. Anything else is returned as its digits unchanged and
/// left for [`validate_phone_number`] to reject.
pub fn format_phone_number(input: &str) -> String {
  let digits = digits_only(input);

  if let Some(rest) = digits.strip_prefix('0') {
    format!("{COUNTRY_CODE}{rest}")
  } else if digits.starts_with(COUNTRY_CODE) {
    digits
  } else if digits.starts_with('8') {
    format!("{COUNTRY_CODE}{digits}")
  } else {
    digits
  }
}

/// Converts a canonical number back to the local `0...` form shown to admins.
pub fn display_phone_number(input: &str) -> String {
  let digits = digits_only(input);
  match digits.strip_prefix(COUNTRY_CODE) {
    Some(rest) => format!("0{rest}"),
    None => digits,
  }
}

/// True when `input` is already canonical: digits only, starts with `62`,
/// between 9 and 18 digits long.
pub fn validate_phone_number(input: &str) -> bool {
  !input.is_empty()
    && input.chars().all(|c| c.is_ascii_digit())
    && input.starts_with(COUNTRY_CODE)
    && (MIN_DIGITS..=MAX_DIGITS).contains(&input.len())
}
