use sha2::{Digest, Sha256};

const COUNTRY_CODE: &str = "258";

pub fn compute_sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let bytes = hasher.finalize();
    hex::encode(bytes)
}

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalises a Mozambican MSISDN to E.164 (`+258…`).
///
/// Accepts international (`00258…`, `+258…`, `258…`), national 9-digit
/// mobile numbers (`8XXXXXXXX`) and bare 8-digit subscriber numbers, which
/// get the `8` mobile prefix. Anything else is passed through with a `+`.
pub fn to_moz_e164(raw: &str) -> Option<String> {
    let mut n = digits_only(raw);
    if n.is_empty() {
        return None;
    }
    if let Some(rest) = n.strip_prefix("00") {
        n = rest.to_string();
    }
    if n.starts_with(COUNTRY_CODE) {
        return Some(format!("+{n}"));
    }
    if n.len() == 9 && n.starts_with('8') {
        return Some(format!("+{COUNTRY_CODE}{n}"));
    }
    if n.len() == 8 {
        return Some(format!("+{COUNTRY_CODE}8{n}"));
    }
    Some(format!("+{n}"))
}

/// Destination format expected by the WhatsApp provider: country code
/// without `+`, national leading zero dropped.
pub fn whatsapp_destination(raw: &str) -> String {
    if raw.starts_with(COUNTRY_CODE) {
        raw.to_string()
    } else {
        format!("{COUNTRY_CODE}{}", raw.strip_prefix('0').unwrap_or(raw))
    }
}

/// Ad-platform identity hashes.
pub fn hashed_email(email: &str) -> String {
    compute_sha256_hex(&email.trim().to_lowercase())
}

pub fn hashed_phone(phone: &str) -> String {
    compute_sha256_hex(&digits_only(phone))
}
