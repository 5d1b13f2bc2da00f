//! Small shared helpers: code generation, size formatting, share links

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::core::config;

/// Generates a random alphanumeric code of the given length.
///
/// The alphabet is `[A-Za-z0-9]`, so a generated code can never collide
/// with the `_part` suffix used for album members.
pub fn generate_code(len: usize) -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

/// Bytes → megabytes, rounded to two decimal places.
pub fn bytes_to_mb(bytes: i64) -> f64 {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}

/// Human-readable size, matching what the summary and listings show.
pub fn format_file_size(bytes: i64) -> String {
    format!("{:.2} MB", bytes_to_mb(bytes))
}

/// Deep link a recipient can open to fetch a stored file.
pub fn share_link(bot_username: &str, code: &str) -> String {
    format!("https://t.me/{bot_username}?start=get_{code}")
}

/// True for a syntactically plausible retrieval code taken from user input.
///
/// Accepts bare codes and `_part` codes; rejects whitespace and
/// over-long strings before any database lookup happens.
pub fn is_plausible_code(input: &str) -> bool {
    !input.is_empty()
        && input.len() <= config::codes::MAX_CODE_LEN
        && input.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn generated_codes_have_requested_length_and_alphabet() {
        let code = generate_code(15);
        assert_eq!(code.len(), 15);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_codes_differ() {
        assert_ne!(generate_code(20), generate_code(20));
    }

    #[test]
    fn megabytes_round_to_two_decimals() {
        assert_eq!(bytes_to_mb(1_048_576), 1.0);
        assert_eq!(bytes_to_mb(1_572_864), 1.5);
        assert_eq!(format_file_size(2_621_440), "2.50 MB");
    }

    #[test]
    fn share_link_carries_get_payload() {
        assert_eq!(share_link("sharebot", "a1B2c3"), "https://t.me/sharebot?start=get_a1B2c3");
    }

    #[test]
    fn plausible_code_filters_junk() {
        assert!(is_plausible_code("Abc123xyz456789"));
        assert!(is_plausible_code("Abc123xyz456789_part2"));
        assert!(!is_plausible_code(""));
        assert!(!is_plausible_code("has space"));
        assert!(!is_plausible_code(&"x".repeat(64)));
    }
}
