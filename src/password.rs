//! Random password generation backed by the operating system CSPRNG.

use rand::Rng;
use rand::distributions::Uniform;
use rand::rngs::OsRng;

/// Default password length for generated secrets.
pub const DEFAULT_LENGTH: usize = 64;

/// Special characters mixed into the default alphabet.
pub const DEFAULT_SPECIAL_CHARS: &str = "!@#^*()";

const ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Build the alphabet passwords are drawn from: ASCII letters, digits, then
/// `special_chars` in order of first appearance with duplicates removed.
pub fn alphabet(special_chars: &str) -> Vec<char> {
    let mut chars: Vec<char> = ALPHANUMERIC.chars().collect();
    for c in special_chars.chars() {
        if !chars.contains(&c) {
            chars.push(c);
        }
    }
    chars
}

/// Generate a password of exactly `length` characters.
///
/// Each character is drawn uniformly and independently from [`alphabet`].
/// A `length` of zero yields an empty string.
pub fn generate_password(length: usize, special_chars: &str) -> String {
    let alphabet = alphabet(special_chars);
    let dist = Uniform::new(0, alphabet.len());

    OsRng
        .sample_iter(dist)
        .take(length)
        .map(|i| alphabet[i])
        .collect()
}

/// Generate a password with the default length and special characters.
pub fn generate_default_password() -> String {
    generate_password(DEFAULT_LENGTH, DEFAULT_SPECIAL_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_password_shape() {
        let password = generate_default_password();
        let allowed = alphabet(DEFAULT_SPECIAL_CHARS);

        assert_eq!(password.chars().count(), DEFAULT_LENGTH);
        assert!(password.chars().all(|c| allowed.contains(&c)));
    }

    #[test]
    fn test_custom_length_and_specials() {
        for length in [1, 8, 17, 128] {
            let password = generate_password(length, "-_");
            assert_eq!(password.chars().count(), length);
            assert!(
                password
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            );
        }
    }

    #[test]
    fn test_zero_length_is_empty() {
        assert_eq!(generate_password(0, DEFAULT_SPECIAL_CHARS), "");
    }

    #[test]
    fn test_no_specials_is_alphanumeric() {
        let password = generate_password(256, "");
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_alphabet_deduplicates() {
        let chars = alphabet("!!a@@");
        let unique: HashSet<_> = chars.iter().collect();

        assert_eq!(chars.len(), unique.len());
        assert_eq!(chars.len(), 62 + 2);
    }

    #[test]
    fn test_passwords_differ() {
        // 62+7 symbols over 64 positions; a collision means the RNG is broken.
        assert_ne!(generate_default_password(), generate_default_password());
    }
}
