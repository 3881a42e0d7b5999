use rand::Rng;

/// Alphabet for generated access codes. Visually ambiguous characters
/// (I, O, 0, 1) are excluded.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Draws `length` independent uniform samples from the code alphabet.
/// Stateless: collision checks against existing codes happen at issuance,
/// not here.
pub fn generate(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Input sanitation before a lookup. Deliberately a superset of the
/// generation alphabet: any 6-8 character uppercase alphanumeric string
/// passes.
pub fn validate_format(code: &str) -> bool {
    (6..=8).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_has_requested_length_and_alphabet() {
        for length in [6, 8, 12] {
            let code = generate(length);
            assert_eq!(code.len(), length);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_validator_accepts_generator_output() {
        for _ in 0..50 {
            assert!(validate_format(&generate(DEFAULT_CODE_LENGTH)));
        }
    }

    #[test]
    fn test_validator_accepts_superset_of_alphabet() {
        // 0, 1, I and O never come out of the generator but still validate.
        assert!(validate_format("I0O1AB"));
    }

    #[test]
    fn test_validator_rejects_bad_input() {
        assert!(!validate_format("abcdef"));
        assert!(!validate_format("ABC-EF"));
        assert!(!validate_format("ABCDE"));
        assert!(!validate_format("ABCDEFGHI"));
        assert!(!validate_format(""));
    }
}
