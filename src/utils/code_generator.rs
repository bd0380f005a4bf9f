use rand::Rng;

const CODE_PREFIX: &str = "TKT";
const CODE_LEN: usize = 8;
// No 0/O/1/I to keep codes easy to read aloud.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate a short human-readable ticket code, e.g. "TKT-7KQ2M9XA".
/// Uniqueness is enforced by the database index; callers retry on collision.
pub fn generate_ticket_code() -> String {
    let mut rng = rand::thread_rng();
    let body: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{CODE_PREFIX}-{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ticket_code_format() {
        let code = generate_ticket_code();
        assert_eq!(code.len(), CODE_PREFIX.len() + 1 + CODE_LEN);
        assert!(code.starts_with("TKT-"));

        let body = &code[CODE_PREFIX.len() + 1..];
        assert!(
            body.bytes().all(|b| CODE_ALPHABET.contains(&b)),
            "unexpected character in {code}"
        );
    }

    #[test]
    fn test_generated_codes_avoid_ambiguous_characters() {
        for _ in 0..100 {
            let code = generate_ticket_code();
            assert!(!code[4..].contains(['0', 'O', '1', 'I']));
        }
    }
}
