//! Generated identifiers.

use rand::Rng;

/// Returns `prefix` followed by 8 uppercase hex digits.
pub(crate) fn generate_id(prefix: &str) -> String {
    let suffix: u32 = rand::rng().random();
    format!("{prefix}{suffix:08X}")
}

/// Fills `id` with a generated value when it is empty.
pub(crate) fn ensure_id(id: &mut String, prefix: &str) {
    if id.is_empty() {
        *id = generate_id(prefix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_shape() {
        let id = generate_id("SP");
        assert_eq!(id.len(), 10);
        assert!(id.starts_with("SP"));
        assert!(id[2..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_ensure_keeps_existing() {
        let mut id = "W001".to_string();
        ensure_id(&mut id, "W");
        assert_eq!(id, "W001");

        let mut empty = String::new();
        ensure_id(&mut empty, "W");
        assert!(empty.starts_with('W'));
    }
}
