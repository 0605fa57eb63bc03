use rand::Rng;

/// Uppercase letters and digits without the look-alikes 0/O and 1/I.
const REFERENCE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
pub const DEFAULT_SUFFIX_LENGTH: usize = 8;

/// Source of human-facing booking references. Uniqueness is checked by the
/// caller against storage; a source only has to make collisions rare.
pub trait ReferenceSource: Send + Sync {
    fn next_reference(&self) -> String;
}

/// `PREFIX-XXXXXXXX` with a random suffix over a 32-symbol alphabet.
#[derive(Debug, Clone)]
pub struct RandomReferenceGenerator {
    prefix: String,
    length: usize,
}

impl RandomReferenceGenerator {
    pub fn new(prefix: &str) -> Self {
        Self::with_length(prefix, DEFAULT_SUFFIX_LENGTH)
    }

    pub fn with_length(prefix: &str, length: usize) -> Self {
        Self {
            prefix: normalize_reference(prefix),
            length: length.max(1),
        }
    }
}

impl ReferenceSource for RandomReferenceGenerator {
    fn next_reference(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..self.length)
            .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
            .collect();

        if self.prefix.is_empty() {
            suffix
        } else {
            format!("{}-{}", self.prefix, suffix)
        }
    }
}

/// References are case-insensitive; storage only ever sees this form.
pub fn normalize_reference(reference: &str) -> String {
    reference.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn references_have_prefix_and_alphabet_suffix() {
        let generator = RandomReferenceGenerator::new("bk");
        let reference = generator.next_reference();

        let (prefix, suffix) = reference.split_once('-').unwrap();
        assert_eq!(prefix, "BK");
        assert_eq!(suffix.len(), DEFAULT_SUFFIX_LENGTH);
        assert!(suffix.bytes().all(|b| REFERENCE_ALPHABET.contains(&b)));
    }

    #[test]
    fn references_are_url_safe_and_already_normalized() {
        let generator = RandomReferenceGenerator::new("BK");
        for _ in 0..100 {
            let reference = generator.next_reference();
            assert_eq!(normalize_reference(&reference), reference);
            assert!(reference.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
        }
    }

    #[test]
    fn collisions_are_rare() {
        let generator = RandomReferenceGenerator::new("BK");
        let references: HashSet<String> = (0..5_000).map(|_| generator.next_reference()).collect();
        assert_eq!(references.len(), 5_000);
    }

    #[test]
    fn normalization_trims_and_uppercases() {
        assert_eq!(normalize_reference("  bk-7h3kq9wd \n"), "BK-7H3KQ9WD");
    }
}
