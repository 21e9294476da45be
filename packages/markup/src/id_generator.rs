use crc32fast::Hasher;

/// Derive a stable document seed from its label using CRC32.
pub fn document_seed(label: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(label.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential id generator for changes, highlights and comment threads
/// within one document.
///
/// Ids look like `"{seed}-{n}"`. The generator is created once per document
/// and lives on across edits so fresh ids never collide with parsed ones.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    pub fn new(label: &str) -> Self {
        Self {
            seed: document_seed(label),
            count: 0,
        }
    }

    /// Generate the next sequential id.
    pub fn next_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    /// The document seed shared by every id from this generator.
    pub fn seed(&self) -> &str {
        &self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_seed_is_stable() {
        let a = document_seed("review.md");
        let b = document_seed("review.md");
        assert_eq!(a, b);

        let c = document_seed("draft.md");
        assert_ne!(a, c);
    }

    #[test]
    fn test_sequential_ids() {
        let mut gen = IdGenerator::new("review.md");

        let id1 = gen.next_id();
        let id2 = gen.next_id();
        let id3 = gen.next_id();

        assert!(id1.ends_with("-1"));
        assert!(id2.ends_with("-2"));
        assert!(id3.ends_with("-3"));

        let seed = gen.seed();
        assert!(id1.starts_with(seed));
        assert!(id2.starts_with(seed));
        assert!(id3.starts_with(seed));
    }
}
