use std::collections::HashSet;

/// Remembers which article ids were already handled during one run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time an id is offered and records it.
    pub fn should_process(&mut self, identity: &str) -> bool {
        if self.seen.contains(identity) {
            return false;
        }
        self.seen.insert(identity.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sight_only() {
        let mut d = Deduplicator::new();
        assert!(d.should_process("a1"));
        assert!(!d.should_process("a1"));
        assert!(d.should_process("a2"));
        assert!(!d.should_process("a1"));
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn repeats_across_batches() {
        let pages = [vec!["x", "y"], vec!["y", "z"], vec!["x", "x", "z"]];
        let mut d = Deduplicator::new();
        let accepted: Vec<&str> = pages
            .iter()
            .flatten()
            .copied()
            .filter(|id| d.should_process(id))
            .collect();
        assert_eq!(accepted, vec!["x", "y", "z"]);
    }

    #[test]
    fn empty_id_is_an_id() {
        let mut d = Deduplicator::new();
        assert!(d.should_process(""));
        assert!(!d.should_process(""));
    }
}
