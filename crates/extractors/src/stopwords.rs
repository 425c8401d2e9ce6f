use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

/// A lowercased set of stopwords, one word per line in the source file.
#[derive(Debug, Default, Clone)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    pub fn empty() -> Self {
        StopwordSet { words: HashSet::new() }
    }

    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let words = text
            .lines()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        Ok(StopwordSet { words })
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_lowercases_words() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stop.txt");
        std::fs::write(&path, "The\nA\n\n  quick  \n").unwrap();

        let stop = StopwordSet::load(&path).unwrap();
        assert!(stop.contains("the"));
        assert!(stop.contains("THE"));
        assert!(stop.contains("quick"));
        assert_eq!(stop.len(), 3);
    }

    #[test]
    fn empty_set_contains_nothing() {
        let stop = StopwordSet::empty();
        assert!(!stop.contains("the"));
    }
}
