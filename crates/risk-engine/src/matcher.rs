//! Precompiled alias matcher.
//!
//! Every matching key is filed under its leading character trigram. A query
//! only verifies the keys whose leading trigram occurs somewhere in the
//! ingredient name, plus the few keys shorter than a trigram. Record slots
//! are numbered in precedence order, so the smallest verified slot is the
//! record a linear tier-ordered scan would have returned.

use std::collections::{HashMap, HashSet};

const GRAM_LEN: usize = 3;

#[derive(Debug, Clone)]
struct IndexedKey {
    key: String,
    record: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct AliasIndex {
    keys: Vec<IndexedKey>,
    by_gram: HashMap<String, Vec<usize>>,
    short: Vec<usize>,
}

impl AliasIndex {
    /// Builds the index from `(record slot, normalized key)` pairs. Empty keys
    /// would match every name and are skipped.
    pub(crate) fn build<'a>(entries: impl IntoIterator<Item = (usize, &'a str)>) -> Self {
        let mut index = AliasIndex::default();
        let mut seen = HashSet::new();
        for (record, key) in entries {
            if key.is_empty() || !seen.insert((record, key.to_string())) {
                continue;
            }
            let slot = index.keys.len();
            index.keys.push(IndexedKey {
                key: key.to_string(),
                record,
            });
            match leading_gram(key) {
                Some(gram) => index.by_gram.entry(gram).or_default().push(slot),
                None => index.short.push(slot),
            }
        }
        index
    }

    /// Highest-precedence record slot with a key contained in `normalized`.
    pub(crate) fn first_match(&self, normalized: &str) -> Option<usize> {
        let chars: Vec<char> = normalized.chars().collect();
        let mut seen_grams = HashSet::new();
        let gram_hits = chars
            .windows(GRAM_LEN)
            .filter_map(|window| {
                let gram: String = window.iter().collect();
                if seen_grams.insert(gram.clone()) {
                    self.by_gram.get(&gram)
                } else {
                    None
                }
            })
            .flatten();

        self.short
            .iter()
            .chain(gram_hits)
            .map(|&slot| &self.keys[slot])
            .filter(|entry| normalized.contains(entry.key.as_str()))
            .map(|entry| entry.record)
            .min()
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }
}

fn leading_gram(key: &str) -> Option<String> {
    let gram: String = key.chars().take(GRAM_LEN).collect();
    if gram.chars().count() == GRAM_LEN {
        Some(gram)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_slot_wins() {
        let index = AliasIndex::build([(1, "salt"), (0, "sea salt"), (2, "sea")]);
        assert_eq!(index.first_match("coarse sea salt"), Some(0));
        assert_eq!(index.first_match("rock salt"), Some(1));
        assert_eq!(index.first_match("sugar"), None);
    }

    #[test]
    fn test_short_keys_are_checked() {
        let index = AliasIndex::build([(0, "msg"), (1, "e1")]);
        assert_eq!(index.first_match("contains e1 colour"), Some(1));
        assert_eq!(index.key_count(), 2);
    }

    #[test]
    fn test_multibyte_keys() {
        let index = AliasIndex::build([(0, "亚硝酸钠"), (1, "味精")]);
        assert_eq!(index.first_match("食用盐、亚硝酸钠"), Some(0));
        assert_eq!(index.first_match("味精"), Some(1));
    }

    #[test]
    fn test_empty_keys_skipped() {
        let index = AliasIndex::build([(0, ""), (1, "guar gum")]);
        assert_eq!(index.first_match("water"), None);
        assert_eq!(index.key_count(), 1);
    }
}
