use std::collections::HashMap;

/// Literal, case-sensitive prefix matcher over the active keys.
///
/// Keys are bucketed by their first byte so a line is only compared against
/// keys that could possibly prefix it. Bucket order follows key order.
#[derive(Debug, Clone, Default)]
pub struct KeyMatcher {
    keys: Vec<String>,
    by_first_byte: HashMap<u8, Vec<usize>>,
}

impl KeyMatcher {
    /// Creates a matcher for the given keys; empty keys are ignored
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut matcher = Self::default();
        for key in keys {
            let key = key.into();
            let Some(&first) = key.as_bytes().first() else {
                continue;
            };
            matcher
                .by_first_byte
                .entry(first)
                .or_default()
                .push(matcher.keys.len());
            matcher.keys.push(key);
        }
        matcher
    }

    /// Returns every key the line starts with, in key order
    pub fn matching_keys<'a>(&'a self, line: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        line.as_bytes()
            .first()
            .and_then(|first| self.by_first_byte.get(first))
            .into_iter()
            .flatten()
            .map(move |&idx| self.keys[idx].as_str())
            .filter(move |key| line.starts_with(key))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
