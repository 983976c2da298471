use std::sync::Arc;

use dashmap::DashMap;
use regex::Regex;

/// Compiled patterns keyed by their source text.
///
/// Compilation failures are remembered as well, so a broken rule costs one compile attempt
/// instead of one per request.
#[derive(Clone, Default)]
pub struct PatternCache {
    compiled: Arc<DashMap<String, Result<Arc<Regex>, String>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full-match regex: the pattern must cover the whole input.
    pub fn regex(&self, pattern: &str) -> Result<Arc<Regex>, String> {
        self.compile(pattern, || format!("^(?:{pattern})$"))
    }

    /// Glob where `*` is any run of characters and `?` one character. Other characters keep their
    /// regex meaning, so `/v[0-9]/*` is a valid wildcard.
    pub fn glob(&self, pattern: &str) -> Result<Arc<Regex>, String> {
        let key = format!("glob:{pattern}");
        self.compile(&key, || glob_to_regex(pattern))
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn clear(&self) {
        self.compiled.clear();
    }

    fn compile(&self, key: &str, source: impl FnOnce() -> String) -> Result<Arc<Regex>, String> {
        if let Some(hit) = self.compiled.get(key) {
            return hit.value().clone();
        }
        let compiled = Regex::new(&source())
            .map(Arc::new)
            .map_err(|err| err.to_string());
        self.compiled.insert(key.to_string(), compiled.clone());
        compiled
    }
}

pub fn glob_to_regex(glob: &str) -> String {
    let body = glob.replace('*', ".*").replace('?', ".");
    format!("^(?:{body})$")
}
