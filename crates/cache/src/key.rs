/// Fixed key holding the whole ordered access rule set.
pub const ACCESS_RULES_KEY: &str = "gateway:access:rules:all";
/// Fixed key holding the whole ordered url mapping set.
pub const URL_MAPPINGS_KEY: &str = "gateway:url:mappings:all";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    raw: String,
}

impl CacheKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn access_rules() -> Self {
        Self::new(ACCESS_RULES_KEY)
    }

    pub fn url_mappings() -> Self {
        Self::new(URL_MAPPINGS_KEY)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
