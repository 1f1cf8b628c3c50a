/// Prefixes counted when no `TARGET_PREFIXES` override is configured.
pub const DEFAULT_TARGET_PREFIXES: &[&str] = &["https://www.amazon.com", "https://www.amazon.co.jp"];

/// Decides whether an unescaped link points at one of the target shops.
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    prefixes: Vec<String>,
}

impl LinkClassifier {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.is_empty())
            .collect();
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_target_link(&self, url: &str) -> bool {
        self.prefixes.iter().any(|p| url.starts_with(p.as_str()))
    }
}

impl Default for LinkClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_PREFIXES.iter().copied())
    }
}
