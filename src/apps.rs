use std::collections::BTreeMap;

/// Looks up installed applications by name.
pub trait AppLocator {
    /// Case-insensitive lookup; both the original and the whitespace-stripped
    /// form of a registered name are accepted.
    fn find(&self, name: &str) -> Option<String>;

    /// One entry per application, keyed by its configured name.
    fn list_all(&self) -> BTreeMap<String, String>;
}

#[derive(Debug, Clone, Default)]
pub struct AppIndex {
    /// Lookup keys, two per application.
    by_key: BTreeMap<String, String>,
    /// Names as configured, for display.
    names: BTreeMap<String, String>,
}

impl AppIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, path: impl Into<String>) {
        let path = path.into();
        let name = name.trim();
        let lower = name.to_lowercase();
        if lower.is_empty() {
            return;
        }
        let stripped: String = lower.chars().filter(|c| !c.is_whitespace()).collect();
        self.by_key.insert(stripped, path.clone());
        self.by_key.insert(lower, path.clone());
        self.names.insert(name.to_string(), path);
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for AppIndex {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut index = AppIndex::new();
        for (name, path) in iter {
            index.insert(name.as_ref(), path);
        }
        index
    }
}

impl AppLocator for AppIndex {
    fn find(&self, name: &str) -> Option<String> {
        self.by_key.get(&name.trim().to_lowercase()).cloned()
    }

    fn list_all(&self) -> BTreeMap<String, String> {
        self.names.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_key_forms_resolve() {
        let apps: AppIndex = [("Google Chrome", "/Applications/Google Chrome.app")]
            .into_iter()
            .collect();

        let expected = Some("/Applications/Google Chrome.app".to_string());
        assert_eq!(apps.find("google chrome"), expected);
        assert_eq!(apps.find("GoogleChrome"), expected);
        assert_eq!(apps.find("chrome"), None);
    }

    #[test]
    fn listing_shows_each_app_once() {
        let apps: AppIndex = [
            ("Google Chrome", "/Applications/Google Chrome.app"),
            ("Slack", "/Applications/Slack.app"),
        ]
        .into_iter()
        .collect();

        let all = apps.list_all();
        let names: Vec<&str> = all.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Google Chrome", "Slack"]);
    }
}
