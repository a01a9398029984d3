use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

/// Lowercase and collapse whitespace runs to single spaces.
pub fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ShortcutsFile {
    #[serde(default)]
    shortcuts: BTreeMap<String, String>,
}

/// User-owned phrase → command aliases, loaded once per invocation.
#[derive(Debug, Clone, Default)]
pub struct ShortcutMap {
    entries: BTreeMap<String, String>,
}

impl ShortcutMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let file: ShortcutsFile = toml::from_str(&content)?;
        Ok(Self {
            entries: file.shortcuts,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = ShortcutsFile {
            shortcuts: self.entries.clone(),
        };
        fs::write(path, toml::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn insert(&mut self, phrase: impl Into<String>, command: impl Into<String>) {
        self.entries.insert(phrase.into(), command.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Exact match after normalization on both sides. Keys are visited in
    /// sorted order, so duplicate normalized keys resolve deterministically.
    pub fn resolve(&self, input: &str) -> Option<&str> {
        let wanted = normalize(input);
        self.entries
            .iter()
            .find(|(key, _)| normalize(key) == wanted)
            .map(|(_, cmd)| cmd.as_str())
    }

    /// Keys in lexical order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ShortcutMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
