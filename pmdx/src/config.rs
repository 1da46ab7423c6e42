/// A single `key: value` line from the config block.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    /// 1-based source line, kept so consumers can report errors against it.
    pub line: usize,
}

/// Document-leading configuration. At most one per document; keys the
/// renderer does not recognize are preserved here and ignored downstream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub entries: Vec<ConfigEntry>,
}

impl Config {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// The selected theme name, if the config block declares one.
    pub fn theme(&self) -> Option<&ConfigEntry> {
        self.get("theme")
    }
}
