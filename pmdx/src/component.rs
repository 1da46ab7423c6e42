use std::fmt;

/// The closed set of component names the dialect understands.
/// `Page`, `Columns` and `Column` are structural containers with their own
/// classifier units and are not part of this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Header,
    Section,
    Entry,
    Summary,
    Tags,
    Languages,
    Watermark,
    Divider,
}

impl ComponentKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Header" => Some(ComponentKind::Header),
            "Section" => Some(ComponentKind::Section),
            "Entry" => Some(ComponentKind::Entry),
            "Summary" => Some(ComponentKind::Summary),
            "Tags" => Some(ComponentKind::Tags),
            "Languages" => Some(ComponentKind::Languages),
            "Watermark" => Some(ComponentKind::Watermark),
            "Divider" => Some(ComponentKind::Divider),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Header => "Header",
            ComponentKind::Section => "Section",
            ComponentKind::Entry => "Entry",
            ComponentKind::Summary => "Summary",
            ComponentKind::Tags => "Tags",
            ComponentKind::Languages => "Languages",
            ComponentKind::Watermark => "Watermark",
            ComponentKind::Divider => "Divider",
        }
    }

    /// Leaf components carry no children and take no closing tag.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            ComponentKind::Header | ComponentKind::Watermark | ComponentKind::Divider
        )
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered `key=value` attributes of a component invocation.
/// Keys are unique; the classifier rejects duplicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttrList {
    pairs: Vec<(String, String)>,
}

impl AttrList {
    pub fn new() -> Self {
        AttrList { pairs: Vec::new() }
    }

    pub fn push(&mut self, key: String, value: String) {
        self.pairs.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
