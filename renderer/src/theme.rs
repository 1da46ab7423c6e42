/// Presentation settings threaded read-only through rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    /// Character used for section underlines, dividers and page breaks.
    pub rule: char,
    /// Bullet for list-like lines (languages, entry children).
    pub bullet: char,
    pub uppercase_sections: bool,
    pub tag_open: &'static str,
    pub tag_close: &'static str,
}

/// The fixed set of named themes. Passed explicitly into `compile` so
/// concurrent compiles with different registries never interfere.
#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    themes: Vec<Theme>,
}

impl ThemeRegistry {
    /// The built-in themes. `classic` is the default.
    pub fn builtin() -> Self {
        ThemeRegistry {
            themes: vec![
                Theme {
                    name: "classic",
                    rule: '-',
                    bullet: '-',
                    uppercase_sections: false,
                    tag_open: "[",
                    tag_close: "]",
                },
                Theme {
                    name: "slate",
                    rule: '─',
                    bullet: '•',
                    uppercase_sections: true,
                    tag_open: "⟨",
                    tag_close: "⟩",
                },
                Theme {
                    name: "mono",
                    rule: '=',
                    bullet: '*',
                    uppercase_sections: false,
                    tag_open: "#",
                    tag_close: "",
                },
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.name == name)
    }

    pub fn default_theme(&self) -> &Theme {
        &self.themes[0]
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.themes.iter().map(|t| t.name)
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        ThemeRegistry::builtin()
    }
}
