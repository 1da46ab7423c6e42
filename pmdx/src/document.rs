use std::fmt;

use crate::component::{AttrList, ComponentKind};
use crate::config::Config;

/// A parsed PMDX document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub config: Config,
    /// Ordered pages. Content outside explicit `Page:` markers lands in
    /// implicit pages, flushed in document order.
    pub pages: Vec<Page>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub blocks: Vec<Block>,
    /// True when the page was not delimited by explicit markers.
    pub implicit: bool,
}

/// A structurally significant unit of source text. Headings stay flat at
/// this level; grouping under sections happens at render time.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
        line: usize,
    },
    Paragraph {
        text: String,
        line: usize,
    },
    TagList {
        items: Vec<String>,
        line: usize,
    },
    Divider {
        line: usize,
    },
    Columns {
        /// Declared `count` attribute; validated against `columns.len()`
        /// during assembly when present.
        declared: Option<usize>,
        columns: Vec<Column>,
        line: usize,
    },
    Component(ComponentInvocation),
}

impl Block {
    pub fn line(&self) -> usize {
        match self {
            Block::Heading { line, .. }
            | Block::Paragraph { line, .. }
            | Block::TagList { line, .. }
            | Block::Divider { line }
            | Block::Columns { line, .. } => *line,
            Block::Component(inv) => inv.line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub blocks: Vec<Block>,
    pub line: usize,
}

/// A named component with attributes and (for containers) nested children.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInvocation {
    pub kind: ComponentKind,
    pub attrs: AttrList,
    pub children: Vec<Block>,
    pub line: usize,
}

// ---------------------------------------------------------------------------
// Canonical serializer
// ---------------------------------------------------------------------------

// `Display` emits canonical PMDX source: reparsing the output yields an
// equivalent tree, and serializing again reaches a fixed point.

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if !self.config.is_empty() {
            writeln!(f, "+++")?;
            for entry in &self.config.entries {
                writeln!(f, "{}: {}", entry.key, entry.value)?;
            }
            writeln!(f, "+++")?;
            first = false;
        }
        for page in &self.pages {
            if !first {
                writeln!(f)?;
            }
            first = false;
            if page.implicit {
                write_blocks(f, &page.blocks)?;
            } else {
                writeln!(f, "Page:")?;
                writeln!(f)?;
                write_blocks(f, &page.blocks)?;
                writeln!(f)?;
                writeln!(f, "/Page")?;
            }
        }
        Ok(())
    }
}

fn write_blocks(f: &mut fmt::Formatter<'_>, blocks: &[Block]) -> fmt::Result {
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            writeln!(f)?;
        }
        write!(f, "{}", block)?;
    }
    Ok(())
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Heading { level, text, .. } => {
                for _ in 0..*level {
                    write!(f, "#")?;
                }
                writeln!(f, " {}", text)
            }
            Block::Paragraph { text, .. } => writeln!(f, "{}", text),
            Block::TagList { items, .. } => writeln!(f, "~ {}", items.join(" ")),
            Block::Divider { .. } => writeln!(f, "---"),
            Block::Columns {
                declared, columns, ..
            } => {
                match declared {
                    Some(n) => writeln!(f, "Columns: count={}", n)?,
                    None => writeln!(f, "Columns:")?,
                }
                for column in columns {
                    writeln!(f)?;
                    writeln!(f, "Column:")?;
                    writeln!(f)?;
                    write_blocks(f, &column.blocks)?;
                    writeln!(f)?;
                    writeln!(f, "/Column")?;
                }
                writeln!(f)?;
                writeln!(f, "/Columns")
            }
            Block::Component(inv) => write!(f, "{}", inv),
        }
    }
}

impl fmt::Display for ComponentInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.kind)?;
        for (key, value) in self.attrs.iter() {
            if value.is_empty() || value.contains(char::is_whitespace) {
                write!(f, " {}=\"{}\"", key, value)?;
            } else {
                write!(f, " {}={}", key, value)?;
            }
        }
        writeln!(f)?;
        if !self.kind.is_leaf() {
            writeln!(f)?;
            write_blocks(f, &self.children)?;
            writeln!(f)?;
            writeln!(f, "/{}", self.kind)?;
        }
        Ok(())
    }
}
