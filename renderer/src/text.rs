//! Plain-text backend: renders a `RenderTree` to any writer.

use std::io::{self, Write};

use crate::node::{RenderNode, RenderTree};
use crate::theme::Theme;

const RULE_WIDTH: usize = 40;
const COLUMN_RULE_WIDTH: usize = 20;

pub fn write_text<W: Write>(tree: &RenderTree, out: &mut W) -> io::Result<()> {
    let mut emitter = Emitter {
        theme: &tree.theme,
        out,
    };
    for (i, page) in tree.pages.iter().enumerate() {
        if i > 0 {
            emitter.page_break()?;
        }
        emitter.node(page, 0)?;
    }
    Ok(())
}

pub fn to_text(tree: &RenderTree) -> String {
    let mut buf = Vec::new();
    write_text(tree, &mut buf).expect("writing to a Vec is infallible");
    String::from_utf8_lossy(&buf).into_owned()
}

struct Emitter<'a, W: Write> {
    theme: &'a Theme,
    out: &'a mut W,
}

impl<W: Write> Emitter<'_, W> {
    fn line(&mut self, indent: usize, text: &str) -> io::Result<()> {
        writeln!(self.out, "{:indent$}{}", "", text, indent = indent)
    }

    fn rule(&mut self, indent: usize, width: usize) -> io::Result<()> {
        let rule: String = std::iter::repeat(self.theme.rule).take(width).collect();
        self.line(indent, &rule)
    }

    fn page_break(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.rule(0, RULE_WIDTH)?;
        writeln!(self.out)
    }

    fn children(&mut self, nodes: &[RenderNode], indent: usize) -> io::Result<()> {
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                writeln!(self.out)?;
            }
            self.node(node, indent)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &RenderNode, indent: usize) -> io::Result<()> {
        match node {
            RenderNode::Page { children } | RenderNode::Column { children } => {
                self.children(children, indent)
            }
            RenderNode::Columns { columns } => {
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        writeln!(self.out)?;
                        self.rule(indent, COLUMN_RULE_WIDTH)?;
                        writeln!(self.out)?;
                    }
                    self.node(column, indent)?;
                }
                Ok(())
            }
            RenderNode::Header {
                name,
                subtitle,
                contacts,
            } => {
                self.line(indent, name)?;
                if let Some(subtitle) = subtitle {
                    self.line(indent, subtitle)?;
                }
                if !contacts.is_empty() {
                    self.line(indent, &contacts.join(" | "))?;
                }
                Ok(())
            }
            RenderNode::Section { title, children } => {
                let title = if self.theme.uppercase_sections {
                    title.to_uppercase()
                } else {
                    title.clone()
                };
                self.line(indent, &title)?;
                self.rule(indent, title.chars().count().max(4))?;
                if !children.is_empty() {
                    writeln!(self.out)?;
                    self.children(children, indent)?;
                }
                Ok(())
            }
            RenderNode::Entry {
                company,
                role,
                dates,
                location,
                children,
            } => {
                self.line(indent, &format!("{}, {} ({})", role, company, dates))?;
                if let Some(location) = location {
                    self.line(indent, location)?;
                }
                if !children.is_empty() {
                    writeln!(self.out)?;
                    self.children(children, indent + 2)?;
                }
                Ok(())
            }
            RenderNode::Summary { children } => self.children(children, indent),
            RenderNode::Tags { tags } => {
                let rendered: Vec<String> = tags
                    .iter()
                    .filter_map(|tag| match tag {
                        RenderNode::Tag { text } => Some(self.tag_text(text)),
                        _ => None,
                    })
                    .collect();
                self.line(indent, &rendered.join(" "))
            }
            RenderNode::Tag { text } => {
                let rendered = self.tag_text(text);
                self.line(indent, &rendered)
            }
            RenderNode::Languages { items } => {
                for item in items {
                    let bullet = self.theme.bullet;
                    self.line(indent, &format!("{} {}: {}", bullet, item.language, item.level))?;
                }
                Ok(())
            }
            RenderNode::Paragraph { text } => {
                for raw in text.lines() {
                    self.line(indent, raw)?;
                }
                Ok(())
            }
            RenderNode::Divider => self.rule(indent, RULE_WIDTH),
            RenderNode::Watermark { text } => {
                let text = text.as_deref().unwrap_or("draft");
                self.line(indent, &format!("~ {} ~", text))
            }
        }
    }

    fn tag_text(&self, text: &str) -> String {
        format!("{}{}{}", self.theme.tag_open, text, self.theme.tag_close)
    }
}
