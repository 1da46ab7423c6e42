//! Lowers the parsed document tree into the renderable node tree.

use pmdx::{Block, ComponentInvocation, ComponentKind, Document};

use crate::error::CompileError;
use crate::node::{LanguageItem, RenderNode, RenderTree};
use crate::theme::Theme;

pub(crate) fn lower(doc: &Document, theme: &Theme) -> Result<RenderTree, CompileError> {
    let pages = doc
        .pages
        .iter()
        .map(|page| {
            Ok(RenderNode::Page {
                children: lower_blocks(&page.blocks, doc.source_id)?,
            })
        })
        .collect::<Result<Vec<_>, CompileError>>()?;
    Ok(RenderTree {
        theme: theme.clone(),
        pages,
    })
}

// ---------------------------------------------------------------------------
// Heading grouping
// ---------------------------------------------------------------------------

/// A section opened by a heading, still collecting following siblings.
struct OpenSection {
    level: u8,
    title: String,
    children: Vec<RenderNode>,
}

/// Lower a sibling run, grouping blocks under heading-opened sections: a
/// heading of level N captures everything up to the next heading of level
/// <= N. The parsed tree keeps headings flat; nesting happens here.
fn lower_blocks(blocks: &[Block], file_id: usize) -> Result<Vec<RenderNode>, CompileError> {
    let mut out: Vec<RenderNode> = Vec::new();
    let mut open: Vec<OpenSection> = Vec::new();

    fn close_one(out: &mut Vec<RenderNode>, open: &mut Vec<OpenSection>) {
        let Some(section) = open.pop() else {
            return;
        };
        let node = RenderNode::Section {
            title: section.title,
            children: section.children,
        };
        match open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => out.push(node),
        }
    }

    for block in blocks {
        if let Block::Heading { level, text, .. } = block {
            while open.last().is_some_and(|s| s.level >= *level) {
                close_one(&mut out, &mut open);
            }
            open.push(OpenSection {
                level: *level,
                title: text.clone(),
                children: Vec::new(),
            });
        } else {
            let node = lower_block(block, file_id)?;
            match open.last_mut() {
                Some(section) => section.children.push(node),
                None => out.push(node),
            }
        }
    }

    while !open.is_empty() {
        close_one(&mut out, &mut open);
    }
    Ok(out)
}

fn lower_block(block: &Block, file_id: usize) -> Result<RenderNode, CompileError> {
    match block {
        // Headings are intercepted by lower_blocks; fail closed rather than
        // skip if one ever arrives here.
        Block::Heading { line, .. } => Err(CompileError::at(
            "heading reached the render mapper ungrouped",
            *line,
            file_id,
        )),
        Block::Paragraph { text, .. } => Ok(RenderNode::Paragraph { text: text.clone() }),
        Block::TagList { items, .. } => Ok(tags_node(items)),
        Block::Divider { .. } => Ok(RenderNode::Divider),
        Block::Columns { columns, .. } => {
            let columns = columns
                .iter()
                .map(|column| {
                    Ok(RenderNode::Column {
                        children: lower_blocks(&column.blocks, file_id)?,
                    })
                })
                .collect::<Result<Vec<_>, CompileError>>()?;
            Ok(RenderNode::Columns { columns })
        }
        Block::Component(inv) => lower_component(inv, file_id),
    }
}

fn tags_node(items: &[String]) -> RenderNode {
    RenderNode::Tags {
        tags: items
            .iter()
            .map(|item| RenderNode::Tag { text: item.clone() })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Component contracts
// ---------------------------------------------------------------------------

fn lower_component(inv: &ComponentInvocation, file_id: usize) -> Result<RenderNode, CompileError> {
    match inv.kind {
        ComponentKind::Header => {
            check_attrs(inv, &["name", "subtitle", "contact"], file_id)?;
            let name = require(inv, "name", file_id)?;
            let subtitle = inv.attrs.get("subtitle").map(str::to_string);
            let contacts = inv
                .attrs
                .get("contact")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Ok(RenderNode::Header {
                name,
                subtitle,
                contacts,
            })
        }
        ComponentKind::Section => {
            check_attrs(inv, &["title"], file_id)?;
            let title = require(inv, "title", file_id)?;
            Ok(RenderNode::Section {
                title,
                children: lower_blocks(&inv.children, file_id)?,
            })
        }
        ComponentKind::Entry => {
            check_attrs(inv, &["company", "role", "dates", "location"], file_id)?;
            Ok(RenderNode::Entry {
                company: require(inv, "company", file_id)?,
                role: require(inv, "role", file_id)?,
                dates: require(inv, "dates", file_id)?,
                location: inv.attrs.get("location").map(str::to_string),
                children: lower_blocks(&inv.children, file_id)?,
            })
        }
        ComponentKind::Summary => {
            check_attrs(inv, &[], file_id)?;
            Ok(RenderNode::Summary {
                children: lower_blocks(&inv.children, file_id)?,
            })
        }
        ComponentKind::Tags => {
            check_attrs(inv, &[], file_id)?;
            let mut items: Vec<String> = Vec::new();
            for child in &inv.children {
                match child {
                    Block::TagList {
                        items: child_items, ..
                    } => items.extend(child_items.iter().cloned()),
                    other => {
                        return Err(CompileError::at(
                            "Tags may contain only tag lines",
                            other.line(),
                            file_id,
                        ));
                    }
                }
            }
            Ok(tags_node(&items))
        }
        ComponentKind::Languages => {
            check_attrs(inv, &[], file_id)?;
            let mut items = Vec::new();
            for child in &inv.children {
                let Block::Paragraph { text, line } = child else {
                    return Err(CompileError::at(
                        "Languages may contain only 'Language = Level' lines",
                        child.line(),
                        file_id,
                    ));
                };
                for (i, raw) in text.lines().enumerate() {
                    items.push(parse_language(raw, line + i, file_id)?);
                }
            }
            Ok(RenderNode::Languages { items })
        }
        ComponentKind::Watermark => {
            check_attrs(inv, &["text"], file_id)?;
            Ok(RenderNode::Watermark {
                text: inv.attrs.get("text").map(str::to_string),
            })
        }
        ComponentKind::Divider => {
            check_attrs(inv, &[], file_id)?;
            Ok(RenderNode::Divider)
        }
    }
}

fn parse_language(raw: &str, line: usize, file_id: usize) -> Result<LanguageItem, CompileError> {
    match raw.split_once('=') {
        Some((language, level)) if !language.trim().is_empty() && !level.trim().is_empty() => {
            Ok(LanguageItem {
                language: language.trim().to_string(),
                level: level.trim().to_string(),
            })
        }
        _ => Err(CompileError::at(
            format!(
                "malformed language entry '{}'; expected 'Language = Level'",
                raw
            ),
            line,
            file_id,
        )),
    }
}

fn require(
    inv: &ComponentInvocation,
    key: &str,
    file_id: usize,
) -> Result<String, CompileError> {
    inv.attrs.get(key).map(str::to_string).ok_or_else(|| {
        CompileError::at(
            format!("missing required attribute '{}' for {}", key, inv.kind),
            inv.line,
            file_id,
        )
    })
}

fn check_attrs(
    inv: &ComponentInvocation,
    allowed: &[&str],
    file_id: usize,
) -> Result<(), CompileError> {
    for (key, _) in inv.attrs.iter() {
        if !allowed.contains(&key) {
            return Err(CompileError::at(
                format!("unknown attribute '{}' for {}", key, inv.kind),
                inv.line,
                file_id,
            ));
        }
    }
    Ok(())
}
