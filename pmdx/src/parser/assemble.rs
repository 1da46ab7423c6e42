use std::ops::Range;

use crate::component::{AttrList, ComponentKind};
use crate::config::{Config, ConfigEntry};
use crate::document::{Block, Column, ComponentInvocation, Document, Page};
use crate::parser::error::ParseError;
use crate::parser::line::{Classified, Unit};

/// Assemble the classified-unit stream into the document tree.
pub fn assemble(
    units: Vec<Classified>,
    file_id: usize,
) -> Result<Document, ParseError> {
    let mut state = Assembler::new(file_id);
    for classified in units {
        state.step(classified)?;
    }
    state.finalize()
}

// ---------------------------------------------------------------------------
// Assembler state
// ---------------------------------------------------------------------------

/// An open container on the nesting stack. Innermost = last.
struct Frame {
    kind: FrameKind,
    line: usize,
    span: Range<usize>,
}

enum FrameKind {
    Page {
        blocks: Vec<Block>,
    },
    Columns {
        declared: Option<usize>,
        columns: Vec<Column>,
    },
    Column {
        blocks: Vec<Block>,
    },
    Component {
        kind: ComponentKind,
        attrs: AttrList,
        children: Vec<Block>,
    },
}

impl FrameKind {
    fn name(&self) -> &'static str {
        match self {
            FrameKind::Page { .. } => "Page",
            FrameKind::Columns { .. } => "Columns",
            FrameKind::Column { .. } => "Column",
            FrameKind::Component { kind, .. } => kind.name(),
        }
    }
}

struct Assembler {
    file_id: usize,
    config: Config,
    pages: Vec<Page>,
    /// Blocks outside any explicit page; flushed as implicit pages in order.
    loose: Vec<Block>,
    stack: Vec<Frame>,
    /// Consecutive plain-text lines awaiting paragraph closure.
    para: Option<(Vec<String>, usize)>,
    /// Adjacent tag lines awaiting coalescing.
    tags: Option<(Vec<String>, usize)>,
}

impl Assembler {
    fn new(file_id: usize) -> Self {
        Assembler {
            file_id,
            config: Config::default(),
            pages: Vec::new(),
            loose: Vec::new(),
            stack: Vec::new(),
            para: None,
            tags: None,
        }
    }

    fn error(&self, message: impl Into<String>, span: Range<usize>, line: usize) -> ParseError {
        ParseError::new(message, span, line, self.file_id)
    }

    fn step(&mut self, classified: Classified) -> Result<(), ParseError> {
        let Classified { unit, line, span } = classified;
        match unit {
            Unit::Blank => {
                self.flush_para()?;
                self.flush_tags()?;
            }
            Unit::ConfigStart | Unit::ConfigEnd => {}
            Unit::ConfigEntry { key, value } => {
                self.config.entries.push(ConfigEntry { key, value, line });
            }
            Unit::Text { text } => {
                self.flush_tags()?;
                match &mut self.para {
                    Some((lines, _)) => lines.push(text),
                    None => self.para = Some((vec![text], line)),
                }
            }
            Unit::TagLine { items } => {
                self.flush_para()?;
                match &mut self.tags {
                    Some((all, _)) => all.extend(items),
                    None => self.tags = Some((items, line)),
                }
            }
            Unit::Heading { level, text } => {
                self.flush_all()?;
                self.push_block(Block::Heading { level, text, line })?;
            }
            Unit::Divider => {
                self.flush_all()?;
                self.push_block(Block::Divider { line })?;
            }
            Unit::PageStart => {
                self.flush_all()?;
                if let Some(open) = self.stack.last() {
                    return Err(self.error(
                        format!("Page cannot open inside {}", open.kind.name()),
                        span,
                        line,
                    ));
                }
                self.flush_implicit_page();
                self.stack.push(Frame {
                    kind: FrameKind::Page { blocks: Vec::new() },
                    line,
                    span,
                });
            }
            Unit::ColumnsStart { count } => {
                self.flush_all()?;
                self.stack.push(Frame {
                    kind: FrameKind::Columns {
                        declared: count,
                        columns: Vec::new(),
                    },
                    line,
                    span,
                });
            }
            Unit::ColumnStart => {
                self.flush_all()?;
                match self.stack.last() {
                    Some(Frame {
                        kind: FrameKind::Columns { .. },
                        ..
                    }) => {}
                    _ => {
                        return Err(self.error(
                            "Column is only valid directly inside Columns",
                            span,
                            line,
                        ));
                    }
                }
                self.stack.push(Frame {
                    kind: FrameKind::Column { blocks: Vec::new() },
                    line,
                    span,
                });
            }
            Unit::ComponentOpen { kind, attrs } => {
                self.flush_all()?;
                if kind.is_leaf() {
                    self.push_block(Block::Component(ComponentInvocation {
                        kind,
                        attrs,
                        children: Vec::new(),
                        line,
                    }))?;
                } else {
                    self.stack.push(Frame {
                        kind: FrameKind::Component {
                            kind,
                            attrs,
                            children: Vec::new(),
                        },
                        line,
                        span,
                    });
                }
            }
            Unit::PageEnd => self.close(Closer::Page, span, line)?,
            Unit::ColumnsEnd => self.close(Closer::Columns, span, line)?,
            Unit::ColumnEnd => self.close(Closer::Column, span, line)?,
            Unit::ComponentClose { kind } => self.close(Closer::Component(kind), span, line)?,
        }
        Ok(())
    }

    /// Pop the innermost frame, validating that the closer matches it.
    fn close(&mut self, closer: Closer, span: Range<usize>, line: usize) -> Result<(), ParseError> {
        self.flush_all()?;

        let Some(frame) = self.stack.pop() else {
            return Err(self.error(
                format!("unexpected closing tag '/{}'", closer.name()),
                span,
                line,
            ));
        };

        let matches = match (&closer, &frame.kind) {
            (Closer::Page, FrameKind::Page { .. }) => true,
            (Closer::Columns, FrameKind::Columns { .. }) => true,
            (Closer::Column, FrameKind::Column { .. }) => true,
            (Closer::Component(kind), FrameKind::Component { kind: open, .. }) => kind == open,
            _ => false,
        };
        if !matches {
            let expected = frame.kind.name();
            return Err(self.error(
                format!(
                    "mismatched closing tag '/{}': expected '/{}'",
                    closer.name(),
                    expected
                ),
                span,
                line,
            ));
        }

        match frame.kind {
            FrameKind::Page { blocks } => {
                self.pages.push(Page {
                    blocks,
                    implicit: false,
                });
            }
            FrameKind::Columns { declared, columns } => {
                if let Some(n) = declared {
                    if columns.len() != n {
                        return Err(self.error(
                            format!(
                                "Columns declares count={} but contains {} column(s)",
                                n,
                                columns.len()
                            ),
                            span,
                            line,
                        ));
                    }
                }
                self.push_block(Block::Columns {
                    declared,
                    columns,
                    line: frame.line,
                })?;
            }
            FrameKind::Column { blocks } => {
                match self.stack.last_mut() {
                    Some(Frame {
                        kind: FrameKind::Columns { columns, .. },
                        ..
                    }) => columns.push(Column {
                        blocks,
                        line: frame.line,
                    }),
                    // ColumnStart is only accepted directly inside Columns.
                    _ => unreachable!("Column frame without a Columns parent"),
                }
            }
            FrameKind::Component {
                kind,
                attrs,
                children,
            } => {
                self.push_block(Block::Component(ComponentInvocation {
                    kind,
                    attrs,
                    children,
                    line: frame.line,
                }))?;
            }
        }
        Ok(())
    }

    /// Attach a finished block to the innermost open container.
    fn push_block(&mut self, block: Block) -> Result<(), ParseError> {
        match self.stack.last_mut() {
            Some(Frame {
                kind: FrameKind::Page { blocks } | FrameKind::Column { blocks },
                ..
            }) => blocks.push(block),
            Some(Frame {
                kind: FrameKind::Component { children, .. },
                ..
            }) => children.push(block),
            Some(Frame {
                kind: FrameKind::Columns { .. },
                span,
                ..
            }) => {
                let span = span.clone();
                let line = block.line();
                return Err(self.error(
                    "content inside Columns must be wrapped in a Column",
                    span,
                    line,
                ));
            }
            None => self.loose.push(block),
        }
        Ok(())
    }

    fn flush_para(&mut self) -> Result<(), ParseError> {
        if let Some((lines, line)) = self.para.take() {
            self.push_block(Block::Paragraph {
                text: lines.join("\n"),
                line,
            })?;
        }
        Ok(())
    }

    fn flush_tags(&mut self) -> Result<(), ParseError> {
        if let Some((items, line)) = self.tags.take() {
            self.push_block(Block::TagList { items, line })?;
        }
        Ok(())
    }

    fn flush_all(&mut self) -> Result<(), ParseError> {
        self.flush_para()?;
        self.flush_tags()
    }

    fn flush_implicit_page(&mut self) {
        if !self.loose.is_empty() {
            self.pages.push(Page {
                blocks: std::mem::take(&mut self.loose),
                implicit: true,
            });
        }
    }

    fn finalize(mut self) -> Result<Document, ParseError> {
        self.flush_all()?;

        // Unterminated containers are never silently closed.
        if let Some(frame) = self.stack.last() {
            return Err(ParseError::new(
                format!(
                    "unterminated {} opened on line {}",
                    frame.kind.name(),
                    frame.line
                ),
                frame.span.clone(),
                frame.line,
                self.file_id,
            ));
        }

        self.flush_implicit_page();
        Ok(Document {
            config: self.config,
            pages: self.pages,
            source_id: self.file_id,
        })
    }
}

enum Closer {
    Page,
    Columns,
    Column,
    Component(ComponentKind),
}

impl Closer {
    fn name(&self) -> &'static str {
        match self {
            Closer::Page => "Page",
            Closer::Columns => "Columns",
            Closer::Column => "Column",
            Closer::Component(kind) => kind.name(),
        }
    }
}
