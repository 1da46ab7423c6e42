use std::ops::Range;

use crate::component::{AttrList, ComponentKind};
use crate::parser::error::ParseError;

// ---------------------------------------------------------------------------
// Classified units
// ---------------------------------------------------------------------------

/// One classified source line. Matchers are tried in priority order; the
/// first match wins and anything left over is plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum Unit {
    Blank,
    ConfigStart,
    ConfigEntry { key: String, value: String },
    ConfigEnd,
    PageStart,
    PageEnd,
    ColumnsStart { count: Option<usize> },
    ColumnsEnd,
    ColumnStart,
    ColumnEnd,
    Heading { level: u8, text: String },
    TagLine { items: Vec<String> },
    Divider,
    ComponentOpen { kind: ComponentKind, attrs: AttrList },
    ComponentClose { kind: ComponentKind },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub unit: Unit,
    /// 1-based source line.
    pub line: usize,
    pub span: Range<usize>,
}

/// Classify every line of `source`, stopping at the first error.
pub fn classify(source: &str, file_id: usize) -> Result<Vec<Classified>, ParseError> {
    Classifier::new(file_id).run(source)
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Structural names that are not part of the component vocabulary.
enum TagName {
    Page,
    Columns,
    Column,
    Component(ComponentKind),
}

fn resolve_name(name: &str) -> Option<TagName> {
    match name {
        "Page" => Some(TagName::Page),
        "Columns" => Some(TagName::Columns),
        "Column" => Some(TagName::Column),
        _ => ComponentKind::from_name(name).map(TagName::Component),
    }
}

/// Component names start with an uppercase ASCII letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

fn is_run_of(s: &str, marker: char, min: usize) -> bool {
    s.len() >= min && s.chars().all(|c| c == marker)
}

struct Classifier {
    file_id: usize,
    in_config: bool,
    config_seen: bool,
    content_seen: bool,
    /// Location of the opening config fence, for the unterminated case.
    config_open: (usize, Range<usize>),
}

impl Classifier {
    fn new(file_id: usize) -> Self {
        Classifier {
            file_id,
            in_config: false,
            config_seen: false,
            content_seen: false,
            config_open: (0, 0..0),
        }
    }

    fn error(&self, message: impl Into<String>, span: Range<usize>, line: usize) -> ParseError {
        ParseError::new(message, span, line, self.file_id)
    }

    fn run(mut self, source: &str) -> Result<Vec<Classified>, ParseError> {
        let mut units = Vec::new();
        let mut offset = 0;

        for (idx, raw) in source.split('\n').enumerate() {
            let line = idx + 1;
            let span = offset..offset + raw.len();
            offset += raw.len() + 1;

            let unit = if self.in_config {
                self.classify_config_line(raw, &span, line)?
            } else {
                self.classify_content_line(raw, &span, line)?
            };

            if !matches!(
                unit,
                Unit::Blank | Unit::ConfigStart | Unit::ConfigEntry { .. } | Unit::ConfigEnd
            ) {
                self.content_seen = true;
            }
            units.push(Classified { unit, line, span });
        }

        if self.in_config {
            let (line, span) = self.config_open.clone();
            return Err(self.error("unterminated config block", span, line));
        }

        Ok(units)
    }

    fn classify_config_line(
        &mut self,
        raw: &str,
        span: &Range<usize>,
        line: usize,
    ) -> Result<Unit, ParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Unit::Blank);
        }
        if is_run_of(trimmed, '+', 3) {
            self.in_config = false;
            return Ok(Unit::ConfigEnd);
        }
        match trimmed.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Unit::ConfigEntry {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err(self.error(
                "malformed config entry; expected 'key: value'",
                span.clone(),
                line,
            )),
        }
    }

    fn classify_content_line(
        &mut self,
        raw: &str,
        span: &Range<usize>,
        line: usize,
    ) -> Result<Unit, ParseError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Ok(Unit::Blank);
        }

        if is_run_of(trimmed, '+', 3) {
            if self.content_seen {
                return Err(self.error(
                    "config block must appear at the start of the document",
                    span.clone(),
                    line,
                ));
            }
            if self.config_seen {
                return Err(self.error("only one config block is allowed", span.clone(), line));
            }
            self.in_config = true;
            self.config_seen = true;
            self.config_open = (line, span.clone());
            return Ok(Unit::ConfigStart);
        }

        if trimmed.starts_with('#') {
            if let Some(unit) = self.classify_heading(trimmed, span, line)? {
                return Ok(unit);
            }
        }

        if is_run_of(trimmed, '-', 3) {
            return Ok(Unit::Divider);
        }

        if let Some(rest) = trimmed.strip_prefix('~') {
            if rest.is_empty() {
                return Err(self.error("tag line has no tags", span.clone(), line));
            }
            if rest.starts_with(char::is_whitespace) {
                let items: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
                if items.is_empty() {
                    return Err(self.error("tag line has no tags", span.clone(), line));
                }
                return Ok(Unit::TagLine { items });
            }
        }

        if let Some(rest) = trimmed.strip_prefix('/') {
            let name = rest.trim();
            if !is_valid_name(name) {
                return Err(self.error(
                    format!("malformed closing tag '{}'", trimmed),
                    span.clone(),
                    line,
                ));
            }
            return self.closer(name, span, line);
        }

        if let Some(base) = trimmed.strip_suffix("-end") {
            if is_valid_name(base) {
                return self.closer(base, span, line);
            }
        }

        if let Some((name, rest)) = trimmed.split_once(':') {
            if is_valid_name(name) {
                return self.opener(name, rest, span, line);
            }
        }

        Ok(Unit::Text {
            text: trimmed.to_string(),
        })
    }

    fn classify_heading(
        &self,
        trimmed: &str,
        span: &Range<usize>,
        line: usize,
    ) -> Result<Option<Unit>, ParseError> {
        let level = trimmed.chars().take_while(|&c| c == '#').count();
        let rest = &trimmed[level..];
        if !rest.starts_with(' ') && !rest.starts_with('\t') {
            // No space after the markers: a hashtag or similar, not a heading.
            return Ok(None);
        }
        if level > 6 {
            return Err(self.error(
                format!("heading level {} exceeds the maximum of 6", level),
                span.clone(),
                line,
            ));
        }
        let text = rest.trim();
        if text.is_empty() {
            return Err(self.error("heading has no text", span.clone(), line));
        }
        Ok(Some(Unit::Heading {
            level: level as u8,
            text: text.to_string(),
        }))
    }

    fn closer(&self, name: &str, span: &Range<usize>, line: usize) -> Result<Unit, ParseError> {
        match resolve_name(name) {
            Some(TagName::Page) => Ok(Unit::PageEnd),
            Some(TagName::Columns) => Ok(Unit::ColumnsEnd),
            Some(TagName::Column) => Ok(Unit::ColumnEnd),
            Some(TagName::Component(kind)) => Ok(Unit::ComponentClose { kind }),
            None => Err(self.error(format!("unknown component '{}'", name), span.clone(), line)),
        }
    }

    fn opener(
        &self,
        name: &str,
        rest: &str,
        span: &Range<usize>,
        line: usize,
    ) -> Result<Unit, ParseError> {
        match resolve_name(name) {
            Some(TagName::Page) => {
                if !rest.trim().is_empty() {
                    return Err(self.error("Page takes no attributes", span.clone(), line));
                }
                Ok(Unit::PageStart)
            }
            Some(TagName::Column) => {
                if !rest.trim().is_empty() {
                    return Err(self.error("Column takes no attributes", span.clone(), line));
                }
                Ok(Unit::ColumnStart)
            }
            Some(TagName::Columns) => {
                let attrs = self.parse_attrs(rest, span, line)?;
                let mut count = None;
                for (key, value) in attrs.iter() {
                    if key != "count" {
                        return Err(self.error(
                            format!("unknown attribute '{}' for Columns", key),
                            span.clone(),
                            line,
                        ));
                    }
                    match value.parse::<usize>() {
                        Ok(n) if n >= 1 => count = Some(n),
                        _ => {
                            return Err(self.error(
                                format!("invalid count '{}' for Columns", value),
                                span.clone(),
                                line,
                            ));
                        }
                    }
                }
                Ok(Unit::ColumnsStart { count })
            }
            Some(TagName::Component(kind)) => {
                let attrs = self.parse_attrs(rest, span, line)?;
                Ok(Unit::ComponentOpen { kind, attrs })
            }
            None => Err(self.error(format!("unknown component '{}'", name), span.clone(), line)),
        }
    }

    /// Parse `key=value` pairs. Values may be double-quoted to contain
    /// whitespace; quotes carry no escape syntax.
    fn parse_attrs(
        &self,
        rest: &str,
        span: &Range<usize>,
        line: usize,
    ) -> Result<AttrList, ParseError> {
        let mut attrs = AttrList::new();
        let mut s = rest.trim_start();

        while !s.is_empty() {
            let ws = s.find(char::is_whitespace).unwrap_or(s.len());
            let eq = match s.find('=') {
                Some(eq) if eq < ws => eq,
                _ => {
                    return Err(self.error(
                        format!("malformed attribute '{}'; expected key=value", &s[..ws]),
                        span.clone(),
                        line,
                    ));
                }
            };
            let key = &s[..eq];
            if key.is_empty() {
                return Err(self.error(
                    format!("malformed attribute '{}'; expected key=value", &s[..ws]),
                    span.clone(),
                    line,
                ));
            }

            let after = &s[eq + 1..];
            let value;
            if let Some(body) = after.strip_prefix('"') {
                let close = body.find('"').ok_or_else(|| {
                    self.error(
                        format!("unterminated quoted value for attribute '{}'", key),
                        span.clone(),
                        line,
                    )
                })?;
                value = &body[..close];
                s = &body[close + 1..];
            } else {
                let end = after.find(char::is_whitespace).unwrap_or(after.len());
                value = &after[..end];
                if value.is_empty() {
                    return Err(self.error(
                        format!("missing value for attribute '{}'", key),
                        span.clone(),
                        line,
                    ));
                }
                s = &after[end..];
            }

            if attrs.contains(key) {
                return Err(self.error(
                    format!("duplicate attribute '{}'", key),
                    span.clone(),
                    line,
                ));
            }
            attrs.push(key.to_string(), value.to_string());
            s = s.trim_start();
        }

        Ok(attrs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn one(source: &str) -> Unit {
        let units = classify(source, 0).expect("classification failed");
        assert_eq!(units.len(), 1, "expected one unit for {:?}", source);
        units[0].unit.clone()
    }

    fn err(source: &str) -> ParseError {
        classify(source, 0).expect_err("expected a classification error")
    }

    #[test]
    fn heading_levels() {
        assert_eq!(
            one("## Experience"),
            Unit::Heading {
                level: 2,
                text: "Experience".to_string()
            }
        );
        assert_eq!(
            one("###### Deep"),
            Unit::Heading {
                level: 6,
                text: "Deep".to_string()
            }
        );
    }

    #[test]
    fn heading_without_space_is_text() {
        assert_eq!(
            one("#hashtag"),
            Unit::Text {
                text: "#hashtag".to_string()
            }
        );
    }

    #[test]
    fn heading_too_deep() {
        let e = err("####### Seven");
        assert!(e.message.contains("exceeds the maximum"));
        assert_eq!(e.line, 1);
    }

    #[test]
    fn divider_needs_three_dashes() {
        assert_eq!(one("---"), Unit::Divider);
        assert_eq!(one("-----"), Unit::Divider);
        assert_eq!(
            one("--"),
            Unit::Text {
                text: "--".to_string()
            }
        );
    }

    #[test]
    fn tag_line_tokens() {
        assert_eq!(
            one("~ TypeScript React"),
            Unit::TagLine {
                items: vec!["TypeScript".to_string(), "React".to_string()]
            }
        );
    }

    #[test]
    fn bare_tilde_is_an_error() {
        assert!(err("~").message.contains("no tags"));
    }

    #[test]
    fn tilde_without_space_is_text() {
        assert_eq!(
            one("~3ms latency"),
            Unit::Text {
                text: "~3ms latency".to_string()
            }
        );
    }

    #[test]
    fn component_open_with_attrs() {
        let unit = one("Entry: company=ACME role=Engineer dates=2020-Present");
        let Unit::ComponentOpen { kind, attrs } = unit else {
            panic!("expected component open, got {:?}", unit);
        };
        assert_eq!(kind, ComponentKind::Entry);
        assert_eq!(attrs.get("company"), Some("ACME"));
        assert_eq!(attrs.get("role"), Some("Engineer"));
        assert_eq!(attrs.get("dates"), Some("2020-Present"));
    }

    #[test]
    fn quoted_attr_values() {
        let unit = one("Entry: company=\"ACME Corp\" role=Engineer dates=2020");
        let Unit::ComponentOpen { attrs, .. } = unit else {
            panic!("expected component open");
        };
        assert_eq!(attrs.get("company"), Some("ACME Corp"));
    }

    #[test]
    fn unterminated_quote() {
        let e = err("Entry: company=\"ACME role=Engineer");
        assert!(e.message.contains("unterminated quoted value"));
    }

    #[test]
    fn attr_without_value() {
        assert!(err("Entry: company").message.contains("expected key=value"));
        assert!(err("Entry: company=").message.contains("missing value"));
    }

    #[test]
    fn duplicate_attr() {
        let e = err("Entry: role=a role=b");
        assert!(e.message.contains("duplicate attribute 'role'"));
    }

    #[test]
    fn unknown_component_name() {
        let e = err("Widget: size=3");
        assert_eq!(e.message, "unknown component 'Widget'");
    }

    #[test]
    fn closer_forms() {
        assert_eq!(
            one("/Entry"),
            Unit::ComponentClose {
                kind: ComponentKind::Entry
            }
        );
        assert_eq!(
            one("Entry-end"),
            Unit::ComponentClose {
                kind: ComponentKind::Entry
            }
        );
    }

    #[test]
    fn prose_with_hyphen_end_is_text() {
        assert_eq!(
            one("a long week-end"),
            Unit::Text {
                text: "a long week-end".to_string()
            }
        );
    }

    #[test]
    fn lowercase_colon_prose_is_text() {
        assert_eq!(
            one("note: this stays prose"),
            Unit::Text {
                text: "note: this stays prose".to_string()
            }
        );
    }

    #[test]
    fn structural_units() {
        assert_eq!(one("Page:"), Unit::PageStart);
        assert_eq!(one("/Page"), Unit::PageEnd);
        assert_eq!(one("Columns: count=2"), Unit::ColumnsStart { count: Some(2) });
        assert_eq!(one("Columns:"), Unit::ColumnsStart { count: None });
        assert_eq!(one("/Columns"), Unit::ColumnsEnd);
        assert_eq!(one("Column:"), Unit::ColumnStart);
        assert_eq!(one("/Column"), Unit::ColumnEnd);
    }

    #[test]
    fn columns_rejects_bad_count() {
        assert!(err("Columns: count=zero").message.contains("invalid count"));
        assert!(err("Columns: count=0").message.contains("invalid count"));
        assert!(err("Columns: gap=4").message.contains("unknown attribute"));
    }

    #[test]
    fn config_block_flow() {
        let units = classify("+++\ntheme: slate\n+++", 0).unwrap();
        let kinds: Vec<&Unit> = units.iter().map(|c| &c.unit).collect();
        assert_eq!(kinds[0], &Unit::ConfigStart);
        assert_eq!(
            kinds[1],
            &Unit::ConfigEntry {
                key: "theme".to_string(),
                value: "slate".to_string()
            }
        );
        assert_eq!(kinds[2], &Unit::ConfigEnd);
    }

    #[test]
    fn config_after_content() {
        let e = err("some text\n+++\ntheme: x\n+++");
        assert!(e.message.contains("start of the document"));
        assert_eq!(e.line, 2);
    }

    #[test]
    fn second_config_block() {
        let e = err("+++\ntheme: x\n+++\n+++\ntheme: y\n+++");
        assert!(e.message.contains("only one config block"));
    }

    #[test]
    fn unterminated_config() {
        let e = err("+++\ntheme: x");
        assert!(e.message.contains("unterminated config block"));
        assert_eq!(e.line, 1);
    }

    #[test]
    fn malformed_config_entry() {
        let e = err("+++\njust words\n+++");
        assert!(e.message.contains("expected 'key: value'"));
        assert_eq!(e.line, 2);
    }

    #[test]
    fn line_numbers_and_spans() {
        let units = classify("first\n\n## Two", 0).unwrap();
        assert_eq!(units[2].line, 3);
        assert_eq!(&"first\n\n## Two"[units[2].span.clone()], "## Two");
    }
}
