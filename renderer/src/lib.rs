pub mod error;
mod lower;
pub mod node;
pub mod text;
pub mod theme;

pub use error::CompileError;
pub use node::{LanguageItem, RenderNode, RenderTree};
pub use text::{to_text, write_text};
pub use theme::{Theme, ThemeRegistry};

use pmdx::{Document, Parser};

/// Compile PMDX source into a render tree. Phases run strictly in order
/// (classify, assemble, resolve theme, lower) and the first error
/// short-circuits the rest. Pure: same source and registry, same result.
pub fn compile(source: &str, themes: &ThemeRegistry) -> Result<RenderTree, CompileError> {
    compile_with_file_id(source, themes, 0)
}

/// As `compile`, tagging errors with `file_id` for diagnostic rendering.
pub fn compile_with_file_id(
    source: &str,
    themes: &ThemeRegistry,
    file_id: usize,
) -> Result<RenderTree, CompileError> {
    let doc = Parser::new(source.to_string(), file_id).parse()?;
    let theme = resolve_theme(&doc, themes)?;
    lower::lower(&doc, &theme)
}

/// Compile with an explicit theme, ignoring any `theme` key in the
/// document's config block. Used for caller-side overrides.
pub fn compile_with_theme(
    source: &str,
    theme: &Theme,
    file_id: usize,
) -> Result<RenderTree, CompileError> {
    let doc = Parser::new(source.to_string(), file_id).parse()?;
    lower::lower(&doc, theme)
}

/// Lower an already-parsed document against an explicit theme.
pub fn render_document(doc: &Document, theme: &Theme) -> Result<RenderTree, CompileError> {
    lower::lower(doc, theme)
}

/// An unknown theme name in the config block is a hard error, consistent
/// with the dialect's handling of unknown component names. An absent
/// `theme` key selects the registry default.
fn resolve_theme(doc: &Document, themes: &ThemeRegistry) -> Result<Theme, CompileError> {
    match doc.config.theme() {
        Some(entry) => match themes.get(entry.value.as_str()) {
            Some(theme) => Ok(theme.clone()),
            None => Err(CompileError::at(
                format!("unknown theme '{}'", entry.value),
                entry.line,
                doc.source_id,
            )),
        },
        None => Ok(themes.default_theme().clone()),
    }
}
