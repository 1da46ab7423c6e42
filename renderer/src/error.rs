use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use pmdx::ParseError;

/// The single error type the compile entry point returns. Any phase
/// failure (classification, assembly, theme resolution, mapping) collapses
/// into one of these; no partial render tree survives an error.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub message: String,
    /// 1-based source line, when the failure is anchored to one.
    pub line: Option<usize>,
    pub span: Option<Range<usize>>,
    pub file_id: usize,
}

impl CompileError {
    /// An error with no source anchor (e.g. unknown theme passed by name).
    pub fn new(message: impl Into<String>) -> Self {
        CompileError {
            message: message.into(),
            line: None,
            span: None,
            file_id: 0,
        }
    }

    pub fn at(message: impl Into<String>, line: usize, file_id: usize) -> Self {
        CompileError {
            message: message.into(),
            line: Some(line),
            span: None,
            file_id,
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let diagnostic = Diagnostic::new(Severity::Error).with_message(&self.message);
        match &self.span {
            Some(span) => {
                diagnostic.with_labels(vec![Label::primary(self.file_id, span.clone())])
            }
            None => diagnostic,
        }
    }
}

impl From<ParseError> for CompileError {
    fn from(error: ParseError) -> Self {
        CompileError {
            message: error.message,
            line: Some(error.line),
            span: Some(error.span),
            file_id: error.file_id,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for CompileError {}
