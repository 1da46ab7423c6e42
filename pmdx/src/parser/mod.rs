mod assemble;
pub mod error;
pub mod line;

pub use error::ParseError;
pub use line::{Classified, Unit, classify};

use crate::document::Document;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the source text into a complete Document. The first
    /// classification or structural error aborts the parse.
    pub fn parse(&self) -> Result<Document, ParseError> {
        let units = line::classify(&self.source, self.file_id)?;
        assemble::assemble(units, self.file_id)
    }
}
