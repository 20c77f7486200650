pub mod error;
mod grammar;
mod structural;
mod title;

pub use error::{ParseError, ParseErrorKind};

use crate::source::SourceDocument;
use crate::tree::Document;

/// Parser entry point.
pub struct Parser<'a> {
    source: &'a str,
    file_id: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the whole source into a document tree.
    ///
    /// Empty input is rejected before the grammar runs.
    pub fn parse(&self) -> Result<Document<'a>, ParseError> {
        if self.source.is_empty() {
            return Err(ParseError::empty_input(self.file_id));
        }
        structural::parse_document(self.source, self.file_id)
    }
}

/// Parse a [`SourceDocument`].
pub fn parse(source: &SourceDocument) -> Result<Document<'_>, ParseError> {
    Parser::new(source.text(), source.file_id()).parse()
}
