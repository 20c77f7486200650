pub mod parser;
pub mod source;
pub mod tree;

pub use parser::{ParseError, ParseErrorKind, Parser, parse};
pub use source::SourceDocument;
pub use tree::{
    Content, Document, ExecCode, Header, Heading, HeadingStyle, Intro, NodeKind, ParseNode,
    Section, TextRun,
};
