use std::ops::Range;

/// A parsed executable document.
///
/// Every node keeps its byte span in the source and a borrowed slice of
/// its raw text; nothing is copied out of the source except heading titles.
#[derive(Debug, Clone, PartialEq)]
pub struct Document<'a> {
    /// The `---`-delimited header block, if the document starts with one.
    pub header: Option<Header<'a>>,
    /// Content before the first heading.
    pub intro: Intro<'a>,
    /// Heading-delimited sections, in document order.
    pub sections: Vec<Section<'a>>,
}

impl<'a> Document<'a> {
    /// True when the document has no intro content and no sections.
    pub fn is_empty_body(&self) -> bool {
        self.intro.children.is_empty() && self.sections.is_empty()
    }

    /// All nodes in document order (depth-first).
    pub fn nodes(&self) -> Vec<ParseNode<'_, 'a>> {
        let mut nodes = Vec::new();
        if let Some(header) = &self.header {
            nodes.push(ParseNode::Header(header));
        }
        nodes.push(ParseNode::Intro(&self.intro));
        nodes.extend(self.intro.children.iter().map(ParseNode::from));
        for section in &self.sections {
            nodes.push(ParseNode::Section(section));
            nodes.push(ParseNode::Heading(&section.heading));
            nodes.extend(section.children.iter().map(ParseNode::from));
        }
        nodes
    }

    /// Text runs of the intro and every section, in document order.
    pub fn text_runs(&self) -> impl Iterator<Item = &TextRun<'a>> {
        self.intro
            .children
            .iter()
            .chain(self.sections.iter().flat_map(|s| s.children.iter()))
            .filter_map(|child| match child {
                Content::TextRun(run) => Some(run),
                Content::ExecCode(_) => None,
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header<'a> {
    pub span: Range<usize>,
    /// The whole block, delimiters included.
    pub raw: &'a str,
    /// Lines between the delimiters.
    pub body: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Intro<'a> {
    pub span: Range<usize>,
    pub raw: &'a str,
    pub children: Vec<Content<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub heading: Heading<'a>,
    pub children: Vec<Content<'a>>,
    /// From the start of the heading to the end of the last child.
    pub span: Range<usize>,
    pub raw: &'a str,
}

impl Section<'_> {
    pub fn level(&self) -> usize {
        self.heading.level
    }

    pub fn title(&self) -> &str {
        &self.heading.title
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingStyle {
    /// `## Title`
    Atx,
    /// `Title` underlined with `===` or `---`
    Setext,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading<'a> {
    /// 1 = top level.
    pub level: usize,
    /// Plain-text, whitespace-normalized title.
    pub title: String,
    pub style: HeadingStyle,
    pub span: Range<usize>,
    /// The heading line(s) as written, including the setext underline.
    pub raw: &'a str,
}

/// Ungoverned content of the intro or of a section.
#[derive(Debug, Clone, PartialEq)]
pub enum Content<'a> {
    ExecCode(ExecCode<'a>),
    TextRun(TextRun<'a>),
}

impl<'a> Content<'a> {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Content::ExecCode(code) => &code.span,
            Content::TextRun(run) => &run.span,
        }
    }

    pub fn raw(&self) -> &'a str {
        match self {
            Content::ExecCode(code) => code.raw,
            Content::TextRun(run) => run.raw,
        }
    }
}

/// A fenced `python:testflows` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecCode<'a> {
    /// From the fence-start line through the fence-end line.
    pub span: Range<usize>,
    pub raw: &'a str,
    /// The lines between the fences, verbatim.
    pub code: &'a str,
    pub code_span: Range<usize>,
}

/// A paragraph, or a run of blank lines.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun<'a> {
    pub span: Range<usize>,
    pub raw: &'a str,
}

impl TextRun<'_> {
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Header,
    Intro,
    Section,
    Heading,
    ExecCode,
    TextRun,
}

/// A borrowed view of any node in the tree.
#[derive(Debug, Clone, Copy)]
pub enum ParseNode<'t, 'a> {
    Header(&'t Header<'a>),
    Intro(&'t Intro<'a>),
    Section(&'t Section<'a>),
    Heading(&'t Heading<'a>),
    ExecCode(&'t ExecCode<'a>),
    TextRun(&'t TextRun<'a>),
}

impl<'t, 'a> ParseNode<'t, 'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            ParseNode::Header(_) => NodeKind::Header,
            ParseNode::Intro(_) => NodeKind::Intro,
            ParseNode::Section(_) => NodeKind::Section,
            ParseNode::Heading(_) => NodeKind::Heading,
            ParseNode::ExecCode(_) => NodeKind::ExecCode,
            ParseNode::TextRun(_) => NodeKind::TextRun,
        }
    }

    pub fn span(&self) -> &'t Range<usize> {
        match *self {
            ParseNode::Header(n) => &n.span,
            ParseNode::Intro(n) => &n.span,
            ParseNode::Section(n) => &n.span,
            ParseNode::Heading(n) => &n.span,
            ParseNode::ExecCode(n) => &n.span,
            ParseNode::TextRun(n) => &n.span,
        }
    }

    pub fn byte_offset(&self) -> usize {
        self.span().start
    }

    pub fn raw_text(&self) -> &'a str {
        match *self {
            ParseNode::Header(n) => n.raw,
            ParseNode::Intro(n) => n.raw,
            ParseNode::Section(n) => n.raw,
            ParseNode::Heading(n) => n.raw,
            ParseNode::ExecCode(n) => n.raw,
            ParseNode::TextRun(n) => n.raw,
        }
    }

    /// Heading level, for sections and headings.
    pub fn level(&self) -> Option<usize> {
        match self {
            ParseNode::Section(n) => Some(n.heading.level),
            ParseNode::Heading(n) => Some(n.level),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&'t str> {
        match *self {
            ParseNode::Section(n) => Some(&n.heading.title),
            ParseNode::Heading(n) => Some(&n.title),
            _ => None,
        }
    }
}

impl<'t, 'a> From<&'t Content<'a>> for ParseNode<'t, 'a> {
    fn from(content: &'t Content<'a>) -> Self {
        match content {
            Content::ExecCode(code) => ParseNode::ExecCode(code),
            Content::TextRun(run) => ParseNode::TextRun(run),
        }
    }
}
