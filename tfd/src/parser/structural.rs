use std::ops::Range;

use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::grammar;
use crate::parser::title::plain_title;
use crate::tree::{
    Content, Document, ExecCode, Header, Heading, HeadingStyle, Intro, Section, TextRun,
};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a whole document:
///
/// ```text
/// document = [header] intro {section} EOF
/// intro    = {exec_code | text_run}          (no heading)
/// section  = heading {exec_code | text_run}  (up to the next heading)
/// ```
pub fn parse_document(source: &str, file_id: usize) -> Result<Document<'_>, ParseError> {
    let start = if source.starts_with('\u{feff}') {
        '\u{feff}'.len_utf8()
    } else {
        0
    };

    let lines = split_lines(source, start);
    let mut state = ParseState::new(source, file_id, &lines, start);

    let header = state.header()?;
    let intro = state.intro()?;
    let mut sections = Vec::new();
    while let Some((heading, consumed)) = state.heading_at(state.pos) {
        state.pos += consumed;
        sections.push(state.section(heading)?);
    }

    debug_assert!(state.at_end(), "every line belongs to a node");
    Ok(Document {
        header,
        intro,
        sections,
    })
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// One physical line of the source.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    /// Offset of the first character.
    start: usize,
    /// Offset just past the newline (or the end of input).
    end: usize,
    /// Content without the newline.
    text: &'a str,
}

fn split_lines(source: &str, from: usize) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = from;

    while start < source.len() {
        let rest = &source[start..];
        let (text, end) = match rest.find('\n') {
            Some(newline) => (&rest[..newline], start + newline + 1),
            None => (rest, source.len()),
        };
        lines.push(Line { start, end, text });
        start = end;
    }

    lines
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState<'a, 'l> {
    source: &'a str,
    file_id: usize,
    lines: &'l [Line<'a>],
    /// Index of the next unconsumed line.
    pos: usize,
    /// Offset where the body begins (after a BOM).
    body_start: usize,
}

impl<'a, 'l> ParseState<'a, 'l> {
    fn new(source: &'a str, file_id: usize, lines: &'l [Line<'a>], body_start: usize) -> Self {
        ParseState {
            source,
            file_id,
            lines,
            pos: 0,
            body_start,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    /// Offset of the next unconsumed character.
    fn offset(&self) -> usize {
        self.lines
            .get(self.pos)
            .map(|line| line.start)
            .unwrap_or(self.source.len())
    }

    fn slice(&self, span: &Range<usize>) -> &'a str {
        &self.source[span.clone()]
    }

    /// `header = header_sep {!header_sep line} header_sep`
    fn header(&mut self) -> Result<Option<Header<'a>>, ParseError> {
        let Some(open) = self.lines.first() else {
            return Ok(None);
        };
        if !grammar::is_header_separator(open.text) {
            return Ok(None);
        }

        let Some(close_index) = self.lines[1..]
            .iter()
            .position(|line| grammar::is_header_separator(line.text))
            .map(|index| index + 1)
        else {
            return Err(ParseError::new(
                ParseErrorKind::UnterminatedHeader,
                "unterminated document header",
                open.start..open.start + open.text.len(),
                self.file_id,
            )
            .with_note("a header opened with `---` must be closed by another `---` line"));
        };

        let close = self.lines[close_index];
        let span = open.start..close.end;
        let body = open.end..close.start;
        log::trace!("header at {:?}", span);

        self.pos = close_index + 1;
        Ok(Some(Header {
            raw: self.slice(&span),
            body: self.slice(&body),
            span,
        }))
    }

    fn intro(&mut self) -> Result<Intro<'a>, ParseError> {
        let start = if self.pos == 0 {
            self.body_start
        } else {
            self.offset()
        };
        let children = self.contents()?;
        let span = start..self.offset();
        Ok(Intro {
            raw: self.slice(&span),
            span,
            children,
        })
    }

    fn section(&mut self, heading: Heading<'a>) -> Result<Section<'a>, ParseError> {
        let start = heading.span.start;
        let children = self.contents()?;
        let span = start..self.offset();
        Ok(Section {
            heading,
            children,
            raw: self.slice(&span),
            span,
        })
    }

    /// `{!heading (exec_code | text_run)}`
    fn contents(&mut self) -> Result<Vec<Content<'a>>, ParseError> {
        let mut children = Vec::new();

        while !self.at_end() && self.heading_at(self.pos).is_none() {
            let line = self.lines[self.pos];
            if grammar::is_exec_code_start(line.text) {
                children.push(Content::ExecCode(self.exec_code()?));
            } else {
                children.push(Content::TextRun(self.text_run()));
            }
        }

        Ok(children)
    }

    /// `exec_code = exec_code_start {!exec_code_end line} exec_code_end`
    fn exec_code(&mut self) -> Result<ExecCode<'a>, ParseError> {
        let open = self.lines[self.pos];

        let Some(close_index) = self.lines[self.pos + 1..]
            .iter()
            .position(|line| grammar::is_exec_code_end(line.text))
            .map(|index| self.pos + 1 + index)
        else {
            return Err(ParseError::new(
                ParseErrorKind::UnterminatedFence,
                "unterminated executable code block",
                open.start..open.start + open.text.len(),
                self.file_id,
            )
            .with_note("close the block with a line containing only ``` or ~~~"));
        };

        let close = self.lines[close_index];
        let span = open.start..close.end;
        let code_span = open.end..close.start;
        log::trace!("exec code at {:?}", span);

        self.pos = close_index + 1;
        Ok(ExecCode {
            raw: self.slice(&span),
            code: self.slice(&code_span),
            span,
            code_span,
        })
    }

    /// A paragraph of non-blank lines, or a run of blank lines.
    fn text_run(&mut self) -> TextRun<'a> {
        let first = self.lines[self.pos];
        let blank = grammar::is_blank(first.text);
        self.pos += 1;

        while let Some(line) = self.lines.get(self.pos) {
            if grammar::is_blank(line.text) != blank
                || grammar::is_exec_code_start(line.text)
                || self.heading_at(self.pos).is_some()
            {
                break;
            }
            self.pos += 1;
        }

        let span = first.start..self.offset();
        TextRun {
            raw: self.slice(&span),
            span,
        }
    }

    /// The heading starting at line `index`, with the number of lines it spans.
    ///
    /// ```text
    /// heading = ws* '#'+ ws+ title
    ///         | title NEWLINE ('=' | '-')+ ws*
    /// ```
    fn heading_at(&self, index: usize) -> Option<(Heading<'a>, usize)> {
        let line = self.lines.get(index)?;

        if let Some((level, title)) = grammar::atx_heading(line.text) {
            let span = line.start..line.end;
            return Some((
                Heading {
                    level,
                    title: plain_title(title),
                    style: HeadingStyle::Atx,
                    raw: self.slice(&span),
                    span,
                },
                1,
            ));
        }

        if grammar::is_blank(line.text) {
            return None;
        }
        let underline = self.lines.get(index + 1)?;
        let level = grammar::setext_underline(underline.text)?;
        let span = line.start..underline.end;
        Some((
            Heading {
                level,
                title: plain_title(line.text),
                style: HeadingStyle::Setext,
                raw: self.slice(&span),
                span,
            },
            2,
        ))
    }
}
