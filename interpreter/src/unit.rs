use tfd::{ExecCode, NodeKind, ParseNode, SourceDocument};

/// One fragment ready to hand to a runner.
///
/// Built right before dispatch and dropped right after, on success and on
/// failure alike.
#[derive(Debug, Clone)]
pub struct ExecutionUnit<'t, 'a> {
    /// Synthetic file name, `<document:line>`.
    pub name: String,
    pub source_text: String,
    /// The node the fragment was built from.
    pub origin: ParseNode<'t, 'a>,
    /// Newlines in the document before the origin node.
    pub line_offset: usize,
    /// Lines stripped from the front of the origin: 1 for the fence-start
    /// line of a code block, 0 otherwise.
    pub code_offset: usize,
}

impl<'t, 'a> ExecutionUnit<'t, 'a> {
    /// A unit emitting `text` verbatim, attributed to `origin`.
    pub fn text(origin: ParseNode<'t, 'a>, text: &str, source: &SourceDocument) -> Self {
        Self::build(origin, text_statement(text), 0, source)
    }

    /// A unit running the lines between the fences of `code`.
    pub fn code(code: &'t ExecCode<'a>, source: &SourceDocument) -> Self {
        Self::build(ParseNode::ExecCode(code), code.code.to_string(), 1, source)
    }

    fn build(
        origin: ParseNode<'t, 'a>,
        source_text: String,
        code_offset: usize,
        source: &SourceDocument,
    ) -> Self {
        let line_offset = source.line_offset(origin.byte_offset());
        ExecutionUnit {
            name: format!("<{}:{}>", source.name(), line_offset + 1),
            source_text,
            origin,
            line_offset,
            code_offset,
        }
    }

    pub fn is_code(&self) -> bool {
        self.origin.kind() == NodeKind::ExecCode
    }

    /// 1-based document line of the origin's first line.
    pub fn first_line(&self) -> usize {
        self.line_offset + 1
    }
}

/// Wrap literal text as a single-line statement that emits it unchanged.
///
/// The text becomes an f-string, so braces are doubled and quotes,
/// backslashes and line breaks escaped.
pub fn text_statement(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 20);
    out.push_str("text(f\"");
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '{' => out.push_str("{{"),
            '}' => out.push_str("}}"),
            c => out.push(c),
        }
    }
    out.push_str("\", end=\"\")\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tfd::Parser;

    #[rstest]
    #[case("plain\n", r#"text(f"plain\n", end="")"#)]
    #[case("{x} }{", r#"text(f"{{x}} }}{{", end="")"#)]
    #[case("say \"hi\" \\o/", r#"text(f"say \"hi\" \\o/", end="")"#)]
    fn wraps_text(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(text_statement(text), format!("{}\n", expected));
    }

    #[test]
    fn code_unit_offsets() {
        let source = SourceDocument::new("doc.tfd", "# A\n\n```python:testflows\nx = 1\n```\n");
        let doc = Parser::new(source.text(), 0).parse().unwrap();
        let tfd::Content::ExecCode(code) = &doc.sections[0].children[1] else {
            panic!("expected exec code");
        };
        let unit = ExecutionUnit::code(code, &source);
        assert_eq!(unit.line_offset, 2);
        assert_eq!(unit.code_offset, 1);
        assert_eq!(unit.first_line(), 3);
        assert_eq!(unit.source_text, "x = 1\n");
        assert_eq!(unit.name, "<doc.tfd:3>");
        assert!(unit.is_code());
    }

    #[test]
    fn text_unit_offsets() {
        let source = SourceDocument::new("doc.tfd", "# A\nbody\n");
        let doc = Parser::new(source.text(), 0).parse().unwrap();
        let tfd::Content::TextRun(run) = &doc.sections[0].children[0] else {
            panic!("expected text run");
        };
        let unit = ExecutionUnit::text(ParseNode::TextRun(run), run.raw, &source);
        assert_eq!(unit.line_offset, 1);
        assert_eq!(unit.code_offset, 0);
        assert!(!unit.is_code());
    }
}
