use pulldown_cmark::{Event, Parser as CmarkParser, Tag, TagEnd};

/// Plain-text title of a heading, used as the scope name.
///
/// The raw title is read as the inline content of a Markdown heading so that
/// emphasis, code spans, links and closing `#` sequences are reduced to their
/// text. Titles made only of markup fall back to the raw text.
pub(crate) fn plain_title(raw: &str) -> String {
    let heading = format!("# {}", raw.trim());
    let mut text = String::new();
    let mut in_heading = false;

    for event in CmarkParser::new(&heading) {
        match event {
            Event::Start(Tag::Heading { .. }) => in_heading = true,
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(s) | Event::Code(s) if in_heading => text.push_str(&s),
            Event::SoftBreak | Event::HardBreak if in_heading => text.push(' '),
            _ => {}
        }
    }

    let title = normalize_title(&text);
    if title.is_empty() {
        normalize_title(raw)
    } else {
        title
    }
}

/// Strip leading/trailing whitespace and collapse interior whitespace.
fn normalize_title(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Plain title", "Plain title")]
    #[case("  spaced   out\r", "spaced out")]
    #[case("The *big* `test`", "The big test")]
    #[case("1. Overview", "1. Overview")]
    #[case("[link](http://example.com) text", "link text")]
    #[case("Closing hashes ##", "Closing hashes")]
    #[case("<br>", "<br>")]
    fn titles(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(plain_title(raw), expected);
    }
}
