use interpreter::{
    ErrorAction, ExecutionError, FailureKind, FragmentError, Host, HostError, MarkdownWriter,
    RunSummary, ScopeHandle, ScopeInfo, execute_source,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tfd::SourceDocument;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Open(String),
    Emit(String),
    Close(String),
}

#[derive(Default)]
struct RecordingHost {
    events: Vec<Event>,
    open: Vec<(ScopeHandle, String)>,
    next: usize,
    action: ErrorAction,
    errors: Vec<FragmentError>,
    fatal: Vec<String>,
    fail_emit: bool,
}

impl RecordingHost {
    fn with_action(action: ErrorAction) -> Self {
        RecordingHost {
            action,
            ..Default::default()
        }
    }
}

impl Host for RecordingHost {
    fn open_scope(&mut self, info: &ScopeInfo) -> Result<ScopeHandle, HostError> {
        self.next += 1;
        let handle = ScopeHandle(self.next);
        self.open.push((handle, info.path.clone()));
        self.events.push(Event::Open(info.path.clone()));
        Ok(handle)
    }

    fn close_scope(&mut self, handle: ScopeHandle) -> Result<(), HostError> {
        match self.open.pop() {
            Some((top, path)) if top == handle => {
                self.events.push(Event::Close(path));
                Ok(())
            }
            _ => Err(HostError::Rejected("out of order close".into())),
        }
    }

    fn emit_text(&mut self, text: &str) -> Result<(), HostError> {
        if self.fail_emit {
            return Err(HostError::Io(std::io::Error::other("disk full")));
        }
        self.events.push(Event::Emit(text.to_string()));
        Ok(())
    }

    fn report_recoverable_error(&mut self, error: &FragmentError) -> ErrorAction {
        self.errors.push(error.clone());
        self.action
    }

    fn report_fatal_error(&mut self, message: &str) {
        self.fatal.push(message.to_string());
    }
}

fn record(source: &str, host: &mut RecordingHost) -> Result<RunSummary, ExecutionError> {
    execute_source(&SourceDocument::new("doc.tfd", source), host)
}

fn render(source: &str) -> (Result<RunSummary, ExecutionError>, String) {
    render_with(source, ErrorAction::Halt)
}

fn render_with(source: &str, action: ErrorAction) -> (Result<RunSummary, ExecutionError>, String) {
    let mut writer = MarkdownWriter::new(Vec::new()).with_error_action(action);
    let result = execute_source(&SourceDocument::new("doc.tfd", source), &mut writer);
    (result, String::from_utf8(writer.into_inner()).unwrap())
}

fn open(path: &str) -> Event {
    Event::Open(path.to_string())
}

fn emit(text: &str) -> Event {
    Event::Emit(text.to_string())
}

fn close(path: &str) -> Event {
    Event::Close(path.to_string())
}

#[test]
fn emission_sequence_follows_headings() {
    let mut host = RecordingHost::default();
    record("# A\ntext1\n## B\ntext2\n# C\ntext3\n", &mut host).unwrap();
    assert_eq!(
        host.events,
        vec![
            open("/A"),
            emit("text1\n"),
            open("/A/B"),
            emit("text2\n"),
            close("/A/B"),
            close("/A"),
            open("/C"),
            emit("text3\n"),
            close("/C"),
        ]
    );
}

#[test]
fn skipped_heading_levels_use_placeholders() {
    let mut host = RecordingHost::default();
    let summary = record("# A\n### C\n## B\n", &mut host).unwrap();
    assert_eq!(
        host.events,
        vec![
            open("/A"),
            open("/A/C"),
            close("/A/C"),
            open("/A/B"),
            close("/A/B"),
            close("/A"),
        ]
    );
    assert_eq!(summary.sections, 3);
}

#[test]
fn header_runs_in_its_own_scope() {
    let mut host = RecordingHost::default();
    record("---\ntitle: x\n---\n# A\nbody\n", &mut host).unwrap();
    assert_eq!(
        host.events,
        vec![
            open("/header"),
            emit("---\ntitle: x\n---\n"),
            close("/header"),
            open("/A"),
            emit("body\n"),
            close("/A"),
        ]
    );
}

#[test]
fn header_only_document_is_valid() {
    let mut host = RecordingHost::default();
    let summary = record("---\nk: v\n---\n", &mut host).unwrap();
    assert_eq!(summary.units, 1);
    assert!(host.fatal.is_empty());
}

#[test]
fn runtime_error_reports_document_line() {
    let mut source = "filler\n".repeat(39);
    source.push_str("```python:testflows\nx = 1\nraise ValueError(\"x\")\n```\n");

    let mut host = RecordingHost::default();
    let err = record(&source, &mut host).unwrap_err();

    let ExecutionError::Fragment(error) = err else {
        panic!("expected a fragment error, got {:?}", err);
    };
    assert_eq!(error.kind, FailureKind::Runtime);
    assert_eq!(error.exception, "ValueError");
    assert_eq!(error.line, 42);
    assert_eq!(
        error.listing,
        "  40|  ```python:testflows\n  41|  x = 1\n  42|> raise ValueError(\"x\")\n  43|  ```"
    );
    assert!(error.message().starts_with("runtime error: ValueError: x"));
    assert_eq!(host.errors.len(), 1);
    assert!(host.fatal.is_empty());
}

#[test]
fn syntax_errors_are_distinguished() {
    let mut host = RecordingHost::default();
    let err = record("# A\n```python:testflows\nif x\n```\n", &mut host).unwrap_err();
    let ExecutionError::Fragment(error) = err else {
        panic!("expected a fragment error, got {:?}", err);
    };
    assert_eq!(error.kind, FailureKind::Syntax);
    assert_eq!(error.exception, "SyntaxError");
    assert_eq!(error.line, 3);
    assert!(error.summary().starts_with("syntax error: SyntaxError"));
    // Halting still closes the open section.
    assert_eq!(host.events, vec![open("/A"), close("/A")]);
}

#[test]
fn braces_and_quotes_are_emitted_verbatim() {
    let text = "use {x} and }} {{ with \"quotes\" and a \\ slash\n";
    let (result, output) = render(&format!("# A\n{}", text));
    result.unwrap();
    assert_eq!(output, format!("# A\n{}", text));
}

#[rstest]
#[case::crlf("one\r\ntwo\r\n\r\nthree\r\n")]
#[case::bare_carriage_return("progress 10%\rprogress 100%\n")]
#[case::tabs("col\tcol\n\tindented\n\n\t\n")]
#[case::quotes_and_backslashes("said \"hi\" and 'bye', \\n stays, \\\\ and \\\" too\n")]
#[case::multibyte("naïve café, 日本語, 🚀 ∑ ☃\n")]
#[case::format_lookalikes("{0:>5} {{}} {name!r} }}{{ {\n")]
#[case::control_characters("nul \0 bell \x07 form\x0cfeed\n")]
#[case::no_final_newline("last line")]
fn text_round_trips_byte_for_byte(#[case] text: &str) {
    let source = format!("# A\n{}", text);
    let (result, output) = render(&source);
    result.unwrap();
    assert_eq!(output, source);
}

#[test]
fn crlf_document_renders_unchanged() {
    let source = "Intro\r\n\r\n# A\r\nbody\r\n```python:testflows\r\nprint(self.name)\r\n```\r\n## B\r\nmore\r\n";
    let (result, output) = render(source);
    result.unwrap();
    assert_eq!(output, "Intro\r\n\r\n# A\r\nbody\r\nA\n## B\r\nmore\r\n");
}

#[test]
fn oversized_repetition_is_a_recoverable_error() {
    let source = "# A\n```python:testflows\nok = 1\nbig = 'ab' * 9223372036854775807\n```\n# B\ntail\n";
    let mut host = RecordingHost::with_action(ErrorAction::Continue);
    let summary = record(source, &mut host).unwrap();
    assert_eq!(summary.errors, 1);
    assert_eq!(host.errors[0].exception, "MemoryError");
    assert_eq!(host.errors[0].kind, FailureKind::Runtime);
    assert_eq!(host.errors[0].line, 4);
    assert!(host.events.contains(&emit("tail\n")));
}

#[test]
fn deeply_nested_expression_is_a_syntax_error() {
    let source = format!(
        "# A\n```python:testflows\nx = {}1{}\n```\n",
        "(".repeat(50_000),
        ")".repeat(50_000)
    );
    let mut host = RecordingHost::default();
    let err = record(&source, &mut host).unwrap_err();
    let ExecutionError::Fragment(error) = err else {
        panic!("expected a fragment error, got {:?}", err);
    };
    assert_eq!(error.kind, FailureKind::Syntax);
    assert_eq!(error.line, 3);
}

#[test]
fn empty_input_fails_before_parsing() {
    let mut host = RecordingHost::default();
    let err = record("", &mut host).unwrap_err();
    assert!(matches!(err, ExecutionError::EmptyInput));
    assert_eq!(host.fatal, vec!["empty document".to_string()]);
    assert!(host.events.is_empty());
}

#[test]
fn unclosed_fence_is_a_parse_error() {
    let mut host = RecordingHost::default();
    let err = record("# A\n```python:testflows\nx = 1\n", &mut host).unwrap_err();
    assert!(matches!(err, ExecutionError::Parse(_)));
    assert!(!err.is_fragment());
    assert_eq!(host.fatal.len(), 1);
    assert!(host.events.is_empty());
}

const FAILING: &str = "# A\n```python:testflows\nfail(\"one\")\n```\nafter\n# B\ntail\n";

#[test]
fn halt_stops_the_run() {
    let (result, output) = render_with(FAILING, ErrorAction::Halt);
    assert!(result.unwrap_err().is_fragment());
    assert_eq!(output, "# A\n");
}

#[test]
fn skip_section_resumes_at_next_heading() {
    let (result, output) = render_with(FAILING, ErrorAction::SkipSection);
    assert_eq!(result.unwrap().errors, 1);
    assert_eq!(output, "# A\n# B\ntail\n");
}

#[test]
fn continue_runs_remaining_nodes() {
    let (result, output) = render_with(FAILING, ErrorAction::Continue);
    assert_eq!(result.unwrap().errors, 1);
    assert_eq!(output, "# A\nafter\n# B\ntail\n");
}

#[test]
fn output_errors_are_fatal() {
    let mut host = RecordingHost {
        fail_emit: true,
        ..Default::default()
    };
    let err = record("# A\ntext\n", &mut host).unwrap_err();
    assert!(matches!(err, ExecutionError::Output(_)));
    assert_eq!(host.fatal.len(), 1);
    assert_eq!(host.events, vec![open("/A"), close("/A")]);
}

#[test]
fn environment_is_shared_across_sections() {
    let (result, output) = render(
        "# A\n```python:testflows\nx = 2\n```\n# B\n```python:testflows\nprint(x * 21)\n```\n",
    );
    result.unwrap();
    assert_eq!(output, "# A\n# B\n42\n");
}

#[test]
fn self_is_the_current_scope() {
    let (result, output) = render(
        "```python:testflows\nprint(self.path)\n```\n# A\n## B\n```python:testflows\nprint(self.path, self.level, self.name)\n```\n",
    );
    result.unwrap();
    assert_eq!(output, "/\n# A\n## B\n/A/B 2 B\n");
}

#[test]
fn markdown_round_trip() {
    let source = "---\nk: v\n---\nIntro text.\n\n# Title\n```python:testflows\nfor i in range(2):\n    print(f\"item {i}\")\n```\nDone.\n\nSetext\n------\n~~~python:testflows\ntext(\"a\", end=\"\")\ntext(\"b\")\n~~~\n";
    let (result, output) = render(source);
    let summary = result.unwrap();
    assert_eq!(
        output,
        "---\nk: v\n---\nIntro text.\n\n# Title\nitem 0\nitem 1\nDone.\n\nSetext\n------\nab\n"
    );
    assert_eq!(summary.code_units, 2);
    assert_eq!(summary.sections, 2);
}
