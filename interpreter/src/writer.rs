use std::io::Write;

use crate::error_mapper::FragmentError;
use crate::host::{ErrorAction, Host, HostError, ScopeHandle, ScopeInfo};

/// Host that renders a run back to Markdown.
///
/// Headings are written as they appear in the source when their scope
/// opens and emitted text is written as is, so the output is the input
/// document with every executable block replaced by what it produced.
/// Reported errors are kept for the caller to render.
pub struct MarkdownWriter<W: Write> {
    out: W,
    on_error: ErrorAction,
    next_handle: usize,
    open: Vec<(ScopeHandle, String)>,
    errors: Vec<FragmentError>,
    fatal: Vec<String>,
}

impl<W: Write> MarkdownWriter<W> {
    pub fn new(out: W) -> Self {
        MarkdownWriter {
            out,
            on_error: ErrorAction::default(),
            next_handle: 0,
            open: Vec::new(),
            errors: Vec::new(),
            fatal: Vec::new(),
        }
    }

    /// Answer every reported fragment error with `action`.
    pub fn with_error_action(mut self, action: ErrorAction) -> Self {
        self.on_error = action;
        self
    }

    /// Fragment errors reported so far, in order.
    pub fn errors(&self) -> &[FragmentError] {
        &self.errors
    }

    pub fn fatal_errors(&self) -> &[String] {
        &self.fatal
    }

    /// Number of scopes currently open.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn flush(&mut self) -> Result<(), HostError> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Host for MarkdownWriter<W> {
    fn open_scope(&mut self, info: &ScopeInfo) -> Result<ScopeHandle, HostError> {
        log::debug!("open scope {} (level {})", info.path, info.level);
        if let Some(heading) = &info.heading {
            self.out.write_all(heading.as_bytes())?;
        }
        let handle = ScopeHandle(self.next_handle);
        self.next_handle += 1;
        self.open.push((handle, info.path.clone()));
        Ok(handle)
    }

    fn close_scope(&mut self, handle: ScopeHandle) -> Result<(), HostError> {
        match self.open.last() {
            Some((top, path)) if *top == handle => {
                log::debug!("close scope {}", path);
                self.open.pop();
                Ok(())
            }
            _ => Err(HostError::Rejected(format!(
                "scope handle {} is not the innermost open scope",
                handle.0
            ))),
        }
    }

    fn emit_text(&mut self, text: &str) -> Result<(), HostError> {
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }

    fn report_recoverable_error(&mut self, error: &FragmentError) -> ErrorAction {
        log::warn!("{} ({})", error.summary(), self.on_error);
        self.errors.push(error.clone());
        self.on_error
    }

    fn report_fatal_error(&mut self, message: &str) {
        log::error!("{}", message);
        self.fatal.push(message.to_string());
    }
}
