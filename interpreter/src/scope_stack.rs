use crate::host::{Host, HostError, ScopeHandle, ScopeInfo};

/// One level of the open-scope stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeEntry {
    /// A scope opened through the host.
    Real {
        level: usize,
        handle: ScopeHandle,
        info: ScopeInfo,
    },
    /// Fills a level skipped by a deeper heading. The host never sees it.
    Placeholder { level: usize },
}

impl ScopeEntry {
    pub fn level(&self) -> usize {
        match self {
            ScopeEntry::Real { level, .. } | ScopeEntry::Placeholder { level } => *level,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ScopeEntry::Placeholder { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("cannot close {requested} scope(s) with only {open} open")]
    Underflow { requested: usize, open: usize },
    #[error("heading level must be at least 1")]
    InvalidLevel,
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Stack of open section scopes, one entry per level `1..=current_level`.
///
/// Level 0 is the document itself and is never on the stack.
#[derive(Debug, Default)]
pub struct ScopeStack {
    entries: Vec<ScopeEntry>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_level(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ScopeEntry] {
        &self.entries
    }

    /// The innermost real scope.
    pub fn current(&self) -> Option<&ScopeInfo> {
        self.entries.iter().rev().find_map(|entry| match entry {
            ScopeEntry::Real { info, .. } => Some(info),
            ScopeEntry::Placeholder { .. } => None,
        })
    }

    /// Path of a scope named `name` opened on top of the current real scopes.
    fn path_for(&self, name: &str) -> String {
        let mut path = String::new();
        for entry in &self.entries {
            if let ScopeEntry::Real { info, .. } = entry {
                path.push('/');
                path.push_str(&info.name);
            }
        }
        path.push('/');
        path.push_str(name);
        path
    }

    /// Reconcile the stack for a heading of `level` and open its scope.
    ///
    /// A deeper heading pushes placeholders for every skipped level; a
    /// heading at or above the current level first closes everything down
    /// to its parent. If the host refuses to open the scope, no
    /// placeholders are left behind.
    pub fn enter(
        &mut self,
        level: usize,
        name: &str,
        heading: Option<&str>,
        host: &mut dyn Host,
    ) -> Result<ScopeHandle, ScopeError> {
        if level == 0 {
            return Err(ScopeError::InvalidLevel);
        }

        let current = self.current_level();
        if level <= current {
            self.pop(current - level + 1, host)?;
        }

        let info = ScopeInfo {
            name: name.to_string(),
            level,
            path: self.path_for(name),
            heading: heading.map(String::from),
        };
        let handle = host.open_scope(&info)?;

        for skipped in self.current_level() + 1..level {
            log::debug!("placeholder scope at level {}", skipped);
            self.entries.push(ScopeEntry::Placeholder { level: skipped });
        }
        self.entries.push(ScopeEntry::Real {
            level,
            handle,
            info,
        });

        debug_assert_eq!(self.current_level(), level);
        Ok(handle)
    }

    /// Pop `count` entries, closing the real ones through the host.
    pub fn pop(&mut self, count: usize, host: &mut dyn Host) -> Result<(), ScopeError> {
        if count > self.entries.len() {
            return Err(ScopeError::Underflow {
                requested: count,
                open: self.entries.len(),
            });
        }
        for _ in 0..count {
            if let Some(ScopeEntry::Real { handle, .. }) = self.entries.pop() {
                host.close_scope(handle)?;
            }
        }
        Ok(())
    }

    /// Close every open scope, innermost first.
    ///
    /// Every entry is popped even if the host fails; the first failure is
    /// returned.
    pub fn close_all(&mut self, host: &mut dyn Host) -> Result<(), ScopeError> {
        let mut first_error = None;
        while let Some(entry) = self.entries.pop() {
            if let ScopeEntry::Real { handle, .. } = entry {
                if let Err(e) = host.close_scope(handle) {
                    first_error.get_or_insert(ScopeError::Host(e));
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
