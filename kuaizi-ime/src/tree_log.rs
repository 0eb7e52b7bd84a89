//! Nested debug logging.
//!
//! A [`TreeLog`] collects log lines into nested scopes while an operation
//! runs and renders the whole tree as one indented block when the outermost
//! scope ends:
//!
//! ```text
//! dispatch SingleTap
//!   key: a
//!   pinyin
//!     pending spelling: ni
//!     WARN: no candidates
//! ```
//!
//! The log is a plain value owned by the session and threaded through the
//! dispatch chain by `&mut`, so every session keeps its own tree and nothing
//! is shared between threads. Rendered trees go to `tracing` at debug level;
//! warnings are also forwarded to `tracing` as they are recorded.
//!
//! # Usage
//!
//! ```
//! use kuaizi_ime::TreeLog;
//!
//! let mut log = TreeLog::new();
//! {
//!     let mut scope = log.scope("outer");
//!     scope.debug("first");
//!     let mut inner = scope.scope("inner");
//!     inner.debug("second");
//! }
//! assert_eq!(log.last_rendered(), Some("outer\n  first\n  inner\n    second\n"));
//! ```

use std::{
    fmt::Write as _,
    ops::{Deref, DerefMut},
};

use tracing::{debug, warn};

#[derive(Debug, Clone)]
enum Line {
    Debug(String),
    Warn(String),
    Child(Scope),
}

#[derive(Debug, Clone)]
struct Scope {
    title: String,
    lines: Vec<Line>,
}

impl Scope {
    fn render(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let _ = writeln!(out, "{indent}{}", self.title);
        for line in &self.lines {
            match line {
                Line::Debug(text) => {
                    let _ = writeln!(out, "{indent}  {text}");
                }
                Line::Warn(text) => {
                    let _ = writeln!(out, "{indent}  WARN: {text}");
                }
                Line::Child(scope) => scope.render(depth + 1, out),
            }
        }
    }
}

/// A stack of open log scopes.
#[derive(Debug, Clone, Default)]
pub struct TreeLog {
    stack: Vec<Scope>,
    last_rendered: Option<String>,
}

impl TreeLog {
    /// Creates a log with no open scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Opens a nested scope.
    pub fn begin(&mut self, title: impl Into<String>) {
        self.stack.push(Scope {
            title: title.into(),
            lines: Vec::new(),
        });
    }

    /// Records a line in the innermost scope.
    ///
    /// Outside any scope the line goes to `tracing` directly.
    pub fn debug(&mut self, text: impl Into<String>) {
        let text = text.into();
        match self.stack.last_mut() {
            Some(scope) => scope.lines.push(Line::Debug(text)),
            None => debug!("{text}"),
        }
    }

    /// Records a warning in the innermost scope and forwards it to `tracing`.
    pub fn warn(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!("{text}");
        if let Some(scope) = self.stack.last_mut() {
            scope.lines.push(Line::Warn(text));
        }
    }

    /// Closes the innermost scope.
    ///
    /// Closing the outermost scope renders the tree, emits it and returns the
    /// rendered text. Closing with no open scope does nothing.
    pub fn end(&mut self) -> Option<String> {
        let scope = self.stack.pop()?;
        if let Some(parent) = self.stack.last_mut() {
            parent.lines.push(Line::Child(scope));
            return None;
        }

        let mut rendered = String::new();
        scope.render(0, &mut rendered);
        debug!(target: "kuaizi_ime::tree_log", "\n{rendered}");
        self.last_rendered = Some(rendered.clone());
        Some(rendered)
    }

    /// The last tree rendered by [`end`](Self::end).
    pub fn last_rendered(&self) -> Option<&str> {
        self.last_rendered.as_deref()
    }

    /// Opens a scope that closes when the returned guard is dropped.
    pub fn scope(&mut self, title: impl Into<String>) -> TreeLogScope<'_> {
        self.begin(title);
        TreeLogScope {
            log: self,
            ended: false,
        }
    }
}

/// Guard that closes a [`TreeLog`] scope on drop.
///
/// The guard dereferences to the log, so lines and nested scopes can be
/// recorded through it.
pub struct TreeLogScope<'a> {
    log: &'a mut TreeLog,
    ended: bool,
}

impl TreeLogScope<'_> {
    /// Closes the scope now, returning the rendered tree if it was the
    /// outermost one.
    pub fn end(mut self) -> Option<String> {
        self.ended = true;
        self.log.end()
    }
}

impl Deref for TreeLogScope<'_> {
    type Target = TreeLog;

    fn deref(&self) -> &Self::Target {
        self.log
    }
}

impl DerefMut for TreeLogScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.log
    }
}

impl Drop for TreeLogScope<'_> {
    fn drop(&mut self) {
        if !self.ended {
            self.ended = true;
            self.log.end();
        }
    }
}
