//! Router contract and an in-memory history implementation.

use std::sync::Mutex;

use tracing::debug;

/// Pre-login destination remembered when access to a protected path is denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationIntent {
    pub requested_path: String,
}

impl NavigationIntent {
    pub fn new(requested_path: impl Into<String>) -> Self {
        Self {
            requested_path: requested_path.into(),
        }
    }
}

/// How a navigation is recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
    /// Redirect-from hint carried by the new entry.
    pub intent: Option<NavigationIntent>,
}

impl NavigateOptions {
    pub fn push() -> Self {
        Self::default()
    }

    pub fn replace() -> Self {
        Self {
            replace: true,
            intent: None,
        }
    }

    pub fn with_intent(mut self, intent: NavigationIntent) -> Self {
        self.intent = Some(intent);
        self
    }
}

/// Navigation primitives consumed by the core.
pub trait Router: Send + Sync {
    fn current_path(&self) -> String;

    fn navigate(&self, path: &str, options: NavigateOptions);

    /// Remove and return the redirect-from hint of the current entry.
    fn take_intent(&self) -> Option<NavigationIntent>;
}

#[derive(Debug, Clone)]
struct Entry {
    path: String,
    intent: Option<NavigationIntent>,
}

#[derive(Debug)]
struct History {
    entries: Vec<Entry>,
    index: usize,
}

/// Browser-like history stack held in memory.
#[derive(Debug)]
pub struct HistoryRouter {
    history: Mutex<History>,
}

impl HistoryRouter {
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(History {
                entries: vec![Entry {
                    path: initial_path.into(),
                    intent: None,
                }],
                index: 0,
            }),
        }
    }

    /// Step back one entry. Returns the new current path, or `None` at the start.
    pub fn back(&self) -> Option<String> {
        let mut history = self.lock();
        if history.index == 0 {
            return None;
        }
        history.index -= 1;
        Some(history.entries[history.index].path.clone())
    }

    /// Step forward one entry, if one exists.
    pub fn forward(&self) -> Option<String> {
        let mut history = self.lock();
        if history.index + 1 >= history.entries.len() {
            return None;
        }
        history.index += 1;
        Some(history.entries[history.index].path.clone())
    }

    /// All paths in the history stack, oldest first.
    pub fn paths(&self) -> Vec<String> {
        self.lock().entries.iter().map(|e| e.path.clone()).collect()
    }

    /// Peek at the current entry's hint without consuming it.
    pub fn intent(&self) -> Option<NavigationIntent> {
        let history = self.lock();
        history.entries[history.index].intent.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for HistoryRouter {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Router for HistoryRouter {
    fn current_path(&self) -> String {
        let history = self.lock();
        history.entries[history.index].path.clone()
    }

    fn navigate(&self, path: &str, options: NavigateOptions) {
        let mut history = self.lock();
        let entry = Entry {
            path: path.to_string(),
            intent: options.intent,
        };
        if options.replace {
            let index = history.index;
            history.entries[index] = entry;
        } else {
            let keep = history.index + 1;
            history.entries.truncate(keep);
            history.entries.push(entry);
            history.index = keep;
        }
        debug!(path, replace = options.replace, "Navigated");
    }

    fn take_intent(&self) -> Option<NavigationIntent> {
        let mut history = self.lock();
        let index = history.index;
        history.entries[index].intent.take()
    }
}
