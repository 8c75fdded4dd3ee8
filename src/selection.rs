//! Selection tokens.
//!
//! Every aggregation started by a user selection is tagged with the token
//! current at that moment. A view only accepts results whose tag still
//! matches its current token, so a slow response for an earlier selection
//! cannot overwrite the view of a newer one. In-flight requests are not
//! cancelled; their results are simply dropped on arrival.

use serde::Serialize;
use tracing::debug;

/// Monotonically increasing per [`Selection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct SelectionToken(u64);

impl SelectionToken {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A result tagged with the selection that requested it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    pub token: SelectionToken,
    pub value: T,
}

impl<T> Tagged<T> {
    pub fn new(token: SelectionToken, value: T) -> Self {
        Self { token, value }
    }
}

/// View state owned by the current selection.
#[derive(Debug, Clone)]
pub struct Selection<V> {
    token: SelectionToken,
    view: V,
}

impl<V> Selection<V> {
    pub fn new(view: V) -> Self {
        Self {
            token: SelectionToken::default(),
            view,
        }
    }

    /// Start a new selection with a fresh view. Results tagged with any
    /// earlier token are rejected from now on.
    pub fn select(&mut self, view: V) -> SelectionToken {
        self.token = self.token.next();
        self.view = view;
        self.token
    }

    pub fn current(&self) -> SelectionToken {
        self.token
    }

    pub fn is_current(&self, token: SelectionToken) -> bool {
        self.token == token
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Apply a tagged result if it belongs to the current selection.
    /// Returns whether it was applied.
    pub fn apply<T>(&mut self, tagged: Tagged<T>, update: impl FnOnce(&mut V, T)) -> bool {
        if !self.is_current(tagged.token) {
            debug!(
                stale = tagged.token.value(),
                current = self.token.value(),
                "discarding result for superseded selection"
            );
            return false;
        }
        update(&mut self.view, tagged.value);
        true
    }
}
