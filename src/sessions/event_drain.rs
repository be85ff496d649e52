use std::collections::vec_deque::Drain;
use std::iter::FusedIterator;

use crate::LiveboardEvent;

/// A zero-allocation opaque iterator that drains events from a session.
///
/// This is the session's subscription point: it fires (yields) once for
/// every change to the canonical record or the connection since the last
/// drain. Wrapping the internal `VecDeque` drain keeps
/// `std::collections::vec_deque::Drain` out of the public API.
///
/// Obtain one from [`GameSession::events()`].
///
/// # Examples
///
/// ```ignore
/// for event in session.events() {
///     match event {
///         LiveboardEvent::RecordUpdated { .. } => redraw_board(),
///         LiveboardEvent::MoveRolledBack { .. } => flash_revert(),
///         _ => {}
///     }
/// }
/// ```
///
/// [`GameSession::events()`]: crate::GameSession::events
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct EventDrain<'a> {
    inner: Drain<'a, LiveboardEvent>,
}

impl<'a> EventDrain<'a> {
    pub(crate) fn from_drain(inner: Drain<'a, LiveboardEvent>) -> Self {
        Self { inner }
    }
}

impl Iterator for EventDrain<'_> {
    type Item = LiveboardEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for EventDrain<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl ExactSizeIterator for EventDrain<'_> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl FusedIterator for EventDrain<'_> {}

impl std::fmt::Debug for EventDrain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDrain")
            .field("remaining", &self.len())
            .finish()
    }
}
