//! Undo/redo history over full workspace snapshots.
//!
//! The manager keeps a bounded, append-only log with a cursor. Each entry
//! stores the complete workspace before and after one action (deep copies,
//! not diffs), trading memory for the absence of divergence bugs across
//! repeated undo/redo. Recording while the cursor is behind the tail
//! truncates the abandoned redo branch, the standard linear-undo
//! discipline; exceeding the cap evicts the oldest entry FIFO.
//!
//! Any number of observers may subscribe; each record/undo/redo/clear that
//! changes history notifies all of them, and a panicking observer is
//! isolated so delivery continues to the rest.

use crate::workspace::{
    CanvasOrientation, CycleOutcome, GridId, NoteId, NoteRef, Point, Workspace,
};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Default maximum number of history entries to keep.
pub const MAX_HISTORY_SIZE: usize = 100;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The closed set of recordable user actions, each with its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateGrid { grid_id: GridId },
    RemoveGrid { grid_id: GridId },
    MoveGrid { grid_id: GridId, to: Point },
    UpdateGridConfig { grid_id: GridId },
    ToggleGridOrientation { grid_id: GridId },
    PlaceNote { note_id: NoteId },
    CycleNoteGroup { note_id: NoteId, outcome: CycleOutcome },
    RemoveNote { note_id: NoteId },
    SetRootNote { target: Option<NoteRef> },
    ToggleLock { locked: bool },
    ToggleCanvasOrientation { orientation: CanvasOrientation },
}

impl Action {
    /// Short human-readable description, used for status messages.
    pub fn description(&self) -> String {
        match self {
            Action::CreateGrid { .. } => "Create grid".to_string(),
            Action::RemoveGrid { .. } => "Remove grid".to_string(),
            Action::MoveGrid { .. } => "Move grid".to_string(),
            Action::UpdateGridConfig { .. } => "Change grid settings".to_string(),
            Action::ToggleGridOrientation { .. } => "Rotate grid".to_string(),
            Action::PlaceNote { note_id } => format!(
                "Place note (string {}, fret {})",
                note_id.string_index(),
                note_id.fret()
            ),
            Action::CycleNoteGroup {
                outcome: CycleOutcome::Removed,
                ..
            } => "Clear note".to_string(),
            Action::CycleNoteGroup { .. } => "Change note group".to_string(),
            Action::RemoveNote { .. } => "Remove note".to_string(),
            Action::SetRootNote { target: Some(_) } => "Set root note".to_string(),
            Action::SetRootNote { target: None } => "Clear root note".to_string(),
            Action::ToggleLock { locked: true } => "Lock canvas".to_string(),
            Action::ToggleLock { locked: false } => "Unlock canvas".to_string(),
            Action::ToggleCanvasOrientation { .. } => "Rotate canvas".to_string(),
        }
    }
}

/// One recorded action with the full workspace on either side of it.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Unique entry id.
    pub id: Uuid,

    /// Wall-clock time the action was recorded, in ms since the epoch.
    pub timestamp_ms: u64,

    /// What happened.
    pub action: Action,

    /// Deep copy of the workspace before the action.
    pub previous: Workspace,

    /// Deep copy of the workspace after the action.
    pub new: Workspace,
}

/// What just happened to the history log.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
    /// A new action was recorded.
    Recorded { description: String },
    /// An undo was applied.
    Undone { description: String },
    /// A redo was applied.
    Redone { description: String },
    /// The log was reset (document load, new document).
    Cleared,
}

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Observer = Box<dyn FnMut(&HistoryEvent) + Send>;

/// Linear undo/redo log with change fan-out.
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    /// Index of the entry whose `new` snapshot matches the live workspace;
    /// `None` when everything has been undone (or nothing recorded).
    cursor: Option<usize>,
    capacity: usize,
    subscribers: Vec<(SubscriberId, Observer)>,
    next_subscriber: u64,
}

impl fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryManager")
            .field("entries", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryManager {
    /// Creates an empty manager with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY_SIZE)
    }

    /// Creates an empty manager holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            capacity: capacity.max(1),
            subscribers: Vec::new(),
            next_subscriber: 0,
        }
    }

    /// Number of entries currently in the log.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The recorded entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Whether an undo is available.
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    /// Whether a redo is available.
    pub fn can_redo(&self) -> bool {
        match self.cursor {
            None => !self.entries.is_empty(),
            Some(c) => c + 1 < self.entries.len(),
        }
    }

    /// Records an action and its surrounding snapshots.
    ///
    /// Entries after the cursor (the redo branch) are discarded first. If
    /// the log then exceeds capacity the oldest entry is evicted and the
    /// cursor shifted so its relative position is preserved.
    pub fn record(&mut self, action: Action, previous: Workspace, new: Workspace) {
        match self.cursor {
            Some(c) => self.entries.truncate(c + 1),
            None => self.entries.clear(),
        }

        let description = action.description();
        self.entries.push(HistoryEntry {
            id: Uuid::new_v4(),
            timestamp_ms: now_millis(),
            action,
            previous,
            new,
        });
        self.cursor = Some(self.entries.len() - 1);

        while self.entries.len() > self.capacity {
            self.entries.remove(0);
            self.cursor = self.cursor.and_then(|c| c.checked_sub(1));
        }

        self.notify(&HistoryEvent::Recorded { description });
    }

    /// Steps the cursor back and returns the snapshot to restore, or `None`
    /// when there is nothing to undo (a no-op, not an error).
    pub fn undo(&mut self) -> Option<Workspace> {
        let c = self.cursor?;
        let entry = &self.entries[c];
        let snapshot = entry.previous.clone();
        let description = entry.action.description();
        self.cursor = c.checked_sub(1);
        self.notify(&HistoryEvent::Undone { description });
        Some(snapshot)
    }

    /// Steps the cursor forward and returns the snapshot to restore, or
    /// `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<Workspace> {
        let next = match self.cursor {
            None => 0,
            Some(c) => c + 1,
        };
        if next >= self.entries.len() {
            return None;
        }
        self.cursor = Some(next);
        let entry = &self.entries[next];
        let snapshot = entry.new.clone();
        let description = entry.action.description();
        self.notify(&HistoryEvent::Redone { description });
        Some(snapshot)
    }

    /// Resets the log. Used after a successful document load.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.notify(&HistoryEvent::Cleared);
    }

    /// Registers an observer called after every history change.
    pub fn subscribe(
        &mut self,
        observer: impl FnMut(&HistoryEvent) + Send + 'static,
    ) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        self.subscribers.push((id, Box::new(observer)));
        id
    }

    /// Removes an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Delivers `event` to every subscriber with a per-call error boundary:
    /// a panicking observer is logged and skipped, and can neither stop
    /// delivery to the remaining observers nor corrupt the log.
    fn notify(&mut self, event: &HistoryEvent) {
        for (id, observer) in &mut self.subscribers {
            if catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
                tracing::error!("history observer {:?} panicked on {:?}", id, event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn grid_action() -> Action {
        Action::CreateGrid {
            grid_id: GridId::new(),
        }
    }

    /// Snapshots of one editing timeline: `chain(n)[i]` is the workspace
    /// after `i` grid creations. Consecutive snapshots share grid ids, so
    /// equality checks across undo/redo are meaningful.
    fn chain(n: usize) -> Vec<Workspace> {
        let mut ws = Workspace::new();
        let mut states = vec![ws.clone()];
        for _ in 0..n {
            ws.create_grid(None).unwrap();
            states.push(ws.clone());
        }
        states
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = HistoryManager::new();
        let states = chain(1);
        let (before, after) = (states[0].clone(), states[1].clone());
        history.record(grid_action(), before.clone(), after.clone());

        assert!(history.can_undo());
        assert_eq!(history.undo(), Some(before.clone()));
        assert!(!history.can_undo());
        assert!(history.can_redo());

        assert_eq!(history.redo(), Some(after));
        assert!(!history.can_redo());
        assert!(history.can_undo());
    }

    #[test]
    fn test_round_trip_over_many_actions() {
        let mut history = HistoryManager::new();
        let states = chain(5);
        for pair in states.windows(2) {
            history.record(grid_action(), pair[0].clone(), pair[1].clone());
        }

        // Unwind all the way back, checking each restored snapshot.
        for i in (0..5).rev() {
            assert_eq!(history.undo(), Some(states[i].clone()));
        }
        assert_eq!(history.undo(), None);

        // Replay forward.
        for expected in states.iter().skip(1) {
            assert_eq!(history.redo(), Some(expected.clone()));
        }
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn test_boundaries_are_no_ops() {
        let mut history = HistoryManager::new();
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), None);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = HistoryManager::with_capacity(4);
        let states = chain(10);
        for i in 0..10 {
            history.record(grid_action(), states[i].clone(), states[i + 1].clone());
        }
        assert_eq!(history.len(), 4);

        // Only the most recent 4 actions are undoable.
        for i in (6..10).rev() {
            assert_eq!(history.undo(), Some(states[i].clone()));
        }
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn test_record_after_undo_stays_within_capacity() {
        let mut history = HistoryManager::with_capacity(3);
        let states = chain(4);
        for i in 0..3 {
            history.record(grid_action(), states[i].clone(), states[i + 1].clone());
        }
        history.undo();
        // Cursor is now one behind the tail; recording truncates the redo
        // branch first, so the log never exceeds capacity here.
        history.record(grid_action(), states[2].clone(), states[4].clone());
        assert_eq!(history.len(), 3);
        assert_eq!(history.undo(), Some(states[2].clone()));
    }

    #[test]
    fn test_new_action_discards_redo() {
        let mut history = HistoryManager::new();
        let states = chain(4);
        for i in 0..3 {
            history.record(grid_action(), states[i].clone(), states[i + 1].clone());
        }
        history.undo();
        history.undo();
        assert!(history.can_redo());

        history.record(grid_action(), states[1].clone(), states[4].clone());
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(history.undo(), Some(states[1].clone()));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut history = HistoryManager::new();
        let states = chain(1);
        history.record(grid_action(), states[0].clone(), states[1].clone());
        history.clear();
        assert!(history.is_empty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_subscribers_notified() {
        let mut history = HistoryManager::new();
        let events = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&events);
        history.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let states = chain(1);
        history.record(grid_action(), states[0].clone(), states[1].clone());
        history.undo();
        history.redo();
        history.clear();
        assert_eq!(events.load(Ordering::SeqCst), 4);

        // No-op undo/redo after clear do not notify.
        history.undo();
        history.redo();
        assert_eq!(events.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_panicking_subscriber_does_not_stop_delivery() {
        let mut history = HistoryManager::new();
        let delivered = Arc::new(AtomicUsize::new(0));

        history.subscribe(|_| panic!("observer bug"));
        let counter = Arc::clone(&delivered);
        history.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let states = chain(1);
        history.record(grid_action(), states[0].clone(), states[1].clone());
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
        // The log itself is intact.
        assert!(history.can_undo());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut history = HistoryManager::new();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        let id = history.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let states = chain(2);
        history.record(grid_action(), states[0].clone(), states[1].clone());
        assert!(history.unsubscribe(id));
        assert!(!history.unsubscribe(id));
        history.record(grid_action(), states[1].clone(), states[2].clone());
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_action_descriptions() {
        assert_eq!(grid_action().description(), "Create grid");
        assert_eq!(
            Action::SetRootNote { target: None }.description(),
            "Clear root note"
        );
        assert_eq!(
            Action::ToggleLock { locked: true }.description(),
            "Lock canvas"
        );
    }
}
