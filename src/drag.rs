//! Pointer-driven drag-reorder state machine.
//!
//! ```text
//! Idle --start--> Dragging --drag_over--> Dragging
//!                    |  \--cancel / drop off the marked column--> Idle
//!                    \--drop on the marked column--> Committing --> Idle
//! ```
//!
//! Geometry is supplied with every event and never cached; the only state
//! kept between events is the dragged id and the current insertion marker.

use crate::task::{MutationOutcome, TaskStatus, TaskStore};

/// Store operations a drop commits, in the order they are called
pub trait ReorderTarget {
    fn update_status(&mut self, id: &str, status: TaskStatus) -> MutationOutcome;

    fn move_to_position(&mut self, id: &str, status: TaskStatus, position: usize)
        -> MutationOutcome;
}

impl ReorderTarget for TaskStore {
    fn update_status(&mut self, id: &str, status: TaskStatus) -> MutationOutcome {
        TaskStore::update_status(self, id, status)
    }

    fn move_to_position(
        &mut self,
        id: &str,
        status: TaskStatus,
        position: usize,
    ) -> MutationOutcome {
        TaskStore::move_to_position(self, id, status, position)
    }
}

/// Vertical extent of one rendered card
#[derive(Debug, Clone, PartialEq)]
pub struct CardBounds {
    pub task_id: String,
    pub top: f64,
    pub height: f64,
}

impl CardBounds {
    pub fn new(task_id: impl Into<String>, top: f64, height: f64) -> Self {
        Self {
            task_id: task_id.into(),
            top,
            height,
        }
    }

    pub fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// A column under the pointer: its status tag and its cards in display order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DropSurface {
    pub status_tag: Option<String>,
    pub cards: Vec<CardBounds>,
}

impl DropSurface {
    pub fn new(status: TaskStatus, cards: Vec<CardBounds>) -> Self {
        Self {
            status_tag: Some(status.as_str().to_string()),
            cards,
        }
    }

    /// Status named by the tag; `None` when the tag is missing or unknown
    pub fn status(&self) -> Option<TaskStatus> {
        self.status_tag.as_deref().and_then(TaskStatus::parse)
    }
}

/// Prospective drop point: index within the target column's cards,
/// not counting the dragged card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionMarker {
    pub status: TaskStatus,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub task_id: String,
    pub marker: Option<InsertionMarker>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
    Committing(DragSession),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// The move was handed to the store. `outcome` is `NotFound` when the
    /// task disappeared mid-drag.
    Committed {
        task_id: String,
        marker: InsertionMarker,
        outcome: MutationOutcome,
    },
    /// Dropped outside a valid column; the store was not touched
    Cancelled { task_id: String },
    /// No drag was in progress
    Ignored,
}

/// Number of cards other than `dragged_id` whose midpoint is strictly above
/// `pointer_y`, scanning in display order until the first one that is not
pub fn insertion_index(cards: &[CardBounds], dragged_id: &str, pointer_y: f64) -> usize {
    cards
        .iter()
        .filter(|card| card.task_id != dragged_id)
        .take_while(|card| card.midpoint() < pointer_y)
        .count()
}

#[derive(Debug, Default)]
pub struct DragEngine {
    state: DragState,
}

impl DragEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn dragged_id(&self) -> Option<&str> {
        match &self.state {
            DragState::Dragging(session) | DragState::Committing(session) => {
                Some(session.task_id.as_str())
            }
            DragState::Idle => None,
        }
    }

    pub fn marker(&self) -> Option<InsertionMarker> {
        match &self.state {
            DragState::Dragging(session) | DragState::Committing(session) => session.marker,
            DragState::Idle => None,
        }
    }

    /// Begin dragging `task_id`. A leftover session from a gesture whose end
    /// was never delivered is discarded.
    pub fn start(&mut self, task_id: impl Into<String>) {
        let task_id = task_id.into();
        if let Some(stale) = self.dragged_id() {
            tracing::debug!(stale = %stale, "discarding stale drag session");
        }
        tracing::debug!(task_id = %task_id, "drag started");
        self.state = DragState::Dragging(DragSession {
            task_id,
            marker: None,
        });
    }

    /// Recompute the marker for the surface under the pointer. Returns the
    /// new marker, or `None` when not dragging or off any valid column.
    pub fn drag_over(
        &mut self,
        surface: Option<&DropSurface>,
        pointer_y: f64,
    ) -> Option<InsertionMarker> {
        let DragState::Dragging(session) = &mut self.state else {
            return None;
        };
        session.marker = surface.and_then(|surface| marker_for(surface, &session.task_id, pointer_y));
        session.marker
    }

    /// Pointer left every column
    pub fn clear_marker(&mut self) {
        if let DragState::Dragging(session) = &mut self.state {
            session.marker = None;
        }
    }

    /// End the gesture over `surface`. Commits the last marker computed by
    /// `drag_over` through `target` (status first, then position) when the
    /// surface's tag matches it; anything else cancels. The session is gone
    /// afterwards either way.
    pub fn drop_on(
        &mut self,
        surface: Option<&DropSurface>,
        target: &mut impl ReorderTarget,
    ) -> DropOutcome {
        let session = match std::mem::take(&mut self.state) {
            DragState::Dragging(session) | DragState::Committing(session) => session,
            DragState::Idle => return DropOutcome::Ignored,
        };

        let drop_status = surface.and_then(DropSurface::status);
        let Some(marker) = session
            .marker
            .filter(|marker| Some(marker.status) == drop_status)
        else {
            tracing::debug!(task_id = %session.task_id, "drop without a matching marker, cancelled");
            return DropOutcome::Cancelled {
                task_id: session.task_id,
            };
        };

        let task_id = session.task_id.clone();
        self.state = DragState::Committing(DragSession {
            task_id: session.task_id,
            marker: Some(marker),
        });

        let status_outcome = target.update_status(&task_id, marker.status);
        let move_outcome = target.move_to_position(&task_id, marker.status, marker.index);
        self.state = DragState::Idle;

        let outcome = if status_outcome.is_applied() && move_outcome.is_applied() {
            MutationOutcome::Applied
        } else {
            MutationOutcome::NotFound
        };
        tracing::debug!(
            task_id = %task_id,
            status = %marker.status,
            index = marker.index,
            applied = outcome.is_applied(),
            "drop committed"
        );
        DropOutcome::Committed {
            task_id,
            marker,
            outcome,
        }
    }

    /// Abort without touching the store (Esc, focus loss)
    pub fn cancel(&mut self) -> Option<String> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(session) | DragState::Committing(session) => {
                tracing::debug!(task_id = %session.task_id, "drag cancelled");
                Some(session.task_id)
            }
            DragState::Idle => None,
        }
    }
}

fn marker_for(surface: &DropSurface, dragged_id: &str, pointer_y: f64) -> Option<InsertionMarker> {
    let status = surface.status()?;
    Some(InsertionMarker {
        status,
        index: insertion_index(&surface.cards, dragged_id, pointer_y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cards whose midpoints land on the given values
    fn cards(midpoints: &[(&str, f64)]) -> Vec<CardBounds> {
        midpoints
            .iter()
            .map(|(id, mid)| CardBounds::new(*id, mid - 20.0, 40.0))
            .collect()
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        missing: bool,
    }

    impl ReorderTarget for Recorder {
        fn update_status(&mut self, id: &str, status: TaskStatus) -> MutationOutcome {
            self.calls.push(format!("status {id} {status}"));
            if self.missing {
                MutationOutcome::NotFound
            } else {
                MutationOutcome::Applied
            }
        }

        fn move_to_position(
            &mut self,
            id: &str,
            status: TaskStatus,
            position: usize,
        ) -> MutationOutcome {
            self.calls.push(format!("move {id} {status} {position}"));
            if self.missing {
                MutationOutcome::NotFound
            } else {
                MutationOutcome::Applied
            }
        }
    }

    #[test]
    fn insertion_index_counts_midpoints_above_pointer() {
        let column = cards(&[("a", 100.0), ("b", 200.0), ("c", 300.0)]);
        assert_eq!(insertion_index(&column, "x", 150.0), 1);
        assert_eq!(insertion_index(&column, "x", 50.0), 0);
        assert_eq!(insertion_index(&column, "x", 350.0), 3);
        // a midpoint exactly at the pointer is not above it
        assert_eq!(insertion_index(&column, "x", 200.0), 1);
    }

    #[test]
    fn insertion_index_skips_dragged_card() {
        let column = cards(&[("a", 100.0), ("b", 200.0), ("c", 300.0)]);
        assert_eq!(insertion_index(&column, "a", 250.0), 1);
        assert_eq!(insertion_index(&column, "b", 350.0), 2);
        assert_eq!(insertion_index(&[], "a", 10.0), 0);
    }

    #[test]
    fn drag_over_tracks_marker() {
        let mut engine = DragEngine::new();
        let surface = DropSurface::new(TaskStatus::Done, cards(&[("a", 100.0), ("b", 200.0)]));

        assert_eq!(engine.drag_over(Some(&surface), 150.0), None);

        engine.start("t");
        let marker = engine.drag_over(Some(&surface), 150.0).unwrap();
        assert_eq!(marker, InsertionMarker { status: TaskStatus::Done, index: 1 });
        assert_eq!(engine.marker(), Some(marker));

        assert_eq!(engine.drag_over(None, 150.0), None);
        assert!(engine.is_dragging());

        engine.drag_over(Some(&surface), 10.0);
        engine.clear_marker();
        assert_eq!(engine.marker(), None);
    }

    #[test]
    fn invalid_status_tag_clears_marker() {
        let mut engine = DragEngine::new();
        engine.start("t");
        let untagged = DropSurface {
            status_tag: None,
            cards: cards(&[("a", 100.0)]),
        };
        let unknown = DropSurface {
            status_tag: Some("archived".to_string()),
            cards: Vec::new(),
        };
        assert_eq!(engine.drag_over(Some(&untagged), 150.0), None);
        assert_eq!(engine.drag_over(Some(&unknown), 150.0), None);
    }

    #[test]
    fn drop_commits_status_then_position() {
        let mut engine = DragEngine::new();
        let mut target = Recorder::default();
        let surface = DropSurface::new(
            TaskStatus::InProgress,
            cards(&[("a", 100.0), ("b", 200.0), ("c", 300.0)]),
        );

        engine.start("t");
        engine.drag_over(Some(&surface), 150.0);
        engine.drag_over(Some(&surface), 250.0);
        let outcome = engine.drop_on(Some(&surface), &mut target);

        assert_eq!(
            outcome,
            DropOutcome::Committed {
                task_id: "t".to_string(),
                marker: InsertionMarker {
                    status: TaskStatus::InProgress,
                    index: 2
                },
                outcome: MutationOutcome::Applied,
            }
        );
        assert_eq!(target.calls, vec!["status t in-progress", "move t in-progress 2"]);
        assert_eq!(engine.state(), &DragState::Idle);
    }

    #[test]
    fn drop_on_other_column_than_marker_cancels() {
        let mut engine = DragEngine::new();
        let mut target = Recorder::default();
        let todo = DropSurface::new(TaskStatus::Todo, cards(&[("a", 100.0)]));
        let done = DropSurface::new(TaskStatus::Done, Vec::new());

        engine.start("t");
        engine.drag_over(Some(&todo), 150.0);
        assert_eq!(
            engine.drop_on(Some(&done), &mut target),
            DropOutcome::Cancelled { task_id: "t".to_string() }
        );

        // no drag_over at all means no marker to commit
        engine.start("t");
        assert_eq!(
            engine.drop_on(Some(&todo), &mut target),
            DropOutcome::Cancelled { task_id: "t".to_string() }
        );
        assert!(target.calls.is_empty());
        assert_eq!(engine.state(), &DragState::Idle);
    }

    #[test]
    fn drop_outside_column_cancels() {
        let mut engine = DragEngine::new();
        let mut target = Recorder::default();
        let untagged = DropSurface::default();

        let surface = DropSurface::new(TaskStatus::Todo, Vec::new());

        engine.start("t");
        engine.drag_over(Some(&surface), 10.0);
        assert_eq!(
            engine.drop_on(Some(&untagged), &mut target),
            DropOutcome::Cancelled { task_id: "t".to_string() }
        );
        engine.start("t");
        engine.drag_over(Some(&surface), 10.0);
        assert_eq!(
            engine.drop_on(None, &mut target),
            DropOutcome::Cancelled { task_id: "t".to_string() }
        );
        assert!(target.calls.is_empty());
        assert_eq!(engine.state(), &DragState::Idle);
    }

    #[test]
    fn drop_without_session_is_ignored() {
        let mut engine = DragEngine::new();
        let mut target = Recorder::default();
        let surface = DropSurface::new(TaskStatus::Todo, Vec::new());

        assert_eq!(engine.drop_on(Some(&surface), &mut target), DropOutcome::Ignored);
        assert!(target.calls.is_empty());
    }

    #[test]
    fn drop_of_deleted_task_resets_session() {
        let mut engine = DragEngine::new();
        let mut target = Recorder {
            missing: true,
            ..Recorder::default()
        };
        let surface = DropSurface::new(TaskStatus::Todo, Vec::new());

        engine.start("gone");
        engine.drag_over(Some(&surface), 0.0);
        let outcome = engine.drop_on(Some(&surface), &mut target);
        assert!(matches!(
            outcome,
            DropOutcome::Committed { outcome: MutationOutcome::NotFound, .. }
        ));
        assert_eq!(engine.state(), &DragState::Idle);
    }

    #[test]
    fn start_discards_stale_session_and_cancel_resets() {
        let mut engine = DragEngine::new();
        let surface = DropSurface::new(TaskStatus::Todo, cards(&[("a", 100.0)]));

        engine.start("first");
        engine.drag_over(Some(&surface), 150.0);
        engine.start("second");
        assert_eq!(engine.dragged_id(), Some("second"));
        assert_eq!(engine.marker(), None);

        assert_eq!(engine.cancel().as_deref(), Some("second"));
        assert_eq!(engine.cancel(), None);
        assert_eq!(engine.state(), &DragState::Idle);
    }

    #[test]
    fn drop_reorders_real_store() {
        let mut store = TaskStore::in_memory();
        let a = store.create("A", "").unwrap();
        let b = store.create("B", "").unwrap();
        let c = store.create("C", "").unwrap();
        let mut engine = DragEngine::new();

        // todo column shows a, b, c at midpoints 100, 200, 300; drop c between a and b
        let surface = DropSurface::new(
            TaskStatus::Todo,
            vec![
                CardBounds::new(a.id.clone(), 80.0, 40.0),
                CardBounds::new(b.id.clone(), 180.0, 40.0),
                CardBounds::new(c.id.clone(), 280.0, 40.0),
            ],
        );
        engine.start(c.id.clone());
        engine.drag_over(Some(&surface), 150.0);
        engine.drop_on(Some(&surface), &mut store);

        let order: Vec<&str> = store
            .by_status(TaskStatus::Todo)
            .iter()
            .map(|task| task.id.as_str())
            .collect();
        assert_eq!(order, vec![a.id.as_str(), c.id.as_str(), b.id.as_str()]);
    }
}
