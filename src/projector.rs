//! Per-column view of the task list.
//!
//! A [`BoardProjection`] is a pure function of the store contents and the
//! current search filter. Hosts keep the previous projection and use
//! [`diff`] to decide what needs redrawing.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::task::{Task, TaskStatus, TaskStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProjection {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for CardProjection {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnProjection {
    pub status: TaskStatus,
    pub cards: Vec<CardProjection>,
    /// Cards in the column before filtering
    pub total: usize,
}

impl ColumnProjection {
    pub fn label(&self) -> &'static str {
        self.status.label()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.cards.iter().position(|card| card.id == id)
    }

    fn ids(&self) -> Vec<&str> {
        self.cards.iter().map(|card| card.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardProjection {
    pub columns: Vec<ColumnProjection>,
    pub filter: Option<String>,
    pub revision: u64,
}

impl BoardProjection {
    /// Columns in [`TaskStatus::ALL`] order, cards in live order. A blank
    /// filter is no filter.
    pub fn project(store: &TaskStore, filter: Option<&str>) -> Self {
        let filter = filter
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .map(str::to_string);
        let visible: Option<HashSet<&str>> = filter.as_deref().map(|query| {
            store
                .search(query)
                .into_iter()
                .map(|task| task.id.as_str())
                .collect()
        });

        let columns = TaskStatus::ALL
            .iter()
            .map(|&status| {
                let tasks = store.by_status(status);
                let total = tasks.len();
                let cards = tasks
                    .into_iter()
                    .filter(|task| {
                        visible
                            .as_ref()
                            .map_or(true, |ids| ids.contains(task.id.as_str()))
                    })
                    .map(CardProjection::from)
                    .collect();
                ColumnProjection {
                    status,
                    cards,
                    total,
                }
            })
            .collect();

        Self {
            columns,
            filter,
            revision: store.revision(),
        }
    }

    pub fn column(&self, status: TaskStatus) -> &ColumnProjection {
        &self.columns[status.index()]
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    /// Column and row of the card with `id`
    pub fn locate(&self, id: &str) -> Option<(TaskStatus, usize)> {
        self.columns
            .iter()
            .find_map(|column| column.position_of(id).map(|row| (column.status, row)))
    }

    pub fn card(&self, id: &str) -> Option<&CardProjection> {
        self.columns
            .iter()
            .flat_map(|column| column.cards.iter())
            .find(|card| card.id == id)
    }

    pub fn visible_count(&self) -> usize {
        self.columns.iter().map(ColumnProjection::len).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub updated: Vec<String>,
    pub order_changed: bool,
}

impl ColumnDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.updated.is_empty()
            && !self.order_changed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionDiff {
    /// Indexed like [`TaskStatus::ALL`]
    pub columns: [ColumnDiff; 3],
}

impl ProjectionDiff {
    pub fn column(&self, status: TaskStatus) -> &ColumnDiff {
        &self.columns[status.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(ColumnDiff::is_empty)
    }

    /// Ids whose rendered content may differ
    pub fn touched_ids(&self) -> HashSet<&str> {
        self.columns
            .iter()
            .flat_map(|column| {
                column
                    .added
                    .iter()
                    .chain(&column.removed)
                    .chain(&column.updated)
            })
            .map(String::as_str)
            .collect()
    }
}

/// Changes from `prev` to `next`. A card moving between columns shows up as
/// removed from one and added to the other. `order_changed` is set when the
/// cards present in both projections appear in a different relative order.
pub fn diff(prev: &BoardProjection, next: &BoardProjection) -> ProjectionDiff {
    let mut result = ProjectionDiff::default();
    for (slot, status) in TaskStatus::ALL.iter().enumerate() {
        let before = prev.column(*status);
        let after = next.column(*status);
        let before_cards: HashMap<&str, &CardProjection> = before
            .cards
            .iter()
            .map(|card| (card.id.as_str(), card))
            .collect();
        let after_ids: HashSet<&str> = after.cards.iter().map(|card| card.id.as_str()).collect();

        let column = &mut result.columns[slot];
        for card in &after.cards {
            match before_cards.get(card.id.as_str()) {
                None => column.added.push(card.id.clone()),
                Some(old) if *old != card => column.updated.push(card.id.clone()),
                Some(_) => {}
            }
        }
        column.removed = before
            .cards
            .iter()
            .filter(|card| !after_ids.contains(card.id.as_str()))
            .map(|card| card.id.clone())
            .collect();

        let kept_before: Vec<&str> = before
            .ids()
            .into_iter()
            .filter(|id| after_ids.contains(id))
            .collect();
        let kept_after: Vec<&str> = after
            .ids()
            .into_iter()
            .filter(|id| before_cards.contains_key(id))
            .collect();
        column.order_changed = kept_before != kept_after;
    }
    result
}
