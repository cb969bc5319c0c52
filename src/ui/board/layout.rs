//! Screen geometry for the board: where each column and card sits.
//!
//! Cards scrolled out of view keep virtual rows above or below the column
//! so the drop surface handed to the drag engine always covers the whole
//! column, not just what fits on screen.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::drag::{CardBounds, DropSurface};
use crate::projector::BoardProjection;
use crate::task::TaskStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSlot {
    pub task_id: String,
    /// Row of the card's top border; negative when scrolled off the top
    pub top: i32,
    /// On-screen area, `None` when scrolled out of view
    pub rect: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub status: TaskStatus,
    pub area: Rect,
    pub inner: Rect,
    pub cards: Vec<CardSlot>,
    pub card_height: u16,
    pub first_visible: usize,
}

impl ColumnLayout {
    pub fn contains(&self, x: u16, y: u16) -> bool {
        rect_contains(self.area, x, y)
    }

    /// Number of whole cards the column can show
    pub fn capacity(&self) -> usize {
        if self.card_height == 0 {
            return 0;
        }
        usize::from(self.inner.height / self.card_height)
    }

    pub fn card_at(&self, x: u16, y: u16) -> Option<(usize, &CardSlot)> {
        self.cards.iter().enumerate().find(|(_, slot)| {
            slot.rect
                .map_or(false, |rect| rect_contains(rect, x, y))
        })
    }

    pub fn drop_surface(&self) -> DropSurface {
        let height = f64::from(self.card_height);
        DropSurface::new(
            self.status,
            self.cards
                .iter()
                .map(|slot| CardBounds::new(slot.task_id.clone(), f64::from(slot.top), height))
                .collect(),
        )
    }

    /// Row to draw the insertion marker on for `index` among the cards other
    /// than `dragged_id`, clamped to the column interior
    pub fn marker_row(&self, index: usize, dragged_id: &str) -> Option<u16> {
        if self.inner.height == 0 {
            return None;
        }
        let siblings: Vec<&CardSlot> = self
            .cards
            .iter()
            .filter(|slot| slot.task_id != dragged_id)
            .collect();
        let row = match siblings.get(index) {
            Some(slot) => slot.top,
            None => siblings
                .last()
                .map_or(i32::from(self.inner.y), |slot| {
                    slot.top + i32::from(self.card_height)
                }),
        };
        let min = i32::from(self.inner.y);
        let max = i32::from(self.inner.y + self.inner.height - 1);
        u16::try_from(row.clamp(min, max)).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardLayout {
    pub columns: Vec<ColumnLayout>,
}

impl BoardLayout {
    /// Split `area` into three columns and stack each column's cards,
    /// starting at `scroll[column]`
    pub fn compute(
        area: Rect,
        board: &BoardProjection,
        card_height: u16,
        scroll: &[usize; 3],
    ) -> Self {
        let areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                [
                    Constraint::Ratio(1, 3),
                    Constraint::Ratio(1, 3),
                    Constraint::Ratio(1, 3),
                ]
                .as_ref(),
            )
            .split(area);

        let columns = board
            .columns
            .iter()
            .zip(areas.iter())
            .map(|(column, &col_area)| {
                let inner = inner_rect(col_area);
                let capacity = if card_height == 0 {
                    0
                } else {
                    usize::from(inner.height / card_height)
                };
                let max_scroll = column.cards.len().saturating_sub(capacity.max(1));
                let first_visible = scroll[column.status.index()].min(max_scroll);

                let cards = column
                    .cards
                    .iter()
                    .enumerate()
                    .map(|(idx, card)| {
                        let offset = idx as i32 - first_visible as i32;
                        let top = i32::from(inner.y) + offset * i32::from(card_height);
                        let visible = idx >= first_visible && idx < first_visible + capacity;
                        let rect = if visible {
                            u16::try_from(top)
                                .ok()
                                .map(|y| Rect::new(inner.x, y, inner.width, card_height))
                        } else {
                            None
                        };
                        CardSlot {
                            task_id: card.id.clone(),
                            top,
                            rect,
                        }
                    })
                    .collect();

                ColumnLayout {
                    status: column.status,
                    area: col_area,
                    inner,
                    cards,
                    card_height,
                    first_visible,
                }
            })
            .collect();

        Self { columns }
    }

    pub fn column(&self, status: TaskStatus) -> Option<&ColumnLayout> {
        self.columns.iter().find(|column| column.status == status)
    }

    pub fn column_at(&self, x: u16, y: u16) -> Option<&ColumnLayout> {
        self.columns.iter().find(|column| column.contains(x, y))
    }

    /// Column, row and id of the card under the pointer
    pub fn card_at(&self, x: u16, y: u16) -> Option<(TaskStatus, usize, &str)> {
        let column = self.column_at(x, y)?;
        column
            .card_at(x, y)
            .map(|(row, slot)| (column.status, row, slot.task_id.as_str()))
    }

    /// Surface under the pointer, `None` outside every column
    pub fn drop_surface_at(&self, x: u16, y: u16) -> Option<DropSurface> {
        self.column_at(x, y).map(ColumnLayout::drop_surface)
    }
}

/// Pointer row as a coordinate: the middle of the cell
pub fn pointer_y(row: u16) -> f64 {
    f64::from(row) + 0.5
}

fn inner_rect(area: Rect) -> Rect {
    Rect::new(
        area.x.saturating_add(1),
        area.y.saturating_add(1),
        area.width.saturating_sub(2),
        area.height.saturating_sub(2),
    )
}

fn rect_contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x
        && y >= rect.y
        && u32::from(x) < u32::from(rect.x) + u32::from(rect.width)
        && u32::from(y) < u32::from(rect.y) + u32::from(rect.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::insertion_index;
    use crate::task::TaskStore;

    fn board_with(titles: &[&str]) -> (TaskStore, BoardProjection) {
        let mut store = TaskStore::in_memory();
        for title in titles {
            store.create(title, "").unwrap();
        }
        let board = BoardProjection::project(&store, None);
        (store, board)
    }

    #[test]
    fn columns_split_the_area() {
        let (_store, board) = board_with(&["A"]);
        let layout = BoardLayout::compute(Rect::new(0, 0, 90, 20), &board, 4, &[0; 3]);

        assert_eq!(layout.columns.len(), 3);
        assert_eq!(layout.column_at(5, 5).map(|c| c.status), Some(TaskStatus::Todo));
        assert_eq!(layout.column_at(45, 5).map(|c| c.status), Some(TaskStatus::InProgress));
        assert_eq!(layout.column_at(85, 5).map(|c| c.status), Some(TaskStatus::Done));
        assert!(layout.column_at(5, 25).is_none());
    }

    #[test]
    fn cards_stack_inside_the_border() {
        let (_store, board) = board_with(&["A", "B"]);
        let layout = BoardLayout::compute(Rect::new(0, 0, 90, 20), &board, 4, &[0; 3]);
        let todo = layout.column(TaskStatus::Todo).unwrap();

        assert_eq!(todo.cards[0].top, 1);
        assert_eq!(todo.cards[1].top, 5);
        assert_eq!(todo.cards[1].rect, Some(Rect::new(1, 5, 28, 4)));
        let (status, row, id) = layout.card_at(3, 6).unwrap();
        assert_eq!((status, row), (TaskStatus::Todo, 1));
        assert_eq!(id, board.column(TaskStatus::Todo).cards[1].id);
        assert!(layout.card_at(3, 15).is_none());
    }

    #[test]
    fn drop_surface_uses_cell_geometry() {
        let (_store, board) = board_with(&["A", "B", "C"]);
        let layout = BoardLayout::compute(Rect::new(0, 0, 90, 20), &board, 4, &[0; 3]);
        let surface = layout.drop_surface_at(3, 7).unwrap();

        assert_eq!(surface.status(), Some(TaskStatus::Todo));
        // midpoints at rows 3, 7 and 11
        assert_eq!(insertion_index(&surface.cards, "x", pointer_y(2)), 0);
        assert_eq!(insertion_index(&surface.cards, "x", pointer_y(3)), 1);
        assert_eq!(insertion_index(&surface.cards, "x", pointer_y(12)), 3);
    }

    #[test]
    fn scrolled_cards_keep_virtual_rows() {
        let (_store, board) = board_with(&["A", "B", "C", "D", "E"]);
        // inner height 8 fits two cards
        let layout = BoardLayout::compute(Rect::new(0, 0, 90, 10), &board, 4, &[2, 0, 0]);
        let todo = layout.column(TaskStatus::Todo).unwrap();

        assert_eq!(todo.capacity(), 2);
        assert_eq!(todo.first_visible, 2);
        assert_eq!(todo.cards[0].top, -7);
        assert!(todo.cards[0].rect.is_none());
        assert_eq!(todo.cards[2].rect.map(|r| r.y), Some(1));
        assert!(todo.cards[4].rect.is_none());

        let surface = todo.drop_surface();
        assert_eq!(insertion_index(&surface.cards, "x", pointer_y(1)), 2);
    }

    #[test]
    fn marker_row_tracks_gap() {
        let (_store, board) = board_with(&["A", "B"]);
        let layout = BoardLayout::compute(Rect::new(0, 0, 90, 20), &board, 4, &[0; 3]);
        let todo = layout.column(TaskStatus::Todo).unwrap();
        let first = todo.cards[0].task_id.clone();

        assert_eq!(todo.marker_row(0, "x"), Some(1));
        assert_eq!(todo.marker_row(1, "x"), Some(5));
        assert_eq!(todo.marker_row(2, "x"), Some(9));
        // dragging the first card: index 1 is after B
        assert_eq!(todo.marker_row(1, &first), Some(9));

        let empty = layout.column(TaskStatus::Done).unwrap();
        assert_eq!(empty.marker_row(0, "x"), Some(1));
    }
}
