use chrono::{DateTime, Utc};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::projector::CardProjection;
use crate::task::TaskStatus;

use super::app::{AppState, DeleteConfirmState, StatusKind};
use super::editor::{EditorKind, EditorState};

const LABEL_WIDTH: usize = 12;
const COLOR_TEXT: Color = Color::Rgb(234, 236, 239);
const COLOR_MUTED: Color = Color::Rgb(160, 165, 172);
const COLOR_MUTED_DARK: Color = Color::Rgb(118, 124, 130);
const COLOR_BG_MUTED: Color = Color::Rgb(52, 56, 60);
const COLOR_INFO: Color = Color::Rgb(116, 198, 219);
const COLOR_WARNING: Color = Color::Rgb(244, 200, 98);
const COLOR_ERROR: Color = Color::Rgb(255, 107, 107);
const COLOR_SUCCESS: Color = Color::Rgb(126, 210, 146);
const COLOR_ACCENT: Color = Color::Rgb(122, 170, 255);
const COLOR_BORDER_LIST: Color = Color::Rgb(92, 126, 166);

pub fn render(frame: &mut Frame, app: &mut AppState) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);
    let header = chunks[0];
    let main = chunks[1];
    let footer = chunks[2];

    render_header(frame, app, header);
    app.relayout(main);
    render_board(frame, app);
    render_footer(frame, app, footer);

    if let Some(editor) = app.editor.as_ref() {
        render_editor_modal(frame, area, editor);
    }
    if let Some(state) = app.delete_confirm.as_ref() {
        render_delete_confirm_modal(frame, area, state);
    }
    if let Some(message) = app.banner.as_deref() {
        render_banner_modal(frame, area, message);
    }
}

fn render_header(frame: &mut Frame, app: &AppState, area: Rect) {
    let mut spans = vec![Span::styled(
        "kanban",
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD),
    )];
    for column in &app.board.columns {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{} {}", column.label(), column.total),
            Style::default().fg(status_color(column.status)),
        ));
    }
    if app.filter_active || !app.filter.is_empty() {
        let label = if app.filter_active && app.filter.is_empty() {
            "filter: _".to_string()
        } else {
            format!("filter: {}", app.filter)
        };
        spans.push(Span::raw("    "));
        spans.push(Span::styled(label, Style::default().fg(COLOR_INFO)));
    }

    let widget = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(COLOR_BG_MUTED)),
    );
    frame.render_widget(widget, area);
}

fn render_board(frame: &mut Frame, app: &mut AppState) {
    let dragged = app.engine.dragged_id().map(str::to_string);
    let marker = app.engine.marker();

    for column in &app.layout.columns {
        let projection = app.board.column(column.status);
        let focused = column.status == app.focus;
        let title = if app.board.is_filtered() {
            format!(" {} ({}/{}) ", projection.label(), projection.len(), projection.total)
        } else {
            format!(" {} ({}) ", projection.label(), projection.len())
        };
        let border_style = if focused {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_BORDER_LIST)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(title, Style::default().fg(status_color(column.status))))
            .border_style(border_style);
        frame.render_widget(block, column.area);

        if projection.is_empty() {
            let text = if app.board.is_filtered() {
                "No matches"
            } else {
                "No tasks"
            };
            let placeholder = Paragraph::new(Line::from(Span::styled(
                text,
                Style::default().fg(COLOR_MUTED_DARK),
            )))
            .alignment(Alignment::Center);
            frame.render_widget(placeholder, column.inner);
        }

        for (card, slot) in projection.cards.iter().zip(column.cards.iter()) {
            let Some(rect) = slot.rect else {
                continue;
            };
            let selected = app.selected_id.as_deref() == Some(card.id.as_str());
            let is_dragged = dragged.as_deref() == Some(card.id.as_str());
            let body_width = rect.width.saturating_sub(2);
            let body_rows = usize::from(rect.height.saturating_sub(2));
            let body = app.cache.get_or_insert_with(&card.id, body_width, || {
                build_card_lines(card, usize::from(body_width), body_rows)
            });
            render_card(frame, rect, card, body, selected, is_dragged);
        }

        if let (Some(marker), Some(dragged)) = (marker, dragged.as_deref()) {
            if marker.status == column.status {
                if let Some(row) = column.marker_row(marker.index, dragged) {
                    let line = Paragraph::new(Line::from(Span::styled(
                        "━".repeat(usize::from(column.inner.width)),
                        Style::default()
                            .fg(COLOR_WARNING)
                            .add_modifier(Modifier::BOLD),
                    )));
                    frame.render_widget(
                        line,
                        Rect::new(column.inner.x, row, column.inner.width, 1),
                    );
                }
            }
        }
    }
}

fn render_card(
    frame: &mut Frame,
    rect: Rect,
    card: &CardProjection,
    body: Vec<Line<'static>>,
    selected: bool,
    dragged: bool,
) {
    let title_width = usize::from(rect.width.saturating_sub(4));
    let (border_style, title_style) = if dragged {
        (
            Style::default().fg(COLOR_MUTED_DARK),
            Style::default().fg(COLOR_MUTED_DARK),
        )
    } else if selected {
        (
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
            Style::default()
                .fg(COLOR_TEXT)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (
            Style::default().fg(COLOR_BG_MUTED),
            Style::default().fg(COLOR_TEXT),
        )
    };
    let body_style = if dragged {
        Style::default().fg(COLOR_MUTED_DARK)
    } else {
        Style::default()
    };

    frame.render_widget(Clear, rect);
    let widget = Paragraph::new(body).style(body_style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(truncate_text(&card.title, title_width), title_style)),
    );
    frame.render_widget(widget, rect);
}

/// Card body: the wrapped description, or the id and last update when
/// there is none
fn build_card_lines(card: &CardProjection, width: usize, rows: usize) -> Vec<Line<'static>> {
    if rows == 0 || width == 0 {
        return Vec::new();
    }
    if card.description.trim().is_empty() {
        return vec![Line::from(vec![
            Span::styled(crate::task::short_id(&card.id), id_style()),
            Span::raw(" "),
            Span::styled(
                format_timestamp(card.updated_at),
                Style::default().fg(COLOR_MUTED_DARK),
            ),
        ])];
    }

    let wrapped = wrap_text(&card.description, width);
    let truncated = wrapped.len() > rows;
    let mut lines: Vec<Line<'static>> = wrapped
        .into_iter()
        .take(rows)
        .map(|line| Line::from(Span::styled(line, Style::default().fg(COLOR_MUTED))))
        .collect();
    if truncated {
        if let Some(last) = lines.pop() {
            let text: String = last.spans.iter().map(|span| span.content.as_ref()).collect();
            lines.push(Line::from(Span::styled(
                truncate_text(&format!("{text}..."), width),
                Style::default().fg(COLOR_MUTED),
            )));
        }
    }
    lines
}

fn render_footer(frame: &mut Frame, app: &AppState, area: Rect) {
    let hint = app.footer_hint();
    let hint_span = Span::styled(hint, Style::default().fg(COLOR_INFO));
    let line = if let Some((status, kind)) = app.status_line() {
        let status_style = match kind {
            StatusKind::Error => Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
            StatusKind::Info => Style::default().fg(COLOR_WARNING),
        };
        Line::from(vec![
            hint_span,
            Span::raw("  |  "),
            Span::styled(status, status_style),
        ])
    } else {
        Line::from(hint_span)
    };
    let counts_line = Line::from(Span::styled(
        app.task_count_summary(),
        Style::default().fg(COLOR_ACCENT),
    ));
    let widget = Paragraph::new(vec![line, counts_line])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(COLOR_BORDER_LIST)),
        );
    frame.render_widget(widget, area);
}

fn render_editor_modal(frame: &mut Frame, area: Rect, editor: &EditorState) {
    let content_width = area.width.saturating_sub(8).min(72);
    let lines = build_editor_lines(editor, usize::from(content_width.saturating_sub(2)));
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let modal = centered_rect(content_width, height, area);
    frame.render_widget(Clear, modal);

    let title = match editor.kind() {
        EditorKind::NewTask => "New Task",
        EditorKind::EditTask => "Edit Task",
    };
    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(COLOR_ACCENT)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, modal);
}

fn build_editor_lines(editor: &EditorState, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let error_field = editor.error_field();
    for (idx, field) in editor.fields().iter().enumerate() {
        let is_active = idx == editor.active_index();
        let counter = field.counter();
        let counter_style = if field.over_limit() {
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_MUTED_DARK)
        };
        let label_style = if error_field == Some(field.id) {
            Style::default().fg(COLOR_ERROR)
        } else if is_active {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT)
        };
        let value_width = width.saturating_sub(LABEL_WIDTH + counter.len() + 3);

        let mut spans = vec![
            Span::styled(format!("{:<width$}", field.label, width = LABEL_WIDTH), label_style),
            Span::raw(" "),
        ];
        if is_active {
            spans.extend(value_with_caret_spans(
                &field.value,
                value_width,
                Style::default().fg(COLOR_TEXT),
            ));
        } else if field.is_empty() {
            spans.push(Span::styled(
                truncate_text("(empty)", value_width),
                Style::default().fg(COLOR_MUTED),
            ));
        } else {
            spans.push(Span::styled(
                truncate_text(&field.value, value_width),
                Style::default().fg(COLOR_TEXT),
            ));
        }
        spans.push(Span::raw("  "));
        spans.push(Span::styled(counter, counter_style));
        lines.push(Line::from(spans));
    }

    if let Some(error) = editor.error() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "tab next  enter save  ctrl+s save  ctrl+u clear  esc cancel",
        Style::default().fg(COLOR_MUTED_DARK),
    )));
    lines
}

fn render_delete_confirm_modal(frame: &mut Frame, area: Rect, state: &DeleteConfirmState) {
    let content_width = area.width.saturating_sub(8).min(64);
    let height = 8u16.min(area.height.saturating_sub(4).max(6));
    let modal = centered_rect(content_width, height, area);
    frame.render_widget(Clear, modal);

    let title_width = (content_width as usize).saturating_sub(10);
    let lines = vec![
        Line::from(Span::styled(
            "Delete task?",
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("ID: ", Style::default().fg(COLOR_MUTED_DARK)),
            Span::styled(crate::task::short_id(&state.task_id), id_style()),
        ]),
        Line::from(vec![
            Span::styled("Title: ", Style::default().fg(COLOR_MUTED_DARK)),
            Span::styled(
                truncate_text(&state.title, title_width),
                Style::default().fg(COLOR_TEXT),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "y/enter confirm  n/esc cancel",
            Style::default().fg(COLOR_MUTED_DARK),
        )),
    ];

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Delete Task"))
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, modal);
}

fn render_banner_modal(frame: &mut Frame, area: Rect, message: &str) {
    let content_width = area.width.saturating_sub(8).min(60);
    let modal = centered_rect(content_width, 6, area);
    frame.render_widget(Clear, modal);

    let lines = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default()
                .fg(COLOR_WARNING)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "press any key",
            Style::default().fg(COLOR_MUTED_DARK),
        )),
    ];
    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Storage")
                .border_style(Style::default().fg(COLOR_WARNING)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, modal);
}

/// Tail of `value` that fits `width`, followed by a block caret
fn value_with_caret_spans(value: &str, width: usize, style: Style) -> Vec<Span<'static>> {
    if width == 0 {
        return vec![Span::raw("")];
    }
    let chars: Vec<char> = value.chars().collect();
    let available = width.saturating_sub(1);
    let start = chars.len().saturating_sub(available);
    let text: String = chars[start..].iter().collect();

    let mut spans = Vec::new();
    if !text.is_empty() {
        spans.push(Span::styled(text, style));
    }
    spans.push(Span::styled(
        " ".to_string(),
        style.add_modifier(Modifier::REVERSED),
    ));
    spans
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Greedy word wrap; words longer than `width` are split
fn wrap_text(value: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if width == 0 {
        return lines;
    }
    for paragraph in value.lines() {
        let mut current = String::new();
        let mut current_len = 0usize;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if current_len == 0 {
                word.len()
            } else {
                current_len + 1 + word.len()
            };
            if needed > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }
        if current_len > 0 {
            lines.push(current);
        }
    }
    lines
}

fn truncate_text(value: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max {
        return value.to_string();
    }
    if max <= 3 {
        return chars[..max].iter().collect();
    }
    let mut out: String = chars[..(max - 3)].iter().collect();
    out.push_str("...");
    out
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Todo => COLOR_INFO,
        TaskStatus::InProgress => COLOR_WARNING,
        TaskStatus::Done => COLOR_SUCCESS,
    }
}

fn id_style() -> Style {
    Style::default()
        .fg(COLOR_MUTED)
        .add_modifier(Modifier::BOLD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use crate::config::BoardConfig;
    use crate::task::TaskStore;

    #[test]
    fn wrap_text_splits_on_words_and_long_runs() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap_text("anything", 0).is_empty());
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a longer title", 8), "a lon...");
        assert_eq!(truncate_text("abc", 2), "ab");
    }

    #[test]
    fn card_body_falls_back_to_id_line() {
        let mut store = TaskStore::in_memory();
        let task = store.create("Title", "").unwrap();
        let card = CardProjection::from(&task);
        let lines = build_card_lines(&card, 20, 2);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans[0].content, task.short_id());
    }

    #[test]
    fn render_draws_columns_and_cards() {
        let mut store = TaskStore::in_memory();
        store.create("Write tests", "cover the drag path").unwrap();
        let mut app = AppState::new(store, BoardConfig::default());

        let backend = TestBackend::new(90, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("To Do (1)"));
        assert!(text.contains("In Progress (0)"));
        assert!(text.contains("Write tests"));
        assert!(text.contains("cover the drag path"));
        assert_eq!(app.layout.columns.len(), 3);
    }
}
