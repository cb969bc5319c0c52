use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;

use crate::config::BoardConfig;
use crate::drag::{DragEngine, DropOutcome};
use crate::error::{Error, Result};
use crate::projector::{self, BoardProjection, CardProjection};
use crate::task::{MutationOutcome, TaskStatus, TaskStore};

use super::cache::RenderCache;
use super::editor::{EditorAction, EditorKind, EditorState};
use super::layout::{pointer_y, BoardLayout};
use super::view;

const EVENT_POLL_MS: u64 = 120;
const WATCH_DEBOUNCE_MS: u64 = 200;

/// Where to find the board; both fall back like the CLI does
pub struct BoardOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

enum UiMsg {
    StorageChanged,
    WatchError(String),
}

#[derive(Clone, Copy)]
pub(crate) enum StatusKind {
    Error,
    Info,
}

pub(crate) struct DeleteConfirmState {
    pub(crate) task_id: String,
    pub(crate) title: String,
}

#[derive(Default, Clone, Copy)]
struct Viewport {
    width: u16,
    height: u16,
}

pub struct AppState {
    pub(crate) store: TaskStore,
    pub(crate) config: BoardConfig,
    pub(crate) board: BoardProjection,
    pub(crate) layout: BoardLayout,
    pub(crate) engine: DragEngine,
    pub(crate) focus: TaskStatus,
    pub(crate) selected_id: Option<String>,
    pub(crate) scroll: [usize; 3],
    pub(crate) filter: String,
    pub(crate) filter_active: bool,
    pub(crate) editor: Option<EditorState>,
    pub(crate) delete_confirm: Option<DeleteConfirmState>,
    /// One-time warning, dismissed by any key
    pub(crate) banner: Option<String>,
    pub(crate) cache: RenderCache,
    pending_press: Option<String>,
    reload_deferred: bool,
    info_message: Option<String>,
    watch_error: Option<String>,
    viewport: Viewport,
}

impl AppState {
    pub(crate) fn new(mut store: TaskStore, config: BoardConfig) -> Self {
        let banner = if store.persistence_available() {
            None
        } else {
            Some("Storage is unavailable: changes will not survive this session.".to_string())
        };
        let board = BoardProjection::project(&store, None);
        let mut app = Self {
            store,
            config,
            board,
            layout: BoardLayout::default(),
            engine: DragEngine::new(),
            focus: TaskStatus::Todo,
            selected_id: None,
            scroll: [0; 3],
            filter: String::new(),
            filter_active: false,
            editor: None,
            delete_confirm: None,
            banner,
            cache: RenderCache::new(),
            pending_press: None,
            reload_deferred: false,
            info_message: None,
            watch_error: None,
            viewport: Viewport::default(),
        };
        app.select_row(0);
        app
    }

    fn update_viewport(&mut self, width: u16, height: u16) {
        let changed = self.viewport.width != width || self.viewport.height != height;
        self.viewport = Viewport { width, height };
        if changed {
            self.cache.invalidate_on_resize();
        }
    }

    /// Recompute card geometry for the board area
    pub(crate) fn relayout(&mut self, area: Rect) {
        self.layout = BoardLayout::compute(area, &self.board, self.config.card_height, &self.scroll);
        self.ensure_visible();
    }

    pub(crate) fn selected_card(&self) -> Option<&CardProjection> {
        let id = self.selected_id.as_deref()?;
        self.board.card(id)
    }

    fn selected_row(&self) -> Option<usize> {
        let id = self.selected_id.as_deref()?;
        self.board.column(self.focus).position_of(id)
    }

    /// Rebuild the projection from the store, keeping the selection on the
    /// same task when it still exists
    pub(crate) fn refresh(&mut self) {
        let previous_row = self.selected_row().unwrap_or(0);
        let next = BoardProjection::project(&self.store, Some(&self.filter));
        let changes = projector::diff(&self.board, &next);
        self.cache.invalidate_tasks(&changes.touched_ids());
        self.board = next;

        match self
            .selected_id
            .as_deref()
            .and_then(|id| self.board.locate(id))
        {
            Some((status, _)) => self.focus = status,
            None => self.select_row(previous_row),
        }
    }

    fn select_row(&mut self, row: usize) {
        let cards = &self.board.column(self.focus).cards;
        self.selected_id = if cards.is_empty() {
            None
        } else {
            Some(cards[row.min(cards.len() - 1)].id.clone())
        };
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.board.column(self.focus).len();
        if len == 0 {
            self.selected_id = None;
            return;
        }
        let current = self.selected_row().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1);
        self.select_row(next as usize);
        self.ensure_visible();
    }

    fn move_focus(&mut self, delta: isize) {
        let row = self.selected_row().unwrap_or(0);
        let next = (self.focus.index() as isize + delta).clamp(0, TaskStatus::ALL.len() as isize - 1);
        self.focus = TaskStatus::ALL[next as usize];
        self.select_row(row);
        self.ensure_visible();
    }

    fn ensure_visible(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let Some(column) = self.layout.column(self.focus) else {
            return;
        };
        let capacity = column.capacity().max(1);
        let slot = &mut self.scroll[self.focus.index()];
        if row < *slot {
            *slot = row;
        } else if row >= *slot + capacity {
            *slot = row + 1 - capacity;
        }
    }

    fn scroll_column(&mut self, status: TaskStatus, delta: isize) {
        let len = self.board.column(status).len();
        let slot = &mut self.scroll[status.index()];
        let next = (*slot as isize + delta).clamp(0, len.saturating_sub(1) as isize);
        *slot = next as usize;
    }

    fn set_info(&mut self, message: impl Into<String>) {
        self.info_message = Some(message.into());
    }

    /// Replace the list with what storage holds now. Deferred until the
    /// current drag ends; skipped while the last save failed, since storage
    /// is then older than memory.
    pub(crate) fn reload_from_storage(&mut self, reason: &str) {
        if self.engine.is_dragging() {
            self.reload_deferred = true;
            return;
        }
        self.reload_deferred = false;
        if self.store.last_persist_error().is_some() {
            tracing::debug!(reason, "reload skipped, unsaved changes in memory");
            return;
        }
        let changed = self.store.reload();
        self.refresh();
        if changed {
            self.set_info(format!("reloaded: {reason}"));
        }
    }

    pub(crate) fn on_focus_gained(&mut self) {
        self.reload_from_storage("window focused");
    }

    pub(crate) fn on_focus_lost(&mut self) {
        self.pending_press = None;
        if self.engine.cancel().is_some() {
            self.set_info("drag cancelled");
            self.finish_gesture();
        }
    }

    pub(crate) fn status_line(&self) -> Option<(String, StatusKind)> {
        if let Some(error) = self.store.last_persist_error() {
            return Some((format!("not saved: {error}"), StatusKind::Error));
        }
        if let Some(error) = self.watch_error.as_ref() {
            return Some((error.clone(), StatusKind::Error));
        }
        if let Some(info) = self.info_message.as_ref() {
            return Some((info.clone(), StatusKind::Info));
        }
        if !self.filter.is_empty() {
            return Some((format!("filter: {}", self.filter), StatusKind::Info));
        }
        None
    }

    pub(crate) fn footer_hint(&self) -> String {
        if self.banner.is_some() {
            return "any key to continue".to_string();
        }
        if self.delete_confirm.is_some() {
            return "y confirm delete  esc cancel".to_string();
        }
        if self.editor.is_some() {
            return "tab next field  enter save  ctrl+u clear  esc cancel".to_string();
        }
        if self.engine.is_dragging() {
            return "release to drop  esc cancel".to_string();
        }
        if self.filter_active {
            return "type filter  backspace delete  enter done  esc clear".to_string();
        }
        "h/l column  j/k card  n new  e edit  d delete  / filter  r reload  drag to move  q quit"
            .to_string()
    }

    pub(crate) fn task_count_summary(&self) -> String {
        let counts = self.store.counts();
        format!(
            "{} to do  {} in progress  {} done  ({} total)",
            counts.todo,
            counts.in_progress,
            counts.done,
            counts.total()
        )
    }

    /// Handle a key press; returns true to quit
    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        if self.banner.take().is_some() {
            return false;
        }

        if let Some(confirm) = self.delete_confirm.take() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('c') | KeyCode::Enter => {
                    match self.store.delete(&confirm.task_id) {
                        MutationOutcome::Applied => self.set_info("task deleted"),
                        MutationOutcome::NotFound => self.set_info("task was already deleted"),
                    }
                    self.refresh();
                }
                KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                    self.set_info("cancelled");
                }
                _ => self.delete_confirm = Some(confirm),
            }
            return false;
        }

        if let Some(mut editor) = self.editor.take() {
            match editor.handle_key(key) {
                EditorAction::None => self.editor = Some(editor),
                EditorAction::Cancel => self.set_info("cancelled"),
                EditorAction::Submit => self.submit_editor(editor),
            }
            return false;
        }

        if self.engine.is_dragging() {
            if key.code == KeyCode::Esc {
                self.engine.cancel();
                self.pending_press = None;
                self.set_info("drag cancelled");
                self.finish_gesture();
            }
            return false;
        }

        if self.filter_active {
            match key.code {
                KeyCode::Esc => {
                    self.filter.clear();
                    self.filter_active = false;
                }
                KeyCode::Enter => self.filter_active = false,
                KeyCode::Backspace => {
                    self.filter.pop();
                }
                KeyCode::Char(ch) if !ch.is_control() => self.filter.push(ch),
                _ => return false,
            }
            self.refresh();
            return false;
        }

        self.info_message = None;
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                if self.filter.is_empty() {
                    return true;
                }
                self.filter.clear();
                self.refresh();
            }
            KeyCode::Left | KeyCode::Char('h') => self.move_focus(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_focus(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Char('n') => self.editor = Some(EditorState::new_task()),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(editor) = self.selected_card().map(EditorState::edit_task) {
                    self.editor = Some(editor);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                self.delete_confirm = self.selected_card().map(|card| DeleteConfirmState {
                    task_id: card.id.clone(),
                    title: card.title.clone(),
                });
            }
            KeyCode::Char('/') => self.filter_active = true,
            KeyCode::Char('r') => {
                self.reload_from_storage("manual");
                self.set_info("reloaded");
            }
            _ => {}
        }
        false
    }

    fn submit_editor(&mut self, mut editor: EditorState) {
        let submit = match editor.build_submit() {
            Ok(submit) => submit,
            Err(err) => {
                editor.set_error(err);
                self.editor = Some(editor);
                return;
            }
        };

        let result = match (editor.kind(), editor.task_id()) {
            (EditorKind::EditTask, Some(id)) => self
                .store
                .update(id, &submit.title, &submit.description)
                .map(|outcome| (id.to_string(), outcome)),
            _ => self
                .store
                .create(&submit.title, &submit.description)
                .map(|task| (task.id, MutationOutcome::Applied)),
        };

        match result {
            Ok((id, MutationOutcome::Applied)) => {
                if editor.kind() == EditorKind::NewTask {
                    self.filter.clear();
                    self.set_info("task created");
                } else {
                    self.set_info("task updated");
                }
                self.selected_id = Some(id);
                self.refresh();
                self.ensure_visible();
            }
            Ok((_, MutationOutcome::NotFound)) => {
                self.set_info("task no longer exists");
                self.refresh();
            }
            Err(Error::Validation(err)) => {
                editor.set_error(err);
                self.editor = Some(editor);
            }
            Err(err) => {
                tracing::warn!(error = %err, "task form submit failed");
                self.set_info(err.to_string());
                self.editor = Some(editor);
            }
        }
    }

    pub(crate) fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.banner.is_some() || self.editor.is_some() || self.delete_confirm.is_some() {
            return;
        }

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                // a press while dragging means the release was never delivered
                if self.engine.cancel().is_some() {
                    self.finish_gesture();
                }
                self.info_message = None;
                match self.layout.card_at(mouse.column, mouse.row) {
                    Some((status, _, id)) => {
                        let id = id.to_string();
                        self.focus = status;
                        self.selected_id = Some(id.clone());
                        self.pending_press = Some(id);
                    }
                    None => {
                        self.pending_press = None;
                        if let Some(status) = self
                            .layout
                            .column_at(mouse.column, mouse.row)
                            .map(|column| column.status)
                        {
                            if status != self.focus {
                                self.focus = status;
                                self.select_row(0);
                            }
                        }
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if !self.engine.is_dragging() {
                    let Some(task_id) = self.pending_press.take() else {
                        return;
                    };
                    if self.board.is_filtered() {
                        self.set_info("clear the filter to drag cards");
                        return;
                    }
                    self.engine.start(task_id);
                }
                let surface = self.layout.drop_surface_at(mouse.column, mouse.row);
                self.engine
                    .drag_over(surface.as_ref(), pointer_y(mouse.row));
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.pending_press = None;
                if !self.engine.is_dragging() {
                    return;
                }
                let surface = self.layout.drop_surface_at(mouse.column, mouse.row);
                let outcome = self.engine.drop_on(surface.as_ref(), &mut self.store);
                self.after_drop(outcome);
            }
            MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
                let delta = if mouse.kind == MouseEventKind::ScrollDown { 1 } else { -1 };
                if let Some(status) = self
                    .layout
                    .column_at(mouse.column, mouse.row)
                    .map(|column| column.status)
                {
                    self.scroll_column(status, delta);
                }
            }
            _ => {}
        }
    }

    fn after_drop(&mut self, outcome: DropOutcome) {
        match outcome {
            DropOutcome::Committed {
                task_id,
                marker,
                outcome: MutationOutcome::Applied,
            } => {
                self.focus = marker.status;
                self.selected_id = Some(task_id);
                self.set_info(format!(
                    "moved to {} #{}",
                    marker.status.label(),
                    marker.index + 1
                ));
            }
            DropOutcome::Committed { .. } => self.set_info("task no longer exists"),
            DropOutcome::Cancelled { .. } => self.set_info("drag cancelled"),
            DropOutcome::Ignored => {}
        }
        self.finish_gesture();
    }

    fn finish_gesture(&mut self) {
        self.refresh();
        if self.reload_deferred {
            self.reload_from_storage("storage changed during drag");
        }
    }
}

pub fn run(options: BoardOptions) -> Result<()> {
    let ctx = crate::cli::task::load_context(options.data_dir, options.config)?;
    let (ui_tx, ui_rx) = mpsc::channel();

    if ctx.config.board.watch {
        spawn_watch(ctx.data_dir.clone(), ctx.config.storage.key.clone(), ui_tx);
    }

    let mut app = AppState::new(ctx.store, ctx.config.board);
    let result = run_terminal(&mut app, ui_rx);
    app.store.flush();
    if let Some(error) = app.store.last_persist_error() {
        tracing::warn!(error = %error, "final save failed");
    }
    result
}

fn run_terminal(app: &mut AppState, ui_rx: Receiver<UiMsg>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let size = terminal.size()?;
    app.update_viewport(size.width, size.height);

    let result = run_loop(&mut terminal, app, ui_rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    ui_rx: Receiver<UiMsg>,
) -> Result<()> {
    let mut dirty = true;
    loop {
        while let Ok(msg) = ui_rx.try_recv() {
            handle_ui_msg(app, msg);
            dirty = true;
        }

        if dirty {
            terminal.draw(|frame| {
                app.update_viewport(frame.size().width, frame.size().height);
                view::render(frame, app);
            })?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key) {
                        break;
                    }
                    dirty = true;
                }
                Event::Mouse(mouse) => {
                    app.handle_mouse(mouse);
                    dirty = true;
                }
                Event::FocusGained => {
                    app.on_focus_gained();
                    dirty = true;
                }
                Event::FocusLost => {
                    app.on_focus_lost();
                    dirty = true;
                }
                Event::Resize(width, height) => {
                    app.update_viewport(width, height);
                    dirty = true;
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn handle_ui_msg(app: &mut AppState, msg: UiMsg) {
    match msg {
        UiMsg::StorageChanged => app.reload_from_storage("storage changed"),
        UiMsg::WatchError(err) => app.watch_error = Some(format!("watch error: {err}")),
    }
}

/// Watch the data directory and post a debounced reload when the task
/// document is written by anyone, this process included
fn spawn_watch(data_dir: PathBuf, key: String, ui_tx: Sender<UiMsg>) {
    if let Err(err) = fs::create_dir_all(&data_dir) {
        let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
        return;
    }
    let document = format!("{key}.json");

    thread::spawn(move || {
        let (event_tx, event_rx) = mpsc::channel();
        let watcher: notify::Result<RecommendedWatcher> = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        });

        let mut watcher = match watcher {
            Ok(watcher) => watcher,
            Err(err) => {
                let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                return;
            }
        };

        if let Err(err) = watcher.watch(&data_dir, RecursiveMode::NonRecursive) {
            let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
            return;
        }

        let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
        let mut pending: Option<Instant> = None;

        loop {
            let timeout = pending
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::from_secs(3600));
            match event_rx.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) && event
                        .paths
                        .iter()
                        .any(|path| path.file_name() == Some(OsStr::new(&document)));
                    if relevant {
                        pending = Some(Instant::now() + debounce);
                    }
                }
                Ok(Err(err)) => {
                    let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if pending.is_some() {
                        pending = None;
                        if ui_tx.send(UiMsg::StorageChanged).is_err() {
                            break;
                        }
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });
}
