use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::error::ValidationError;
use crate::projector::CardProjection;
use crate::task::{validate_input, DESCRIPTION_MAX_LEN, TITLE_MAX_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    NewTask,
    EditTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorFieldId {
    Title,
    Description,
}

#[derive(Debug, Clone)]
pub struct EditorField {
    pub id: EditorFieldId,
    pub label: &'static str,
    pub value: String,
    pub max_len: usize,
}

impl EditorField {
    fn new(id: EditorFieldId, value: String) -> Self {
        let (label, max_len) = match id {
            EditorFieldId::Title => ("Title", TITLE_MAX_LEN),
            EditorFieldId::Description => ("Description", DESCRIPTION_MAX_LEN),
        };
        Self {
            id,
            label,
            value,
            max_len,
        }
    }

    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// `len/max` counter shown next to the field
    pub fn counter(&self) -> String {
        format!("{}/{}", self.len(), self.max_len)
    }

    pub fn over_limit(&self) -> bool {
        self.len() > self.max_len
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSubmit {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    None,
    Cancel,
    Submit,
}

#[derive(Debug, Clone)]
pub struct EditorState {
    kind: EditorKind,
    fields: Vec<EditorField>,
    active: usize,
    error: Option<ValidationError>,
    task_id: Option<String>,
}

impl EditorState {
    pub fn new_task() -> Self {
        Self {
            kind: EditorKind::NewTask,
            fields: vec![
                EditorField::new(EditorFieldId::Title, String::new()),
                EditorField::new(EditorFieldId::Description, String::new()),
            ],
            active: 0,
            error: None,
            task_id: None,
        }
    }

    pub fn edit_task(card: &CardProjection) -> Self {
        Self {
            kind: EditorKind::EditTask,
            fields: vec![
                EditorField::new(EditorFieldId::Title, card.title.clone()),
                EditorField::new(EditorFieldId::Description, card.description.clone()),
            ],
            active: 0,
            error: None,
            task_id: Some(card.id.clone()),
        }
    }

    pub fn kind(&self) -> EditorKind {
        self.kind
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn fields(&self) -> &[EditorField] {
        &self.fields
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    /// Field the current error belongs to
    pub fn error_field(&self) -> Option<EditorFieldId> {
        self.error.as_ref().map(|err| match err.field() {
            "description" => EditorFieldId::Description,
            _ => EditorFieldId::Title,
        })
    }

    /// Show an error the store reported for this form
    pub fn set_error(&mut self, err: ValidationError) {
        self.error = Some(err);
        self.focus_error_field();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditorAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('u') => {
                    if let Some(field) = self.current_field_mut() {
                        field.value.clear();
                    }
                    self.error = None;
                }
                KeyCode::Char('s') => return self.attempt_submit(),
                _ => {}
            }
            return EditorAction::None;
        }

        match key.code {
            KeyCode::Esc => return EditorAction::Cancel,
            KeyCode::Tab | KeyCode::Down => {
                self.move_active(1);
                return EditorAction::None;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.move_active(-1);
                return EditorAction::None;
            }
            KeyCode::Enter => {
                if self.active + 1 >= self.fields.len() {
                    return self.attempt_submit();
                }
                self.move_active(1);
                return EditorAction::None;
            }
            KeyCode::Backspace => {
                if let Some(field) = self.current_field_mut() {
                    field.value.pop();
                }
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    if let Some(field) = self.current_field_mut() {
                        field.value.push(ch);
                    }
                }
            }
            _ => return EditorAction::None,
        }

        self.revalidate();
        EditorAction::None
    }

    /// Trimmed values, or the first validation failure
    pub fn build_submit(&self) -> Result<EditorSubmit, ValidationError> {
        let (title, description) = validate_input(
            self.field_value(EditorFieldId::Title),
            self.field_value(EditorFieldId::Description),
        )?;
        Ok(EditorSubmit { title, description })
    }

    fn attempt_submit(&mut self) -> EditorAction {
        match self.build_submit() {
            Ok(_) => {
                self.error = None;
                EditorAction::Submit
            }
            Err(err) => {
                self.set_error(err);
                EditorAction::None
            }
        }
    }

    fn focus_error_field(&mut self) {
        let Some(id) = self.error_field() else {
            return;
        };
        if let Some(index) = self.fields.iter().position(|field| field.id == id) {
            self.active = index;
        }
    }

    /// Keep an existing error current while typing, without raising new ones
    /// before the first submit
    fn revalidate(&mut self) {
        if self.error.is_some() {
            self.error = self.build_submit().err();
        }
    }

    fn move_active(&mut self, delta: isize) {
        let len = self.fields.len() as isize;
        if len == 0 {
            self.active = 0;
            return;
        }
        let next = (self.active as isize + delta).rem_euclid(len);
        self.active = next as usize;
    }

    fn current_field_mut(&mut self) -> Option<&mut EditorField> {
        self.fields.get_mut(self.active)
    }

    fn field_value(&self, id: EditorFieldId) -> &str {
        self.fields
            .iter()
            .find(|field| field.id == id)
            .map(|field| field.value.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(editor: &mut EditorState, text: &str) {
        for ch in text.chars() {
            editor.handle_key(key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn editor_requires_title() {
        let mut editor = EditorState::new_task();
        for _ in 0..editor.fields().len() {
            let action = editor.handle_key(key(KeyCode::Enter));
            assert_eq!(action, EditorAction::None);
        }
        assert_eq!(editor.error(), Some(&ValidationError::EmptyTitle));
        assert_eq!(editor.error_field(), Some(EditorFieldId::Title));
        assert_eq!(editor.active_index(), 0);

        type_text(&mut editor, "x");
        assert!(editor.error().is_none());
    }

    #[test]
    fn editor_submits_trimmed_values() {
        let mut editor = EditorState::new_task();
        type_text(&mut editor, "  Ship it ");
        editor.handle_key(key(KeyCode::Tab));
        type_text(&mut editor, "today");

        assert_eq!(editor.handle_key(key(KeyCode::Enter)), EditorAction::Submit);
        assert_eq!(
            editor.build_submit().unwrap(),
            EditorSubmit {
                title: "Ship it".to_string(),
                description: "today".to_string(),
            }
        );
    }

    #[test]
    fn counters_flag_over_length_description() {
        let mut editor = EditorState::new_task();
        type_text(&mut editor, "T");
        editor.handle_key(key(KeyCode::Tab));
        type_text(&mut editor, &"d".repeat(DESCRIPTION_MAX_LEN + 1));

        let description = &editor.fields()[1];
        assert_eq!(description.counter(), "501/500");
        assert!(description.over_limit());
        assert_eq!(editor.handle_key(key(KeyCode::Enter)), EditorAction::None);
        assert_eq!(editor.error_field(), Some(EditorFieldId::Description));

        editor.handle_key(key(KeyCode::Backspace));
        assert!(editor.error().is_none());
    }

    #[test]
    fn ctrl_u_clears_and_esc_cancels() {
        let mut editor = EditorState::new_task();
        type_text(&mut editor, "abc");
        editor.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert!(editor.fields()[0].is_empty());
        assert_eq!(editor.handle_key(key(KeyCode::Esc)), EditorAction::Cancel);
    }
}
