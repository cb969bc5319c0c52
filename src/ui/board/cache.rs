use std::collections::{HashMap, HashSet};

use ratatui::text::Line;

/// Wrapped card bodies keyed by task id and content width
pub struct RenderCache {
    pub cards: HashMap<(String, u16), Vec<Line<'static>>>,
    pub hits: u64,
    pub misses: u64,
}

impl RenderCache {
    pub fn new() -> Self {
        Self {
            cards: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_insert_with(
        &mut self,
        task_id: &str,
        width: u16,
        build: impl FnOnce() -> Vec<Line<'static>>,
    ) -> Vec<Line<'static>> {
        let key = (task_id.to_string(), width);
        if let Some(lines) = self.cards.get(&key) {
            self.hits += 1;
            return lines.clone();
        }
        self.misses += 1;
        let lines = build();
        self.cards.insert(key, lines.clone());
        lines
    }

    pub fn invalidate_on_resize(&mut self) {
        self.cards.clear();
    }

    pub fn invalidate_tasks(&mut self, task_ids: &HashSet<&str>) {
        if task_ids.is_empty() {
            return;
        }
        self.cards.retain(|(id, _), _| !task_ids.contains(id.as_str()));
    }
}
