use kanban::drag::{CardBounds, DragEngine, DropOutcome, DropSurface};
use kanban::persistence::KeyValuePersistence;
use kanban::projector::BoardProjection;
use kanban::storage::{FileStore, MemoryStore};
use kanban::task::{MutationOutcome, TaskStatus, TaskStore};

fn file_store(dir: &std::path::Path) -> TaskStore {
    TaskStore::open(KeyValuePersistence::new(FileStore::new(dir)))
}

fn titles(store: &TaskStore, status: TaskStatus) -> Vec<String> {
    store
        .by_status(status)
        .iter()
        .map(|task| task.title.clone())
        .collect()
}

#[test]
fn reopened_store_keeps_order_and_status() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut store = file_store(dir.path());
    let a = store.create("A", "")?;
    store.create("B", "")?;
    let c = store.create("C", "")?;
    store.move_to_position(&c.id, TaskStatus::Todo, 0);
    store.update_status(&a.id, TaskStatus::Done);

    let reopened = file_store(dir.path());
    assert_eq!(reopened.tasks(), store.tasks());
    assert_eq!(titles(&reopened, TaskStatus::Todo), vec!["C", "B"]);
    assert_eq!(titles(&reopened, TaskStatus::Done), vec!["A"]);

    Ok(())
}

#[test]
fn last_writer_wins_and_reload_picks_it_up() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut first = file_store(dir.path());
    let mut second = file_store(dir.path());

    first.create("From first", "")?;
    second.create("From second", "")?;

    assert!(first.reload());
    assert_eq!(titles(&first, TaskStatus::Todo), vec!["From second"]);
    assert!(!first.reload());

    Ok(())
}

#[test]
fn failed_saves_keep_in_memory_state() -> Result<(), Box<dyn std::error::Error>> {
    let handle = MemoryStore::new();
    let mut store = TaskStore::open(KeyValuePersistence::new(handle.clone()));
    store.create("Saved", "")?;

    handle.set_fail_writes(true);
    let task = store.create("Unsaved", "")?;
    assert_eq!(store.len(), 2);
    assert!(store.last_persist_error().is_some());
    assert!(!store.persistence_available());

    handle.set_fail_writes(false);
    assert_eq!(store.delete(&task.id), MutationOutcome::Applied);
    assert!(store.last_persist_error().is_none());

    let reopened = TaskStore::open(KeyValuePersistence::new(handle));
    assert_eq!(titles(&reopened, TaskStatus::Todo), vec!["Saved"]);

    Ok(())
}

#[test]
fn unknown_ids_are_no_ops() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = TaskStore::in_memory();
    store.create("Only", "")?;
    let before = store.tasks().to_vec();
    let revision = store.revision();

    assert_eq!(store.update_status("missing", TaskStatus::Done), MutationOutcome::NotFound);
    assert_eq!(
        store.move_to_position("missing", TaskStatus::Done, 0),
        MutationOutcome::NotFound
    );
    assert_eq!(store.delete("missing"), MutationOutcome::NotFound);
    assert_eq!(store.update("missing", "t", "")?, MutationOutcome::NotFound);

    assert_eq!(store.tasks(), before.as_slice());
    assert_eq!(store.revision(), revision);

    Ok(())
}

#[test]
fn drag_engine_drives_store_through_projection() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = TaskStore::in_memory();
    let a = store.create("A", "")?;
    store.create("B", "")?;
    store.create("C", "")?;

    let board = BoardProjection::project(&store, None);
    let cards: Vec<CardBounds> = board
        .column(TaskStatus::Todo)
        .cards
        .iter()
        .enumerate()
        .map(|(idx, card)| CardBounds::new(card.id.clone(), 100.0 * idx as f64, 100.0))
        .collect();
    let surface = DropSurface::new(TaskStatus::Todo, cards);

    let mut engine = DragEngine::new();
    engine.start(a.id.clone());
    let marker = engine.drag_over(Some(&surface), 260.0).ok_or("marker")?;
    assert_eq!(marker.index, 2);

    let outcome = engine.drop_on(Some(&surface), &mut store);
    assert!(matches!(
        outcome,
        DropOutcome::Committed {
            outcome: MutationOutcome::Applied,
            ..
        }
    ));
    assert!(!engine.is_dragging());
    assert_eq!(titles(&store, TaskStatus::Todo), vec!["B", "C", "A"]);

    Ok(())
}
