use std::fs;

use kanban::config::{Config, CONFIG_FILE_NAME};
use kanban::Error;

#[test]
fn config_defaults_when_missing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = Config::load_from_dir(dir.path())?;

    assert_eq!(config, Config::default());
    assert_eq!(config.storage.key, "kanban-tasks");
    assert_eq!(config.board.card_height, 4);
    assert!(config.board.watch);

    Ok(())
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toml = r#"
[storage]
key = "team-board"

[board]
card_height = 6
watch = false
"#;
    fs::write(dir.path().join(CONFIG_FILE_NAME), toml)?;

    let config = Config::load_from_dir(dir.path())?;
    assert_eq!(config.storage.key, "team-board");
    assert_eq!(config.board.card_height, 6);
    assert!(!config.board.watch);

    Ok(())
}

#[test]
fn config_rejects_bad_values() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(CONFIG_FILE_NAME);

    fs::write(&path, "[storage]\nkey = \"../escape\"\n")?;
    assert!(matches!(
        Config::load(&path),
        Err(Error::InvalidConfig(message)) if message.starts_with("storage.key")
    ));

    fs::write(&path, "[board]\ncard_height = 2\n")?;
    assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));

    fs::write(&path, "[board\n")?;
    assert!(matches!(Config::load(&path), Err(Error::TomlParse(_))));

    Ok(())
}
