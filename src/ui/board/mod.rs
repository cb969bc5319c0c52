pub mod app;
pub mod cache;
pub mod editor;
pub mod layout;
pub mod view;

pub use app::{run, BoardOptions};
