//! Shared domain types for the quadrant task matrix.
//!
//! - `models`: `Category`, `Task`, `TaskPatch`, `Identity`
//! - `view`: `partition()` into the four-quadrant `BoardView`
//! - `lifecycle`: completion, drop and edit transitions as patches

pub mod lifecycle;
pub mod models;
pub mod view;

pub use lifecycle::{apply_patch, completion_patch, drop_patch, edit_patch};
pub use models::{Category, Identity, Task, TaskId, TaskPatch, UnknownCategory, short_id};
pub use view::{BoardView, ColumnView, partition};
