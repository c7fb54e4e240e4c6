//! Task state transitions, expressed as patches for the store.
//!
//! Nothing here touches storage. Each function looks at the task as last
//! pushed by the store and returns the fields to write, or `None` when the
//! request would not change anything.

use chrono::{DateTime, Utc};

use crate::models::{Category, Task, TaskPatch};

/// Two-state completion machine: `active(category)` and `completed`.
///
/// Completing remembers the quadrant in `previous_category`; un-completing
/// puts the task back there, or into [`Category::DEFAULT`] when the
/// remembered value is missing or unrecognized.
pub fn completion_patch(task: &Task, completed: bool, now: DateTime<Utc>) -> Option<TaskPatch> {
    match (task.completed, completed) {
        (false, true) => Some(TaskPatch {
            completed: Some(true),
            completed_at: Some(Some(now)),
            previous_category: Some(task.quadrant().unwrap_or(Category::DEFAULT)),
            ..Default::default()
        }),
        (true, false) => Some(TaskPatch {
            completed: Some(false),
            completed_at: Some(None),
            category: Some(task.previous_quadrant().unwrap_or(Category::DEFAULT)),
            ..Default::default()
        }),
        _ => None,
    }
}

/// Recategorize on drop.
///
/// `target` is the raw id of whatever the task was dropped on. Only a
/// quadrant id that differs from the task's current quadrant, for an active
/// task, produces a write.
pub fn drop_patch(task: &Task, target: &str) -> Option<TaskPatch> {
    let target: Category = target.parse().ok()?;
    if task.completed || task.quadrant() == Some(target) {
        return None;
    }
    Some(TaskPatch {
        category: Some(target),
        previous_category: Some(target),
        ..Default::default()
    })
}

/// In-place edit from the input form.
pub fn edit_patch(text: &str, category: Category, now: DateTime<Utc>) -> TaskPatch {
    TaskPatch {
        text: Some(text.trim().to_string()),
        category: Some(category),
        updated_at: Some(now),
        ..Default::default()
    }
}

/// Apply a patch the way the store merges it. Used to predict the next
/// snapshot in tests and by callers that want a local preview.
pub fn apply_patch(task: &Task, patch: &TaskPatch) -> Task {
    let mut next = task.clone();
    if let Some(text) = &patch.text {
        next.text = text.clone();
    }
    if let Some(c) = patch.category {
        next.category = c.as_str().to_string();
    }
    if let Some(c) = patch.previous_category {
        next.previous_category = Some(c.as_str().to_string());
    }
    if let Some(done) = patch.completed {
        next.completed = done;
    }
    if let Some(at) = patch.completed_at {
        next.completed_at = at;
    }
    if let Some(at) = patch.updated_at {
        next.updated_at = Some(at);
    }
    next
}
