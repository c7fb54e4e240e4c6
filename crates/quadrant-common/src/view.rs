//! Four-quadrant projection of a flat task list.

use serde::Serialize;

use crate::models::{Category, Task};

/// Tasks grouped the way the board shows them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardView {
    quadrants: [Vec<Task>; 4],
    /// Active tasks whose stored category is not one of the four quadrants.
    pub unknown: Vec<Task>,
    pub completed: Vec<Task>,
}

/// Route every task to exactly one bucket, keeping input order.
///
/// The input is expected to be sorted ascending by `created_at`, as the
/// store delivers it.
pub fn partition(tasks: &[Task]) -> BoardView {
    let mut view = BoardView::default();
    for task in tasks {
        if task.completed {
            view.completed.push(task.clone());
            continue;
        }
        match task.quadrant() {
            Some(c) => view.quadrants[c.index()].push(task.clone()),
            None => view.unknown.push(task.clone()),
        }
    }
    view
}

impl BoardView {
    pub fn quadrant(&self, category: Category) -> &[Task] {
        &self.quadrants[category.index()]
    }

    pub fn len(&self) -> usize {
        self.quadrants.iter().map(Vec::len).sum::<usize>() + self.unknown.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every task in display order: quadrants, then unknown, then completed.
    ///
    /// Position `i` in this iterator is what the board prints as `i + 1`.
    pub fn ordered(&self) -> impl Iterator<Item = &Task> {
        self.quadrants
            .iter()
            .flatten()
            .chain(self.unknown.iter())
            .chain(self.completed.iter())
    }

    /// 1-based display number of a task, if present.
    pub fn number_of(&self, task_id: &str) -> Option<usize> {
        self.ordered().position(|t| t.id == task_id).map(|i| i + 1)
    }

    pub fn columns(&self) -> Vec<ColumnView> {
        Category::ALL
            .iter()
            .map(|c| ColumnView {
                id: c.as_str(),
                label: c.label(),
                tasks: self.quadrant(*c).to_vec(),
            })
            .collect()
    }
}

/// One quadrant column, shaped for JSON.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    pub id: &'static str,
    pub label: &'static str,
    pub tasks: Vec<Task>,
}
