//! Drag session: which task is in flight and what it hovers over.
//!
//! Purely presentational state. The recategorization itself happens in
//! `BoardController::drag_end` from whatever [`DragSession::end`] returns.

use quadrant_common::TaskId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragSession {
    active: Option<TaskId>,
    over: Option<String>,
}

/// A finished drag: the dragged task and the target it was released on.
#[derive(Debug, Clone, PartialEq)]
pub struct DragRelease {
    pub task_id: TaskId,
    pub target: Option<String>,
}

impl DragSession {
    /// Begin dragging `task_id`. Returns `false` if a drag is already active.
    pub fn start(&mut self, task_id: &str) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(task_id.to_string());
        self.over = None;
        true
    }

    /// Record the hovered drop target, as a raw id. Ignored without a drag.
    pub fn over(&mut self, target: Option<&str>) {
        if self.active.is_some() {
            self.over = target.map(str::to_string);
        }
    }

    /// End the drag. An explicit `target` wins over the hovered one.
    pub fn end(&mut self, target: Option<&str>) -> Option<DragRelease> {
        let task_id = self.active.take()?;
        let hovered = self.over.take();
        Some(DragRelease {
            task_id,
            target: target.map(str::to_string).or(hovered),
        })
    }

    pub fn cancel(&mut self) {
        self.active = None;
        self.over = None;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.over.as_deref()
    }
}
