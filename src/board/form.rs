use quadrant_common::Category;

/// The task input form: a text field and a quadrant selector.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskForm {
    pub text: String,
    pub category: Category,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            text: String::new(),
            category: Category::DEFAULT,
        }
    }
}

impl TaskForm {
    /// Trimmed input, or `None` when there is nothing to submit.
    pub fn submission(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    /// Empty the text field. The selected quadrant stays.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn load(&mut self, text: &str, category: Category) {
        self.text = text.to_string();
        self.category = category;
    }
}
