use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque task identifier assigned by the store.
pub type TaskId = String;

/// One of the four fixed quadrants of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Important and urgent.
    ViktigtBratttom,
    /// Important, not urgent.
    ViktigtInteBratttom,
    /// Urgent, not important.
    BratttomInteViktigt,
    /// Neither.
    InteBratttomInteViktigt,
}

impl Category {
    /// All quadrants in board order.
    pub const ALL: [Category; 4] = [
        Category::ViktigtBratttom,
        Category::ViktigtInteBratttom,
        Category::BratttomInteViktigt,
        Category::InteBratttomInteViktigt,
    ];

    /// Quadrant used when nothing better is known.
    pub const DEFAULT: Category = Category::ViktigtBratttom;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViktigtBratttom => "viktigt_bratttom",
            Self::ViktigtInteBratttom => "viktigt_inte_bratttom",
            Self::BratttomInteViktigt => "bratttom_inte_viktigt",
            Self::InteBratttomInteViktigt => "inte_bratttom_inte_viktigt",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ViktigtBratttom => "Viktigt, bråttom",
            Self::ViktigtInteBratttom => "Viktigt, inte bråttom",
            Self::BratttomInteViktigt => "Bråttom inte viktigt",
            Self::InteBratttomInteViktigt => "Inte bråttom, inte viktigt",
        }
    }

    /// Zero-based position in [`Category::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Self::ViktigtBratttom => 0,
            Self::ViktigtInteBratttom => 1,
            Self::BratttomInteViktigt => 2,
            Self::InteBratttomInteViktigt => 3,
        }
    }

    /// Parse either a quadrant id or its 1-based board number.
    pub fn from_user_input(s: &str) -> Result<Self, UnknownCategory> {
        let s = s.trim();
        match s.parse::<usize>() {
            Ok(n) if (1..=Self::ALL.len()).contains(&n) => Ok(Self::ALL[n - 1]),
            _ => s.parse(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid category '{0}'. Valid values: viktigt_bratttom, viktigt_inte_bratttom, bratttom_inte_viktigt, inte_bratttom_inte_viktigt")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viktigt_bratttom" => Ok(Self::ViktigtBratttom),
            "viktigt_inte_bratttom" => Ok(Self::ViktigtInteBratttom),
            "bratttom_inte_viktigt" => Ok(Self::BratttomInteViktigt),
            "inte_bratttom_inte_viktigt" => Ok(Self::InteBratttomInteViktigt),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// A task document as pushed by the store.
///
/// `category` and `previous_category` keep the stored identifier verbatim so
/// that documents written by older clients with values outside the four
/// quadrants still reach the board. Use [`Task::quadrant`] for the typed view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub category: String,
    pub previous_category: Option<String>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// The quadrant this task sits in, if its category is recognized.
    pub fn quadrant(&self) -> Option<Category> {
        self.category.parse().ok()
    }

    pub fn previous_quadrant(&self) -> Option<Category> {
        self.previous_category.as_deref().and_then(|c| c.parse().ok())
    }

    /// First eight characters of the id, for display.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// First eight characters of a task id, cut on a char boundary.
pub fn short_id(id: &str) -> &str {
    let end = id.char_indices().nth(8).map(|(i, _)| i).unwrap_or(id.len());
    &id[..end]
}

/// Partial update of a task. Only fields that are `Some` are written.
///
/// `completed_at` is doubly optional: `Some(None)` clears the timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub category: Option<Category>,
    pub previous_category: Option<Category>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &TaskPatch::default()
    }
}

/// The signed-in owner of a task subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub display_name: Option<String>,
    pub provider: String,
}

impl Identity {
    /// Display name, or the placeholder the header shows when none is set.
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Inloggad")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(category: &str) -> Task {
        Task {
            id: "0c5e2a4f-9a7b-4a86-9d3c-1b2f3e4d5a6b".to_string(),
            text: "Buy milk".to_string(),
            category: category.to_string(),
            previous_category: None,
            completed: false,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_category_roundtrips_through_str() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
    }

    #[test]
    fn test_category_rejects_unknown_id() {
        let err = "brattom".parse::<Category>().unwrap_err();
        assert_eq!(err, UnknownCategory("brattom".to_string()));
        assert!(err.to_string().contains("viktigt_bratttom"));
    }

    #[test]
    fn test_category_from_user_input_accepts_numbers() {
        assert_eq!(Category::from_user_input("1").unwrap(), Category::ViktigtBratttom);
        assert_eq!(
            Category::from_user_input(" 4 ").unwrap(),
            Category::InteBratttomInteViktigt
        );
        assert!(Category::from_user_input("0").is_err());
        assert!(Category::from_user_input("5").is_err());
        assert_eq!(
            Category::from_user_input("bratttom_inte_viktigt").unwrap(),
            Category::BratttomInteViktigt
        );
    }

    #[test]
    fn test_category_index_matches_all_order() {
        for (i, c) in Category::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn test_task_quadrant_tolerates_unknown_values() {
        assert_eq!(task("viktigt_bratttom").quadrant(), Some(Category::ViktigtBratttom));
        assert_eq!(task("legacy_bucket").quadrant(), None);
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let json = serde_json::to_value(task("viktigt_bratttom")).unwrap();
        assert!(json.get("previousCategory").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["completedAt"], serde_json::Value::Null);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(task("viktigt_bratttom").short_id(), "0c5e2a4f");
        let mut t = task("viktigt_bratttom");
        t.id = "abc".to_string();
        assert_eq!(t.short_id(), "abc");
    }

    #[test]
    fn test_short_id_of_bare_id_respects_char_boundaries() {
        assert_eq!(short_id("0c5e2a4f-9b1d"), "0c5e2a4f");
        assert_eq!(short_id("åäöåäöåäöå"), "åäöåäöåä");
        assert_eq!(short_id(""), "");
    }

    #[test]
    fn test_empty_patch() {
        assert!(TaskPatch::default().is_empty());
        let patch = TaskPatch {
            completed_at: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_identity_display_label_falls_back() {
        let mut id = Identity {
            uid: "u1".into(),
            display_name: None,
            provider: "local".into(),
        };
        assert_eq!(id.display_label(), "Inloggad");
        id.display_name = Some("Ada".into());
        assert_eq!(id.display_label(), "Ada");
    }
}
