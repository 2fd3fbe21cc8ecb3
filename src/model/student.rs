use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One roster entry as the student directory returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "student_id": "STU0001",
        "name": "Aarav Patel",
        "class_name": "FY-IT",
        "division": "B",
        "roll_no": 1
    })
)]
pub struct Student {
    #[schema(example = "STU0001")]
    pub student_id: String,

    #[schema(example = "Aarav Patel")]
    pub name: String,

    /// Composite class key the student was fetched or seeded under
    #[schema(example = "FY-IT")]
    pub class_name: String,

    #[schema(example = "B")]
    #[serde(default)]
    pub division: String,

    #[schema(example = 1)]
    #[serde(rename = "roll_no")]
    pub roll_number: i64,
}

impl Student {
    /// Display order: roll number, then student id.
    pub fn roster_order(&self, other: &Self) -> Ordering {
        self.roll_number
            .cmp(&other.roll_number)
            .then_with(|| self.student_id.cmp(&other.student_id))
    }

    /// Rows without a division belong to every division of their class.
    pub fn belongs_to(&self, key: &RosterKey) -> bool {
        self.class_name == key.class_key
            && (self.division.is_empty() || self.division == key.division)
    }
}

/// (class key, division) pair identifying exactly one roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub struct RosterKey {
    #[schema(example = "FY-IT")]
    pub class_key: String,
    #[schema(example = "B")]
    pub division: String,
}

impl RosterKey {
    pub fn new(class_key: impl Into<String>, division: impl Into<String>) -> Self {
        Self {
            class_key: class_key.into(),
            division: division.into(),
        }
    }
}

impl fmt::Display for RosterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.class_key, self.division)
    }
}
