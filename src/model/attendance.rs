use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Per-student mark. Wire form is the single letter the backend stores.
#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum AttendanceStatus {
    #[default]
    #[serde(rename = "P", alias = "present")]
    #[strum(to_string = "P", serialize = "present")]
    Present,
    #[serde(rename = "A", alias = "absent")]
    #[strum(to_string = "A", serialize = "absent")]
    Absent,
    #[serde(rename = "L", alias = "late")]
    #[strum(to_string = "L", serialize = "late")]
    Late,
}

/// Context shared by every record of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchContext {
    pub class_name: String,
    pub division: String,
    pub subject: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub student_id: String,
    pub status: AttendanceStatus,
}

/// Body of `POST /attendance/bulk`: one request per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceBatch {
    #[serde(flatten)]
    pub context: BatchContext,
    pub items: Vec<BatchItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_accepts_letters_and_words() {
        assert_eq!(AttendanceStatus::from_str("a").unwrap(), AttendanceStatus::Absent);
        assert_eq!(AttendanceStatus::from_str("Late").unwrap(), AttendanceStatus::Late);
        assert!(AttendanceStatus::from_str("excused").is_err());
        assert_eq!(AttendanceStatus::Present.to_string(), "P");
    }

    #[test]
    fn batch_serializes_flat() {
        let batch = AttendanceBatch {
            context: BatchContext {
                class_name: "10th".into(),
                division: "A".into(),
                subject: "Mathematics".into(),
                date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            },
            items: vec![BatchItem {
                student_id: "STU0001".into(),
                status: AttendanceStatus::Late,
            }],
        };

        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["class_name"], "10th");
        assert_eq!(value["date"], "2026-10-16");
        assert_eq!(value["items"][0]["status"], "L");
    }
}
