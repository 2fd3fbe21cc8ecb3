use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::model::institution::InstitutionKind;

/// Label sets the wizard offers. Product configuration, not workflow logic.
pub trait Vocabulary: Send + Sync {
    fn classes(&self, kind: InstitutionKind) -> Vec<String>;
    fn branches(&self) -> Vec<String>;
    fn divisions(&self) -> Vec<String>;
    fn subjects(&self, year_or_class: &str, branch: Option<&str>) -> Vec<String>;

    fn offers_class(&self, kind: InstitutionKind, value: &str) -> bool {
        self.classes(kind).iter().any(|c| c == value)
    }

    fn offers_branch(&self, value: &str) -> bool {
        self.branches().iter().any(|b| b == value)
    }

    fn offers_division(&self, value: &str) -> bool {
        self.divisions().iter().any(|d| d == value)
    }

    fn offers_subject(&self, year_or_class: &str, branch: Option<&str>, value: &str) -> bool {
        self.subjects(year_or_class, branch).iter().any(|s| s == value)
    }
}

static DEFAULT_SUBJECTS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        (
            "FY",
            vec![
                "Mathematics",
                "Physics",
                "Chemistry",
                "English",
                "C Programming",
                "Engineering Drawing",
            ],
        ),
        (
            "SY",
            vec![
                "Data Structures",
                "Digital Electronics",
                "Mathematics-III",
                "Object Oriented Programming",
                "Microprocessors",
            ],
        ),
        (
            "TY",
            vec![
                "Operating Systems",
                "Database Management",
                "Computer Networks",
                "Software Engineering",
                "Theory of Computation",
            ],
        ),
        (
            "SE",
            vec![
                "Engineering Mathematics",
                "Electronic Devices",
                "Data Structures",
                "Discrete Mathematics",
            ],
        ),
        (
            "TE",
            vec![
                "Computer Organization",
                "Algorithm Design",
                "Web Technology",
                "Compiler Design",
            ],
        ),
        (
            "BE",
            vec![
                "Machine Learning",
                "Cloud Computing",
                "Project Management",
                "Distributed Systems",
            ],
        ),
        (
            "8th",
            vec!["Mathematics", "Science", "English", "Social Studies", "Hindi"],
        ),
        (
            "9th",
            vec!["Mathematics", "Physics", "Chemistry", "Biology", "English", "History"],
        ),
        (
            "10th",
            vec!["Mathematics", "Science", "English", "Social Science", "Hindi", "Sanskrit"],
        ),
        (
            "11th",
            vec!["Physics", "Chemistry", "Mathematics", "English", "Computer Science"],
        ),
        (
            "12th",
            vec!["Physics", "Chemistry", "Mathematics", "English", "Computer Science"],
        ),
    ])
});

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn default_fallback_subjects() -> Vec<String> {
    strings(&["Mathematics", "Science", "English", "Hindi", "Physical Education"])
}

/// Vocabulary held in memory, either built in or loaded from a JSON file
/// of the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticVocabulary {
    pub school_classes: Vec<String>,
    pub college_years: Vec<String>,
    pub branches: Vec<String>,
    pub divisions: Vec<String>,
    /// Keyed by year/class, or by `"<year>-<branch>"` for branch-specific lists.
    #[serde(default)]
    pub subjects: HashMap<String, Vec<String>>,
    #[serde(default = "default_fallback_subjects")]
    pub fallback_subjects: Vec<String>,
}

impl Default for StaticVocabulary {
    fn default() -> Self {
        Self {
            school_classes: strings(&["8th", "9th", "10th", "11th", "12th"]),
            college_years: strings(&["FY", "SY", "TY", "SE", "TE", "BE"]),
            branches: strings(&["CS", "IT", "ENTC", "MECH", "CIVIL"]),
            divisions: strings(&["A", "B", "C", "D"]),
            subjects: DEFAULT_SUBJECTS
                .iter()
                .map(|(class, list)| (class.to_string(), strings(list)))
                .collect(),
            fallback_subjects: default_fallback_subjects(),
        }
    }
}

impl StaticVocabulary {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading vocabulary file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing vocabulary file {}", path.display()))
    }
}

impl Vocabulary for StaticVocabulary {
    fn classes(&self, kind: InstitutionKind) -> Vec<String> {
        match kind {
            InstitutionKind::School => self.school_classes.clone(),
            InstitutionKind::College => self.college_years.clone(),
        }
    }

    fn branches(&self) -> Vec<String> {
        self.branches.clone()
    }

    fn divisions(&self) -> Vec<String> {
        self.divisions.clone()
    }

    fn subjects(&self, year_or_class: &str, branch: Option<&str>) -> Vec<String> {
        if year_or_class.is_empty() {
            return Vec::new();
        }
        let branch_key = branch
            .filter(|b| !b.is_empty())
            .map(|b| format!("{year_or_class}-{b}"));

        branch_key
            .and_then(|key| self.subjects.get(&key))
            .or_else(|| self.subjects.get(year_or_class))
            .cloned()
            .unwrap_or_else(|| self.fallback_subjects.clone())
    }
}
