use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::institution::InstitutionKind;
use crate::model::student::RosterKey;

/// Wizard steps. Which ones apply depends on the institution kind.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Class,
    Branch,
    Division,
    Subject,
    Confirm,
}

const SCHOOL_STEPS: [Step; 4] = [Step::Class, Step::Division, Step::Subject, Step::Confirm];
const COLLEGE_STEPS: [Step; 5] = [
    Step::Class,
    Step::Branch,
    Step::Division,
    Step::Subject,
    Step::Confirm,
];

impl Step {
    pub fn sequence(kind: InstitutionKind) -> &'static [Step] {
        match kind {
            InstitutionKind::School => &SCHOOL_STEPS,
            InstitutionKind::College => &COLLEGE_STEPS,
        }
    }

    pub fn label(self, kind: InstitutionKind) -> &'static str {
        match (self, kind) {
            (Step::Class, InstitutionKind::College) => "Year",
            (Step::Class, InstitutionKind::School) => "Class",
            (Step::Branch, _) => "Branch",
            (Step::Division, _) => "Division",
            (Step::Subject, _) => "Subject",
            (Step::Confirm, _) => "Attendance",
        }
    }

    /// Name of the selection field this step fills, if any.
    pub fn field(self) -> Option<&'static str> {
        match self {
            Step::Class => Some("year_or_class"),
            Step::Branch => Some("branch"),
            Step::Division => Some("division"),
            Step::Subject => Some("subject"),
            Step::Confirm => None,
        }
    }
}

/// Choices accumulated for one capture session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Selection {
    pub institution_kind: InstitutionKind,
    #[schema(example = "FY")]
    pub year_or_class: String,
    /// Always empty for schools.
    #[schema(example = "IT")]
    pub branch: String,
    #[schema(example = "B")]
    pub division: String,
    #[schema(example = "Data Structures")]
    pub subject: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
}

impl Selection {
    fn new(institution_kind: InstitutionKind, date: NaiveDate) -> Self {
        Self {
            institution_kind,
            year_or_class: String::new(),
            branch: String::new(),
            division: String::new(),
            subject: String::new(),
            date,
        }
    }

    /// `yearOrClass` for schools, `yearOrClass-branch` for colleges.
    pub fn class_key(&self) -> Option<String> {
        if self.year_or_class.is_empty() {
            return None;
        }
        match self.institution_kind {
            InstitutionKind::School => Some(self.year_or_class.clone()),
            InstitutionKind::College if self.branch.is_empty() => None,
            InstitutionKind::College => Some(format!("{}-{}", self.year_or_class, self.branch)),
        }
    }

    pub fn roster_key(&self) -> Option<RosterKey> {
        if self.division.is_empty() {
            return None;
        }
        self.class_key()
            .map(|class_key| RosterKey::new(class_key, self.division.clone()))
    }

    pub fn branch_opt(&self) -> Option<&str> {
        Some(self.branch.as_str()).filter(|b| !b.is_empty())
    }

    pub fn is_satisfied(&self, step: Step) -> bool {
        match step {
            Step::Class => !self.year_or_class.is_empty(),
            Step::Branch => !self.branch.is_empty(),
            Step::Division => !self.division.is_empty(),
            Step::Subject => !self.subject.is_empty(),
            Step::Confirm => true,
        }
    }
}

/// A batch of field edits. `None` leaves a field alone, an empty string clears it.
#[derive(Debug, Clone, Default)]
pub struct SelectionChange {
    pub year_or_class: Option<String>,
    pub branch: Option<String>,
    pub division: Option<String>,
    pub subject: Option<String>,
    pub date: Option<NaiveDate>,
}

impl SelectionChange {
    pub fn is_empty(&self) -> bool {
        self.year_or_class.is_none()
            && self.branch.is_none()
            && self.division.is_none()
            && self.subject.is_none()
            && self.date.is_none()
    }
}

/// Step pointer plus the selection it gates.
///
/// The pointer never sits past the first step whose value is missing, so the
/// terminal step implies a complete selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    selection: Selection,
    current: usize,
}

impl Selector {
    pub fn new(kind: InstitutionKind, today: NaiveDate) -> Self {
        Self {
            selection: Selection::new(kind, today),
            current: 0,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn steps(&self) -> &'static [Step] {
        Step::sequence(self.selection.institution_kind)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> Step {
        self.steps()[self.current]
    }

    pub fn is_terminal(&self) -> bool {
        self.current + 1 == self.steps().len()
    }

    pub fn can_advance(&self) -> bool {
        !self.is_terminal() && self.selection.is_satisfied(self.current_step())
    }

    pub fn can_retreat(&self) -> bool {
        self.current > 0
    }

    /// No-op (returns false) when the current step's value is missing.
    pub fn advance(&mut self) -> bool {
        if !self.can_advance() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Non-destructive: values entered on later steps are kept.
    pub fn retreat(&mut self) -> bool {
        if !self.can_retreat() {
            return false;
        }
        self.current -= 1;
        true
    }

    /// First step whose requirement is unmet, if any.
    pub fn first_gap(&self) -> Option<Step> {
        self.steps()
            .iter()
            .copied()
            .find(|step| !self.selection.is_satisfied(*step))
    }

    pub fn set_year_or_class(&mut self, value: &str) -> bool {
        let value = value.trim();
        if self.selection.year_or_class == value {
            return false;
        }
        self.selection.year_or_class = value.to_string();
        // subject lists are keyed by class
        self.selection.subject.clear();
        self.clamp_to_first_gap();
        true
    }

    /// Ignored for schools.
    pub fn set_branch(&mut self, value: &str) -> bool {
        let value = value.trim();
        if !self.selection.institution_kind.has_branches() || self.selection.branch == value {
            return false;
        }
        self.selection.branch = value.to_string();
        self.selection.subject.clear();
        self.clamp_to_first_gap();
        true
    }

    pub fn set_division(&mut self, value: &str) -> bool {
        let value = value.trim();
        if self.selection.division == value {
            return false;
        }
        self.selection.division = value.to_string();
        self.clamp_to_first_gap();
        true
    }

    pub fn set_subject(&mut self, value: &str) -> bool {
        let value = value.trim();
        if self.selection.subject == value {
            return false;
        }
        self.selection.subject = value.to_string();
        self.clamp_to_first_gap();
        true
    }

    pub fn set_date(&mut self, date: NaiveDate) -> bool {
        if self.selection.date == date {
            return false;
        }
        self.selection.date = date;
        true
    }

    fn clamp_to_first_gap(&mut self) {
        if let Some(gap) = self.first_gap() {
            let gap_index = self
                .steps()
                .iter()
                .position(|step| *step == gap)
                .unwrap_or(0);
            self.current = self.current.min(gap_index);
        }
    }
}
