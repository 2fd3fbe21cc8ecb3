use std::collections::BTreeMap;

use serde::Serialize;
use strum::IntoEnumIterator;
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceStatus, BatchItem};
use crate::model::student::Student;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttendanceCounts {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
}

impl AttendanceCounts {
    pub fn total(&self) -> usize {
        self.present + self.absent + self.late
    }
}

/// Fractions for a stacked bar. All zero for an empty ledger, otherwise they
/// sum to 1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct PercentageBar {
    pub present: f64,
    pub absent: f64,
    pub late: f64,
}

/// Working status map for the loaded roster.
///
/// Either empty (nothing loaded) or populated with exactly one entry per
/// roster student; [`AttendanceLedger::initialize`] is the only way in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceLedger {
    entries: BTreeMap<String, AttendanceStatus>,
    populated: bool,
}

impl AttendanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole map; every student starts Present.
    pub fn initialize(&mut self, roster: &[Student]) {
        self.entries = roster
            .iter()
            .map(|s| (s.student_id.clone(), AttendanceStatus::default()))
            .collect();
        self.populated = true;
    }

    /// Back to the empty state, used when the selection moves to another roster.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.populated = false;
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status(&self, student_id: &str) -> Option<AttendanceStatus> {
        self.entries.get(student_id).copied()
    }

    /// Unknown ids are ignored; returns whether an entry was updated.
    pub fn set_status(&mut self, student_id: &str, status: AttendanceStatus) -> bool {
        match self.entries.get_mut(student_id) {
            Some(entry) => {
                *entry = status;
                true
            }
            None => false,
        }
    }

    pub fn set_all(&mut self, status: AttendanceStatus) -> usize {
        self.entries.values_mut().for_each(|entry| *entry = status);
        self.entries.len()
    }

    pub fn counts(&self) -> AttendanceCounts {
        let mut counts = AttendanceCounts::default();
        for status in self.entries.values() {
            match status {
                AttendanceStatus::Present => counts.present += 1,
                AttendanceStatus::Absent => counts.absent += 1,
                AttendanceStatus::Late => counts.late += 1,
            }
        }
        counts
    }

    pub fn percentage_bar(&self) -> PercentageBar {
        let counts = self.counts();
        let total = counts.total();
        if total == 0 {
            return PercentageBar::default();
        }
        let total = total as f64;
        PercentageBar {
            present: counts.present as f64 / total,
            absent: counts.absent as f64 / total,
            late: counts.late as f64 / total,
        }
    }

    /// True when the key set is exactly the roster's ids.
    pub fn covers(&self, roster: &[Student]) -> bool {
        self.populated
            && roster.len() == self.entries.len()
            && roster.iter().all(|s| self.entries.contains_key(&s.student_id))
    }

    /// Entries in roster order, ready for a batch payload.
    pub fn items_for(&self, roster: &[Student]) -> Vec<BatchItem> {
        roster
            .iter()
            .filter_map(|s| {
                self.status(&s.student_id).map(|status| BatchItem {
                    student_id: s.student_id.clone(),
                    status,
                })
            })
            .collect()
    }

    /// Per-status tally keyed by the wire letter, for log fields.
    pub fn tally(&self) -> String {
        let counts = self.counts();
        AttendanceStatus::iter()
            .map(|status| {
                let n = match status {
                    AttendanceStatus::Present => counts.present,
                    AttendanceStatus::Absent => counts.absent,
                    AttendanceStatus::Late => counts.late,
                };
                format!("{status}={n}")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
