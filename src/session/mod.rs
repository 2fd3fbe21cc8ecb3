//! Attendance capture workflow: choose class, division and subject, load the
//! roster, mark each student, and submit the lot as one batch.
//!
//! [`AttendanceSession`] is a plain state object. Network calls are split into
//! `begin_*` / `finish_*` pairs so a caller that shares the session can await
//! the collaborator without holding a lock; `load_roster` and `submit` are the
//! composed versions for a caller that owns the session outright.

pub mod ledger;
pub mod roster;
pub mod selector;
pub mod submission;

#[cfg(test)]
pub(crate) mod fakes;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::backend::{AttendanceService, StudentDirectory};
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::attendance::{AttendanceBatch, AttendanceStatus};
use crate::model::institution::InstitutionKind;
use crate::model::student::{RosterKey, Student};
use crate::vocabulary::Vocabulary;

use ledger::AttendanceLedger;
use roster::Roster;
use selector::{Selection, SelectionChange, Selector, Step};
use submission::SubmissionSummary;

/// Identifies one roster request. Only the newest ticket may touch the ledger.
#[derive(Debug, Clone)]
pub struct RosterTicket {
    generation: u64,
    pub key: RosterKey,
    pub already_seeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { students: usize, seeded: bool },
    /// The selection moved on (or a newer load started) before this one finished.
    Stale,
}

pub struct AttendanceSession {
    vocabulary: Arc<dyn Vocabulary>,
    selector: Selector,
    roster: Option<Roster>,
    ledger: AttendanceLedger,
    generation: u64,
    pending_load: Option<u64>,
    seeded: HashSet<RosterKey>,
    submitting: bool,
    closed: bool,
}

impl AttendanceSession {
    pub fn new(kind: InstitutionKind, today: NaiveDate, vocabulary: Arc<dyn Vocabulary>) -> Self {
        Self {
            vocabulary,
            selector: Selector::new(kind, today),
            roster: None,
            ledger: AttendanceLedger::new(),
            generation: 0,
            pending_load: None,
            seeded: HashSet::new(),
            submitting: false,
            closed: false,
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn selection(&self) -> &Selection {
        self.selector.selection()
    }

    /// Values the vocabulary offers for the step the pointer is on.
    pub fn options(&self) -> Vec<String> {
        let selection = self.selection();
        match self.selector.current_step() {
            Step::Class => self.vocabulary.classes(selection.institution_kind),
            Step::Branch => self.vocabulary.branches(),
            Step::Division => self.vocabulary.divisions(),
            Step::Subject => self
                .vocabulary
                .subjects(&selection.year_or_class, selection.branch_opt()),
            Step::Confirm => Vec::new(),
        }
    }

    pub fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }

    /// Loaded students in display order; empty before a load.
    pub fn students(&self) -> &[Student] {
        self.roster
            .as_ref()
            .map(|r| r.students.as_slice())
            .unwrap_or_default()
    }

    pub fn roster_loaded(&self) -> bool {
        self.roster.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn can_submit(&self) -> bool {
        !self.closed
            && !self.submitting
            && self.pending_load.is_none()
            && self.selector.is_terminal()
            && self
                .roster
                .as_ref()
                .is_some_and(|r| !r.is_empty() && self.ledger.covers(&r.students))
    }

    fn ensure_editable(&self) -> WorkflowResult<()> {
        if self.closed {
            return Err(WorkflowError::SessionClosed);
        }
        if self.submitting {
            return Err(WorkflowError::Busy("submission"));
        }
        Ok(())
    }

    // ---------- selection ----------

    /// Applies every field of `change` or none of them.
    pub fn update_selection(&mut self, change: SelectionChange) -> WorkflowResult<()> {
        self.ensure_editable()?;
        if change.is_empty() {
            return Ok(());
        }

        let mut next = self.selector.clone();
        let kind = next.selection().institution_kind;

        if let Some(value) = change.year_or_class.as_deref() {
            let value = value.trim();
            if !value.is_empty() && !self.vocabulary.offers_class(kind, value) {
                return Err(WorkflowError::NotOffered {
                    field: "year_or_class",
                    value: value.to_string(),
                });
            }
            next.set_year_or_class(value);
        }

        if let Some(value) = change.branch.as_deref() {
            let value = value.trim();
            if !kind.has_branches() && !value.is_empty() {
                return Err(WorkflowError::NotOffered {
                    field: "branch",
                    value: value.to_string(),
                });
            }
            if !value.is_empty() && !self.vocabulary.offers_branch(value) {
                return Err(WorkflowError::NotOffered {
                    field: "branch",
                    value: value.to_string(),
                });
            }
            next.set_branch(value);
        }

        if let Some(value) = change.division.as_deref() {
            let value = value.trim();
            if !value.is_empty() && !self.vocabulary.offers_division(value) {
                return Err(WorkflowError::NotOffered {
                    field: "division",
                    value: value.to_string(),
                });
            }
            next.set_division(value);
        }

        if let Some(value) = change.subject.as_deref() {
            let value = value.trim();
            if !value.is_empty() {
                let selection = next.selection();
                if selection.year_or_class.is_empty() {
                    return Err(WorkflowError::SelectionIncomplete("year_or_class"));
                }
                if !self.vocabulary.offers_subject(
                    &selection.year_or_class,
                    selection.branch_opt(),
                    value,
                ) {
                    return Err(WorkflowError::NotOffered {
                        field: "subject",
                        value: value.to_string(),
                    });
                }
            }
            next.set_subject(value);
        }

        if let Some(date) = change.date {
            next.set_date(date);
        }

        self.commit_selector(next);
        Ok(())
    }

    fn commit_selector(&mut self, next: Selector) {
        let previous_key = self.selection().roster_key();
        self.selector = next;
        if self.selection().roster_key() != previous_key {
            // anything in flight now belongs to an abandoned selection
            self.generation += 1;
            self.pending_load = None;
            self.roster = None;
            self.ledger.reset();
            debug!(
                roster = ?self.selection().roster_key(),
                generation = self.generation,
                "Roster key changed, ledger reset"
            );
        }
    }

    pub fn advance(&mut self) -> bool {
        !self.closed && !self.submitting && self.selector.advance()
    }

    pub fn retreat(&mut self) -> bool {
        !self.closed && !self.submitting && self.selector.retreat()
    }

    // ---------- roster ----------

    /// Starts a roster load for the current selection. Any load already in
    /// flight is superseded and its result will be discarded.
    pub fn begin_roster_load(&mut self) -> WorkflowResult<RosterTicket> {
        self.ensure_editable()?;
        let key = match self.selection().roster_key() {
            Some(key) => key,
            None => {
                let missing = self
                    .selector
                    .first_gap()
                    .and_then(Step::field)
                    .unwrap_or("division");
                return Err(WorkflowError::SelectionIncomplete(missing));
            }
        };

        self.generation += 1;
        self.pending_load = Some(self.generation);
        Ok(RosterTicket {
            generation: self.generation,
            already_seeded: self.seeded.contains(&key),
            key,
        })
    }

    pub fn finish_roster_load(
        &mut self,
        ticket: RosterTicket,
        result: WorkflowResult<Roster>,
    ) -> WorkflowResult<LoadOutcome> {
        // seeding is durable whatever happened to the selection meanwhile
        match &result {
            Ok(roster) if roster.seeded => {
                self.seeded.insert(roster.key.clone());
            }
            Err(WorkflowError::EmptyAfterSeed(key)) => {
                self.seeded.insert(key.clone());
            }
            _ => {}
        }

        if self.closed || self.pending_load != Some(ticket.generation) {
            debug!(
                roster = %ticket.key,
                generation = ticket.generation,
                current = self.generation,
                "Discarding stale roster response"
            );
            return Ok(LoadOutcome::Stale);
        }
        self.pending_load = None;

        let roster = result?;
        self.ledger.initialize(&roster.students);
        let outcome = LoadOutcome::Applied {
            students: roster.students.len(),
            seeded: roster.seeded,
        };
        self.roster = Some(roster);
        Ok(outcome)
    }

    pub async fn load_roster<D>(
        &mut self,
        directory: &D,
        allow_auto_seed: bool,
    ) -> WorkflowResult<LoadOutcome>
    where
        D: StudentDirectory + ?Sized,
    {
        let ticket = self.begin_roster_load()?;
        let result = roster::provision(
            directory,
            &ticket.key,
            allow_auto_seed,
            ticket.already_seeded,
        )
        .await;
        self.finish_roster_load(ticket, result)
    }

    // ---------- ledger ----------

    /// Unknown students are ignored (`Ok(false)`).
    pub fn set_status(&mut self, student_id: &str, status: AttendanceStatus) -> WorkflowResult<bool> {
        self.ensure_editable()?;
        if !self.ledger.is_populated() {
            return Err(WorkflowError::RosterNotLoaded);
        }
        Ok(self.ledger.set_status(student_id, status))
    }

    pub fn set_all(&mut self, status: AttendanceStatus) -> WorkflowResult<usize> {
        self.ensure_editable()?;
        if !self.ledger.is_populated() {
            return Err(WorkflowError::RosterNotLoaded);
        }
        Ok(self.ledger.set_all(status))
    }

    // ---------- submission ----------

    /// Checks the preconditions, marks the submission pending and returns the
    /// batch to send. The ledger is not touched.
    pub fn begin_submit(&mut self) -> WorkflowResult<AttendanceBatch> {
        self.ensure_editable()?;
        if self.pending_load.is_some() {
            return Err(WorkflowError::Busy("roster load"));
        }
        if !self.selector.is_terminal() {
            let missing = self
                .selector
                .first_gap()
                .and_then(Step::field)
                .unwrap_or("confirmation");
            return Err(WorkflowError::SelectionIncomplete(missing));
        }
        let roster = self.roster.as_ref().ok_or(WorkflowError::RosterNotLoaded)?;
        if roster.is_empty() {
            return Err(WorkflowError::EmptyRoster(roster.key.clone()));
        }
        if !self.ledger.covers(&roster.students) {
            return Err(WorkflowError::RosterNotLoaded);
        }

        let batch =
            submission::build_batch(self.selection(), &roster.key, &roster.students, &self.ledger);
        debug!(roster = %roster.key, tally = %self.ledger.tally(), "Submitting attendance batch");
        self.submitting = true;
        Ok(batch)
    }

    /// Success closes the session; failure leaves everything as it was so the
    /// caller can retry.
    pub fn finish_submit(&mut self, result: WorkflowResult<()>) -> WorkflowResult<SubmissionSummary> {
        self.submitting = false;
        result?;
        self.closed = true;
        Ok(self.ledger.counts().into())
    }

    pub async fn submit<S>(&mut self, service: &S) -> WorkflowResult<SubmissionSummary>
    where
        S: AttendanceService + ?Sized,
    {
        let batch = self.begin_submit()?;
        let result = submission::send(service, &batch).await;
        self.finish_submit(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::session::fakes::{GatedDirectory, ScriptedAttendance, ScriptedDirectory, class_of};
    use crate::vocabulary::StaticVocabulary;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn session(kind: InstitutionKind) -> AttendanceSession {
        AttendanceSession::new(kind, today(), Arc::new(StaticVocabulary::default()))
    }

    fn choose(session: &mut AttendanceSession, change: SelectionChange) {
        session.update_selection(change).unwrap();
        while session.advance() {}
    }

    fn school_ready(class: &str, division: &str) -> AttendanceSession {
        let mut s = session(InstitutionKind::School);
        choose(
            &mut s,
            SelectionChange {
                year_or_class: Some(class.into()),
                division: Some(division.into()),
                subject: Some("Mathematics".into()),
                ..Default::default()
            },
        );
        s
    }

    #[actix_web::test]
    async fn college_auto_seed_fills_ledger() {
        let mut s = session(InstitutionKind::College);
        choose(
            &mut s,
            SelectionChange {
                year_or_class: Some("FY".into()),
                branch: Some("IT".into()),
                division: Some("B".into()),
                subject: Some("Physics".into()),
                ..Default::default()
            },
        );
        assert!(s.selector().is_terminal());

        let key = RosterKey::new("FY-IT", "B");
        let directory =
            ScriptedDirectory::listing(vec![Ok(vec![])]).with_seed(Ok(class_of(&key, 40)));

        let outcome = s.load_roster(&directory, true).await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                students: 40,
                seeded: true
            }
        );
        assert_eq!(directory.seeded_keys(), vec![key]);
        assert_eq!(s.ledger().len(), 40);
        assert_eq!(s.ledger().counts().present, 40);
        assert!(s.can_submit());
    }

    #[actix_web::test]
    async fn seeded_key_is_not_seeded_again_in_the_session() {
        let mut s = school_ready("10th", "C");
        let key = RosterKey::new("10th", "C");
        let directory = ScriptedDirectory::listing(vec![Ok(vec![])]).with_seed(Ok(vec![]));

        let err = s.load_roster(&directory, true).await.unwrap_err();
        assert_eq!(err, WorkflowError::EmptyAfterSeed(key.clone()));
        assert!(!s.is_loading());

        // retry: still empty, must not seed a second time
        let err = s.load_roster(&directory, true).await.unwrap_err();
        assert_eq!(err, WorkflowError::EmptyAfterSeed(key));
        assert_eq!(directory.seed_calls(), 1);
    }

    #[actix_web::test]
    async fn failed_submit_leaves_ledger_untouched_and_retry_works() {
        let mut s = school_ready("10th", "A");
        let key = RosterKey::new("10th", "A");
        let directory = ScriptedDirectory::listing(vec![Ok(class_of(&key, 10))]);
        s.load_roster(&directory, false).await.unwrap();
        s.set_all(AttendanceStatus::Absent).unwrap();
        s.set_status(&class_of(&key, 10)[3].student_id, AttendanceStatus::Late)
            .unwrap();

        let before = s.ledger().clone();
        let selection_before = s.selection().clone();
        let service = ScriptedAttendance::answering(vec![
            Err(BackendError::Status {
                status: 503,
                body: "maintenance".into(),
            }),
            Ok(()),
        ]);

        let err = s.submit(&service).await.unwrap_err();
        assert!(matches!(err, WorkflowError::SubmissionFailed(_)));
        assert_eq!(s.ledger(), &before);
        assert_eq!(s.selection(), &selection_before);
        assert!(!s.is_submitting());
        assert!(!s.is_closed());

        let summary = s.submit(&service).await.unwrap();
        assert_eq!(
            summary,
            SubmissionSummary {
                present_count: 0,
                absent_count: 9,
                late_count: 1
            }
        );
        assert!(s.is_closed());

        let received = service.received();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0], received[1]);
        assert_eq!(received[1].items.len(), 10);
    }

    #[actix_web::test]
    async fn stale_roster_response_is_discarded() {
        let mut s = school_ready("10th", "A");
        let key_a = RosterKey::new("10th", "A");
        let key_b = RosterKey::new("10th", "B");

        let (slow, release) = GatedDirectory::new();
        let ticket_a = s.begin_roster_load().unwrap();
        let pending_a = roster::provision(&slow, &ticket_a.key, false, false);

        s.update_selection(SelectionChange {
            division: Some("B".into()),
            ..Default::default()
        })
        .unwrap();
        let fast = ScriptedDirectory::listing(vec![Ok(class_of(&key_b, 3))]);
        let ticket_b = s.begin_roster_load().unwrap();
        let result_b = roster::provision(&fast, &ticket_b.key, false, false).await;
        assert!(matches!(
            s.finish_roster_load(ticket_b, result_b).unwrap(),
            LoadOutcome::Applied { students: 3, .. }
        ));

        release.send(class_of(&key_a, 5)).unwrap();
        let result_a = pending_a.await;
        assert_eq!(s.finish_roster_load(ticket_a, result_a).unwrap(), LoadOutcome::Stale);

        assert_eq!(s.ledger().len(), 3);
        assert!(s.ledger().covers(&class_of(&key_b, 3)));
        assert_eq!(s.students(), class_of(&key_b, 3).as_slice());
    }

    #[actix_web::test]
    async fn newer_load_for_same_key_supersedes_older() {
        let mut s = school_ready("9th", "A");
        let key = RosterKey::new("9th", "A");
        let first = s.begin_roster_load().unwrap();
        let second = s.begin_roster_load().unwrap();

        let ok = |n: i64| -> WorkflowResult<Roster> {
            Ok(Roster {
                key: key.clone(),
                students: class_of(&key, n),
                seeded: false,
            })
        };
        assert!(matches!(
            s.finish_roster_load(second, ok(2)).unwrap(),
            LoadOutcome::Applied { students: 2, .. }
        ));
        assert_eq!(s.finish_roster_load(first, ok(7)).unwrap(), LoadOutcome::Stale);
        assert_eq!(s.ledger().len(), 2);
    }

    #[actix_web::test]
    async fn directory_failure_keeps_previous_roster() {
        let mut s = school_ready("11th", "D");
        let key = RosterKey::new("11th", "D");
        let directory = ScriptedDirectory::listing(vec![
            Ok(class_of(&key, 4)),
            Err(BackendError::Transport("reset by peer".into())),
        ]);
        s.load_roster(&directory, false).await.unwrap();

        let err = s.load_roster(&directory, false).await.unwrap_err();
        assert!(matches!(err, WorkflowError::DirectoryUnavailable(_)));
        assert!(!s.is_loading());
        assert_eq!(s.ledger().len(), 4);
    }

    #[actix_web::test]
    async fn changing_division_drops_the_roster() {
        let mut s = school_ready("10th", "A");
        let key = RosterKey::new("10th", "A");
        let directory = ScriptedDirectory::listing(vec![Ok(class_of(&key, 5))]);
        s.load_roster(&directory, false).await.unwrap();
        assert!(s.roster_loaded());

        s.update_selection(SelectionChange {
            division: Some("B".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(!s.roster_loaded());
        assert!(!s.ledger().is_populated());
        assert_eq!(s.set_all(AttendanceStatus::Late), Err(WorkflowError::RosterNotLoaded));

        // subject and date changes keep the roster
        let directory = ScriptedDirectory::listing(vec![Ok(class_of(&RosterKey::new("10th", "B"), 2))]);
        s.load_roster(&directory, false).await.unwrap();
        s.update_selection(SelectionChange {
            subject: Some("Science".into()),
            date: Some(NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(s.ledger().len(), 2);
    }

    #[test]
    fn rejects_values_outside_the_vocabulary() {
        let mut s = session(InstitutionKind::School);
        let err = s
            .update_selection(SelectionChange {
                year_or_class: Some("10th".into()),
                division: Some("Z".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::NotOffered {
                field: "division",
                value: "Z".into()
            }
        );
        // all or nothing
        assert_eq!(s.selection().year_or_class, "");

        assert!(matches!(
            s.update_selection(SelectionChange {
                branch: Some("IT".into()),
                ..Default::default()
            }),
            Err(WorkflowError::NotOffered { field: "branch", .. })
        ));
        assert_eq!(
            s.update_selection(SelectionChange {
                subject: Some("Science".into()),
                ..Default::default()
            }),
            Err(WorkflowError::SelectionIncomplete("year_or_class"))
        );
    }

    #[test]
    fn options_follow_the_current_step() {
        let mut s = session(InstitutionKind::College);
        assert!(s.options().contains(&"FY".to_string()));
        s.update_selection(SelectionChange {
            year_or_class: Some("SY".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(s.advance());
        assert!(s.options().contains(&"ENTC".to_string()));
        s.update_selection(SelectionChange {
            branch: Some("CS".into()),
            division: Some("A".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(s.advance());
        assert!(s.advance());
        assert_eq!(s.selector().current_step(), Step::Subject);
        assert!(s.options().contains(&"Data Structures".to_string()));
    }

    #[test]
    fn submit_requires_terminal_step_and_roster() {
        let mut s = session(InstitutionKind::School);
        assert_eq!(
            s.begin_submit(),
            Err(WorkflowError::SelectionIncomplete("year_or_class"))
        );
        assert_eq!(
            s.begin_roster_load().unwrap_err(),
            WorkflowError::SelectionIncomplete("year_or_class")
        );

        let mut s = school_ready("8th", "A");
        assert_eq!(s.begin_submit(), Err(WorkflowError::RosterNotLoaded));
    }

    #[actix_web::test]
    async fn empty_roster_cannot_be_submitted() {
        let mut s = school_ready("8th", "B");
        let directory = ScriptedDirectory::listing(vec![Ok(vec![])]);
        s.load_roster(&directory, false).await.unwrap();
        assert!(s.roster_loaded());
        assert!(s.ledger().is_empty());
        assert_eq!(
            s.begin_submit(),
            Err(WorkflowError::EmptyRoster(RosterKey::new("8th", "B")))
        );
    }

    #[actix_web::test]
    async fn pending_submission_blocks_edits() {
        let mut s = school_ready("12th", "A");
        let key = RosterKey::new("12th", "A");
        let directory = ScriptedDirectory::listing(vec![Ok(class_of(&key, 2))]);
        s.load_roster(&directory, false).await.unwrap();

        let batch = s.begin_submit().unwrap();
        assert_eq!(batch.items.len(), 2);
        assert!(s.is_submitting());
        assert_eq!(s.begin_submit(), Err(WorkflowError::Busy("submission")));
        assert_eq!(
            s.set_all(AttendanceStatus::Absent),
            Err(WorkflowError::Busy("submission"))
        );
        assert!(!s.retreat());

        let summary = s.finish_submit(Ok(())).unwrap();
        assert_eq!(summary.present_count, 2);
        assert_eq!(s.set_status("x", AttendanceStatus::Late), Err(WorkflowError::SessionClosed));
    }
}
