use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::backend::StudentDirectory;
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::student::{RosterKey, Student};

/// A resolved roster, sorted by (roll number, student id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    pub key: RosterKey,
    pub students: Vec<Student>,
    /// True when this roster came from an auto-seed.
    pub seeded: bool,
}

impl Roster {
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

/// Resolves `key` to a roster, seeding it when the directory has none and
/// `allow_auto_seed` is set. Seeds at most once per call and never when
/// `already_seeded` says this key was seeded before.
pub async fn provision<D>(
    directory: &D,
    key: &RosterKey,
    allow_auto_seed: bool,
    already_seeded: bool,
) -> WorkflowResult<Roster>
where
    D: StudentDirectory + ?Sized,
{
    let listed = directory
        .list_students(key)
        .await
        .map_err(|e| WorkflowError::DirectoryUnavailable(e.to_string()))?;
    let students = arrange(key, listed);

    if !students.is_empty() {
        info!(roster = %key, count = students.len(), "Roster loaded");
        return Ok(Roster {
            key: key.clone(),
            students,
            seeded: false,
        });
    }

    if !allow_auto_seed {
        info!(roster = %key, "Roster empty, auto-seed not requested");
        return Ok(Roster {
            key: key.clone(),
            students,
            seeded: false,
        });
    }

    if already_seeded {
        warn!(roster = %key, "Directory still empty after an earlier seed");
        return Err(WorkflowError::EmptyAfterSeed(key.clone()));
    }

    warn!(roster = %key, "Roster empty, auto-seeding student directory");
    let created = directory
        .seed_class(key)
        .await
        .map_err(|e| WorkflowError::SeedFailed {
            key: key.clone(),
            reason: e.to_string(),
        })?;
    let students = arrange(key, created);

    if students.is_empty() {
        return Err(WorkflowError::EmptyAfterSeed(key.clone()));
    }

    warn!(roster = %key, count = students.len(), "Auto-seed created students");
    Ok(Roster {
        key: key.clone(),
        students,
        seeded: true,
    })
}

/// Drops rows for other rosters, sorts, and keeps the first row per id.
/// Rows listed without a division take the requested one.
pub fn arrange(key: &RosterKey, mut students: Vec<Student>) -> Vec<Student> {
    let before = students.len();
    students.retain(|s| s.belongs_to(key));
    for s in students.iter_mut().filter(|s| s.division.is_empty()) {
        s.division = key.division.clone();
    }
    students.sort_by(Student::roster_order);

    let mut seen = HashSet::new();
    students.retain(|s| seen.insert(s.student_id.clone()));

    if students.len() != before {
        debug!(
            roster = %key,
            dropped = before - students.len(),
            "Discarded foreign or duplicate roster rows"
        );
    }
    students
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::session::fakes::{ScriptedDirectory, student};

    #[actix_web::test]
    async fn orders_by_roll_then_id() {
        let key = RosterKey::new("10th", "A");
        let rows = [
            student("S5", "10th", "A", 5),
            student("S2B", "10th", "A", 2),
            student("S2A", "10th", "A", 2),
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        for order in orders {
            let listing = order.iter().map(|&i| rows[i].clone()).collect();
            let directory = ScriptedDirectory::listing(vec![Ok(listing)]);

            let roster = provision(&directory, &key, false, false).await.unwrap();
            let ids: Vec<_> = roster.students.iter().map(|s| s.student_id.as_str()).collect();
            assert_eq!(ids, ["S2A", "S2B", "S5"], "input order {order:?}");
            assert_eq!(directory.seed_calls(), 0);
        }
    }

    #[actix_web::test]
    async fn rows_without_division_join_the_requested_division() {
        let key = RosterKey::new("10th", "A");
        let directory = ScriptedDirectory::listing(vec![Ok(vec![
            student("STU0007", "10th", "", 7),
            student("STU0003", "10th", "", 3),
            student("STU0009", "10th", "B", 9),
        ])]);

        let roster = provision(&directory, &key, true, false).await.unwrap();
        let ids: Vec<_> = roster.students.iter().map(|s| s.student_id.as_str()).collect();
        assert_eq!(ids, ["STU0003", "STU0007"]);
        assert!(roster.students.iter().all(|s| s.division == "A"));
        assert!(!roster.seeded);
        assert_eq!(directory.seed_calls(), 0);
    }

    #[actix_web::test]
    async fn empty_without_auto_seed_is_not_an_error() {
        let key = RosterKey::new("10th", "B");
        let directory = ScriptedDirectory::listing(vec![Ok(vec![])]);

        let roster = provision(&directory, &key, false, false).await.unwrap();
        assert!(roster.is_empty());
        assert!(!roster.seeded);
        assert_eq!(directory.seed_calls(), 0);
    }

    #[actix_web::test]
    async fn seeds_once_and_trusts_the_result() {
        let key = RosterKey::new("FY-IT", "B");
        let seeded = (1..=40)
            .rev()
            .map(|roll| student(&format!("STU{roll:04}"), "FY-IT", "B", roll))
            .collect();
        let directory = ScriptedDirectory::listing(vec![Ok(vec![])]).with_seed(Ok(seeded));

        let roster = provision(&directory, &key, true, false).await.unwrap();
        assert!(roster.seeded);
        assert_eq!(roster.students.len(), 40);
        assert_eq!(roster.students[0].roll_number, 1);
        assert_eq!(directory.seed_calls(), 1);
        assert_eq!(directory.list_calls(), 1);
        assert_eq!(directory.seeded_keys(), vec![key]);
    }

    #[actix_web::test]
    async fn empty_seed_result_is_a_directory_error() {
        let key = RosterKey::new("SY-CS", "A");
        let directory = ScriptedDirectory::listing(vec![Ok(vec![])]).with_seed(Ok(vec![]));

        let err = provision(&directory, &key, true, false).await.unwrap_err();
        assert_eq!(err, WorkflowError::EmptyAfterSeed(key));
        assert_eq!(directory.seed_calls(), 1);
    }

    #[actix_web::test]
    async fn never_reseeds_a_key_seeded_before() {
        let key = RosterKey::new("SY-CS", "A");
        let directory = ScriptedDirectory::listing(vec![Ok(vec![])]).with_seed(Ok(vec![]));

        let err = provision(&directory, &key, true, true).await.unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyAfterSeed(_)));
        assert_eq!(directory.seed_calls(), 0);
    }

    #[actix_web::test]
    async fn seeded_key_without_auto_seed_is_just_empty() {
        let key = RosterKey::new("10th", "A");
        let directory = ScriptedDirectory::listing(vec![Ok(vec![])]).with_seed(Ok(vec![]));

        let roster = provision(&directory, &key, false, true).await.unwrap();
        assert!(roster.is_empty());
        assert!(!roster.seeded);
        assert_eq!(directory.seed_calls(), 0);
    }

    #[actix_web::test]
    async fn failures_are_distinguishable() {
        let key = RosterKey::new("9th", "C");

        let down = ScriptedDirectory::listing(vec![Err(BackendError::Transport(
            "connection refused".into(),
        ))]);
        let err = provision(&down, &key, true, false).await.unwrap_err();
        assert!(matches!(err, WorkflowError::DirectoryUnavailable(_)));
        assert_eq!(down.seed_calls(), 0);

        let seed_down = ScriptedDirectory::listing(vec![Ok(vec![])]).with_seed(Err(
            BackendError::Status {
                status: 500,
                body: "boom".into(),
            },
        ));
        let err = provision(&seed_down, &key, true, false).await.unwrap_err();
        assert!(matches!(err, WorkflowError::SeedFailed { .. }));
        assert!(err.is_upstream());
    }

    #[test]
    fn arrange_drops_foreign_and_duplicate_rows() {
        let key = RosterKey::new("10th", "A");
        let arranged = arrange(
            &key,
            vec![
                student("S3", "10th", "A", 3),
                student("S1", "10th", "B", 1),
                student("S3", "10th", "A", 9),
                student("S2", "11th", "A", 2),
            ],
        );
        assert_eq!(arranged, vec![student("S3", "10th", "A", 3)]);
    }
}
