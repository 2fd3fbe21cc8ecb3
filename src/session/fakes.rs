//! Scripted collaborators for workflow tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::channel::oneshot;

use crate::backend::{AttendanceService, BackendError, StudentDirectory};
use crate::model::attendance::AttendanceBatch;
use crate::model::student::{RosterKey, Student};

pub fn student(id: &str, class_name: &str, division: &str, roll: i64) -> Student {
    Student {
        student_id: id.to_string(),
        name: format!("Student {id}"),
        class_name: class_name.to_string(),
        division: division.to_string(),
        roll_number: roll,
    }
}

pub fn class_of(key: &RosterKey, n: i64) -> Vec<Student> {
    (1..=n)
        .map(|roll| {
            student(
                &format!("{}-{}-{roll:02}", key.class_key, key.division),
                &key.class_key,
                &key.division,
                roll,
            )
        })
        .collect()
}

type Listing = Result<Vec<Student>, BackendError>;

/// Replays queued listings (the last one repeats) and a single seed result.
pub struct ScriptedDirectory {
    listings: Mutex<VecDeque<Listing>>,
    seed: Mutex<Option<Listing>>,
    list_calls: AtomicUsize,
    seed_calls: AtomicUsize,
    seeded_keys: Mutex<Vec<RosterKey>>,
}

impl ScriptedDirectory {
    pub fn listing(listings: Vec<Listing>) -> Self {
        Self {
            listings: Mutex::new(listings.into()),
            seed: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            seed_calls: AtomicUsize::new(0),
            seeded_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn with_seed(self, result: Listing) -> Self {
        *self.seed.lock().unwrap() = Some(result);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn seed_calls(&self) -> usize {
        self.seed_calls.load(Ordering::SeqCst)
    }

    pub fn seeded_keys(&self) -> Vec<RosterKey> {
        self.seeded_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl StudentDirectory for ScriptedDirectory {
    async fn list_students(&self, _key: &RosterKey) -> Result<Vec<Student>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut listings = self.listings.lock().unwrap();
        if listings.len() > 1 {
            listings.pop_front().unwrap()
        } else {
            listings.front().cloned().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    async fn seed_class(&self, key: &RosterKey) -> Result<Vec<Student>, BackendError> {
        self.seed_calls.fetch_add(1, Ordering::SeqCst);
        self.seeded_keys.lock().unwrap().push(key.clone());
        self.seed
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(BackendError::Transport("no seed scripted".into())))
    }
}

/// Holds the listing back until the test releases it.
pub struct GatedDirectory {
    gate: Mutex<Option<oneshot::Receiver<Vec<Student>>>>,
}

impl GatedDirectory {
    pub fn new() -> (Self, oneshot::Sender<Vec<Student>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                gate: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl StudentDirectory for GatedDirectory {
    async fn list_students(&self, _key: &RosterKey) -> Result<Vec<Student>, BackendError> {
        let gate = self.gate.lock().unwrap().take();
        match gate {
            Some(rx) => rx
                .await
                .map_err(|_| BackendError::Transport("gate dropped".into())),
            None => Ok(Vec::new()),
        }
    }

    async fn seed_class(&self, _key: &RosterKey) -> Result<Vec<Student>, BackendError> {
        Err(BackendError::Transport("not scripted".into()))
    }
}

/// Answers submissions from a queue (the last answer repeats).
pub struct ScriptedAttendance {
    answers: Mutex<VecDeque<Result<(), BackendError>>>,
    received: Mutex<Vec<AttendanceBatch>>,
}

impl ScriptedAttendance {
    pub fn answering(answers: Vec<Result<(), BackendError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<AttendanceBatch> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttendanceService for ScriptedAttendance {
    async fn submit_batch(&self, batch: &AttendanceBatch) -> Result<(), BackendError> {
        self.received.lock().unwrap().push(batch.clone());
        let mut answers = self.answers.lock().unwrap();
        if answers.len() > 1 {
            answers.pop_front().unwrap()
        } else {
            answers.front().cloned().unwrap_or(Ok(()))
        }
    }
}
