use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::info;

use super::{AttendanceService, Backend, BackendError, BackendProvider, StudentDirectory};
use crate::model::attendance::AttendanceBatch;
use crate::model::student::{RosterKey, Student};

/// Students created by one seed call.
pub const SEED_BATCH_SIZE: i64 = 40;

const FIRST_NAMES: [&str; 20] = [
    "Aarav", "Vivaan", "Aditya", "Vihaan", "Arjun", "Sai", "Reyansh", "Ayan", "Krishna", "Ishaan",
    "Shaurya", "Atharv", "Advik", "Pranav", "Advaith", "Aaryan", "Dhruv", "Kabir", "Ritvik", "Darsh",
];

const LAST_NAMES: [&str; 20] = [
    "Patel", "Sharma", "Singh", "Kumar", "Gupta", "Desai", "Mehta", "Joshi", "Reddy", "Nair",
    "Bhat", "Rao", "Saxena", "Iyer", "Kulkarni", "Das", "Chopra", "Verma", "Mishra", "Shetty",
];

/// In-process directory and attendance sink, used when no upstream backend
/// is configured.
#[derive(Default)]
pub struct MemoryBackend {
    students: Mutex<Vec<Student>>,
    batches: Mutex<Vec<AttendanceBatch>>,
    last_id: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_students(students: Vec<Student>) -> Self {
        Self {
            students: Mutex::new(students),
            ..Self::default()
        }
    }

    /// Batches received so far, oldest first.
    pub fn submitted(&self) -> Vec<AttendanceBatch> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }

    pub fn student_count(&self) -> usize {
        self.students.lock().map(|s| s.len()).unwrap_or_default()
    }

    fn next_student_id(&self) -> String {
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("STU{id:04}")
    }

    fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, BackendError> {
        mutex
            .lock()
            .map_err(|_| BackendError::Transport("in-memory store poisoned".to_string()))
    }
}

fn synthetic_name(roll: i64) -> String {
    let i = roll as usize;
    format!(
        "{} {}",
        FIRST_NAMES[i % FIRST_NAMES.len()],
        LAST_NAMES[(i * 7 + 3) % LAST_NAMES.len()]
    )
}

#[async_trait]
impl StudentDirectory for MemoryBackend {
    async fn list_students(&self, key: &RosterKey) -> Result<Vec<Student>, BackendError> {
        let students = Self::lock(&self.students)?;
        Ok(students
            .iter()
            .filter(|s| s.belongs_to(key))
            .cloned()
            .collect())
    }

    async fn seed_class(&self, key: &RosterKey) -> Result<Vec<Student>, BackendError> {
        let seeded: Vec<Student> = (1..=SEED_BATCH_SIZE)
            .map(|roll| Student {
                student_id: self.next_student_id(),
                name: synthetic_name(roll),
                class_name: key.class_key.clone(),
                division: key.division.clone(),
                roll_number: roll,
            })
            .collect();

        Self::lock(&self.students)?.extend(seeded.iter().cloned());
        info!(roster = %key, count = seeded.len(), "Seeded in-memory roster");
        Ok(seeded)
    }
}

#[async_trait]
impl AttendanceService for MemoryBackend {
    async fn submit_batch(&self, batch: &AttendanceBatch) -> Result<(), BackendError> {
        Self::lock(&self.batches)?.push(batch.clone());
        Ok(())
    }
}

impl BackendProvider for Arc<MemoryBackend> {
    fn connect(&self, _bearer_token: &str) -> Arc<dyn Backend> {
        self.clone()
    }
}
