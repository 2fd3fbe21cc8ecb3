use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

use super::ledger::{AttendanceCounts, AttendanceLedger};
use super::selector::Selection;
use crate::backend::AttendanceService;
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::attendance::{AttendanceBatch, BatchContext};
use crate::model::student::{RosterKey, Student};

/// Outcome shown right after a successful submit, taken from the ledger
/// rather than the server response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubmissionSummary {
    pub present_count: usize,
    pub absent_count: usize,
    pub late_count: usize,
}

impl From<AttendanceCounts> for SubmissionSummary {
    fn from(counts: AttendanceCounts) -> Self {
        Self {
            present_count: counts.present,
            absent_count: counts.absent,
            late_count: counts.late,
        }
    }
}

pub fn build_batch(
    selection: &Selection,
    key: &RosterKey,
    roster: &[Student],
    ledger: &AttendanceLedger,
) -> AttendanceBatch {
    AttendanceBatch {
        context: BatchContext {
            class_name: key.class_key.clone(),
            division: key.division.clone(),
            subject: selection.subject.clone(),
            date: selection.date,
        },
        items: ledger.items_for(roster),
    }
}

/// Sends the batch as a single request.
pub async fn send<S>(service: &S, batch: &AttendanceBatch) -> WorkflowResult<()>
where
    S: AttendanceService + ?Sized,
{
    let context = &batch.context;
    match service.submit_batch(batch).await {
        Ok(()) => {
            info!(
                class_name = %context.class_name,
                division = %context.division,
                subject = %context.subject,
                date = %context.date,
                items = batch.items.len(),
                "Attendance batch accepted"
            );
            Ok(())
        }
        Err(e) => {
            error!(
                error = %e,
                class_name = %context.class_name,
                division = %context.division,
                "Attendance batch rejected"
            );
            Err(WorkflowError::SubmissionFailed(e.to_string()))
        }
    }
}
