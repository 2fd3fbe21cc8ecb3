use std::sync::{Arc, MutexGuard};

use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::api::error::{ApiError, ErrorBody};
use crate::auth::auth::AuthUser;
use crate::backend::BackendProvider;
use crate::calendar;
use crate::config::Config;
use crate::model::attendance::AttendanceStatus;
use crate::model::institution::InstitutionKind;
use crate::session::ledger::{AttendanceCounts, PercentageBar};
use crate::session::selector::{Selection, SelectionChange, Step};
use crate::session::submission::{self, SubmissionSummary};
use crate::session::{AttendanceSession, LoadOutcome, roster};
use crate::utils::session_store::{SessionEntry, SessionStore};
use crate::vocabulary::Vocabulary;

#[derive(Deserialize, Default, ToSchema)]
pub struct CreateSession {
    /// Ignored when the token already names the institution type.
    #[schema(example = "college")]
    pub institution_type: Option<InstitutionKind>,
    /// Defaults to today.
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
}

/// Fields to change. Omitted fields are kept, empty strings clear.
#[derive(Deserialize, ToSchema)]
pub struct SelectionUpdate {
    #[schema(example = "FY")]
    pub year_or_class: Option<String>,
    #[schema(example = "IT")]
    pub branch: Option<String>,
    #[schema(example = "B")]
    pub division: Option<String>,
    #[schema(example = "Physics")]
    pub subject: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
}

impl From<SelectionUpdate> for SelectionChange {
    fn from(update: SelectionUpdate) -> Self {
        SelectionChange {
            year_or_class: update.year_or_class,
            branch: update.branch,
            division: update.division,
            subject: update.subject,
            date: update.date,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RosterQuery {
    /// Seed the directory when the roster is empty. Defaults to the server setting.
    pub allow_auto_seed: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct StatusUpdate {
    #[schema(example = "A")]
    pub status: AttendanceStatus,
}

#[derive(Serialize, ToSchema)]
pub struct StepView {
    pub step: Step,
    #[schema(example = "Year")]
    pub label: String,
}

#[derive(Serialize, ToSchema)]
pub struct RosterRow {
    #[schema(example = "STU0001")]
    pub student_id: String,
    #[schema(example = "Aarav Patel")]
    pub name: String,
    #[schema(example = 1)]
    pub roll_number: i64,
    pub status: Option<AttendanceStatus>,
}

#[derive(Serialize, ToSchema)]
pub struct SessionView {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub selection: Selection,
    pub steps: Vec<StepView>,
    pub current_step: Step,
    pub current_index: usize,
    pub can_advance: bool,
    pub can_retreat: bool,
    /// Choices for the current step.
    pub options: Vec<String>,
    /// Advisory; attendance may be taken on any date.
    pub working_day: bool,
    pub roster_loaded: bool,
    pub loading: bool,
    pub submitting: bool,
    pub closed: bool,
    pub can_submit: bool,
    pub students: Vec<RosterRow>,
    pub counts: AttendanceCounts,
    pub percentages: PercentageBar,
}

impl SessionView {
    pub fn capture(id: Uuid, session: &AttendanceSession) -> Self {
        let selector = session.selector();
        let kind = session.selection().institution_kind;
        let ledger = session.ledger();

        Self {
            id,
            selection: session.selection().clone(),
            steps: selector
                .steps()
                .iter()
                .map(|step| StepView {
                    step: *step,
                    label: step.label(kind).to_string(),
                })
                .collect(),
            current_step: selector.current_step(),
            current_index: selector.current_index(),
            can_advance: selector.can_advance(),
            can_retreat: selector.can_retreat(),
            options: session.options(),
            working_day: calendar::is_working_day(session.selection().date),
            roster_loaded: session.roster_loaded(),
            loading: session.is_loading(),
            submitting: session.is_submitting(),
            closed: session.is_closed(),
            can_submit: session.can_submit(),
            students: session
                .students()
                .iter()
                .map(|s| RosterRow {
                    student_id: s.student_id.clone(),
                    name: s.name.clone(),
                    roll_number: s.roll_number,
                    status: ledger.status(&s.student_id),
                })
                .collect(),
            counts: ledger.counts(),
            percentages: ledger.percentage_bar(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RosterLoaded {
    /// False when the selection moved on before the roster arrived.
    pub applied: bool,
    pub seeded: bool,
    pub session: SessionView,
}

#[derive(Serialize, ToSchema)]
pub struct SubmitResponse {
    pub summary: SubmissionSummary,
    pub session: SessionView,
}

async fn find(store: &SessionStore, id: &Uuid, auth: &AuthUser) -> Result<Arc<SessionEntry>, ApiError> {
    store
        .get(id, &auth.principal())
        .await
        .ok_or(ApiError::SessionNotFound)
}

fn lock(entry: &SessionEntry) -> Result<MutexGuard<'_, AttendanceSession>, ApiError> {
    entry
        .session
        .lock()
        .map_err(|_| ApiError::Internal("session state poisoned".to_string()))
}

fn view(entry: &SessionEntry) -> Result<HttpResponse, ApiError> {
    let session = lock(entry)?;
    Ok(HttpResponse::Ok().json(SessionView::capture(entry.id, &session)))
}

/* =========================
Open a capture session
========================= */
#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body(content = CreateSession, content_type = "application/json"),
    responses(
        (status = 201, description = "Session opened", body = SessionView),
        (status = 400, description = "Institution type unknown", body = ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
pub async fn create_session(
    auth: AuthUser,
    store: web::Data<SessionStore>,
    vocabulary: web::Data<dyn Vocabulary>,
    payload: Option<web::Json<CreateSession>>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.map(web::Json::into_inner).unwrap_or_default();
    let kind = auth
        .institution
        .or(payload.institution_type)
        .ok_or_else(|| ApiError::BadRequest("institution_type is required".to_string()))?;
    let date = payload.date.unwrap_or_else(|| Local::now().date_naive());

    let session = AttendanceSession::new(kind, date, vocabulary.into_inner());
    let entry = store.insert(&auth.principal(), session).await;
    info!(
        session_id = %entry.id,
        user = %auth.username,
        institution = %kind,
        "Attendance session opened"
    );

    let session = lock(&entry)?;
    Ok(HttpResponse::Created().json(SessionView::capture(entry.id, &session)))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{session_id}",
    params(("session_id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Current session state", body = SessionView),
        (status = 404, description = "Unknown or expired session", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
pub async fn get_session(
    auth: AuthUser,
    store: web::Data<SessionStore>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let entry = find(&store, &path.into_inner(), &auth).await?;
    view(&entry)
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{session_id}",
    params(("session_id" = String, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session discarded"),
        (status = 404, description = "Unknown or expired session", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
pub async fn close_session(
    auth: AuthUser,
    store: web::Data<SessionStore>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if !store.remove(&id, &auth.principal()).await {
        return Err(ApiError::SessionNotFound);
    }
    info!(session_id = %id, user = %auth.username, "Attendance session discarded");
    Ok(HttpResponse::NoContent().finish())
}

/* =========================
Selection wizard
========================= */
#[utoipa::path(
    put,
    path = "/api/sessions/{session_id}/selection",
    params(("session_id" = String, Path, description = "Session id")),
    request_body(content = SelectionUpdate, content_type = "application/json"),
    responses(
        (status = 200, description = "Selection updated", body = SessionView),
        (status = 404, description = "Unknown or expired session", body = ErrorBody),
        (status = 409, description = "Submission in progress", body = ErrorBody),
        (status = 410, description = "Session already submitted", body = ErrorBody),
        (status = 422, description = "Value not offered", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
pub async fn update_selection(
    auth: AuthUser,
    store: web::Data<SessionStore>,
    path: web::Path<Uuid>,
    payload: web::Json<SelectionUpdate>,
) -> Result<HttpResponse, ApiError> {
    let entry = find(&store, &path.into_inner(), &auth).await?;
    lock(&entry)?.update_selection(payload.into_inner().into())?;
    view(&entry)
}

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/advance",
    params(("session_id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Step pointer after the move; unchanged when the step is unanswered", body = SessionView),
        (status = 404, description = "Unknown or expired session", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
pub async fn advance(
    auth: AuthUser,
    store: web::Data<SessionStore>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let entry = find(&store, &path.into_inner(), &auth).await?;
    lock(&entry)?.advance();
    view(&entry)
}

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/retreat",
    params(("session_id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Step pointer after the move", body = SessionView),
        (status = 404, description = "Unknown or expired session", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
pub async fn retreat(
    auth: AuthUser,
    store: web::Data<SessionStore>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let entry = find(&store, &path.into_inner(), &auth).await?;
    lock(&entry)?.retreat();
    view(&entry)
}

/* =========================
Roster
========================= */
#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/roster",
    params(
        ("session_id" = String, Path, description = "Session id"),
        RosterQuery
    ),
    responses(
        (status = 200, description = "Roster loaded (or discarded as stale)", body = RosterLoaded),
        (status = 404, description = "Unknown or expired session", body = ErrorBody),
        (status = 422, description = "Selection incomplete", body = ErrorBody),
        (status = 502, description = "Student directory failed", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
pub async fn load_roster(
    auth: AuthUser,
    store: web::Data<SessionStore>,
    backend: web::Data<dyn BackendProvider>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    query: web::Query<RosterQuery>,
) -> Result<HttpResponse, ApiError> {
    let entry = find(&store, &path.into_inner(), &auth).await?;
    let ticket = lock(&entry)?.begin_roster_load()?;
    let allow_auto_seed = query.allow_auto_seed.unwrap_or(config.allow_auto_seed);
    let directory = backend.connect(&auth.token);

    // detached so the pending load is settled even if the client disconnects
    let task = actix_web::rt::spawn(async move {
        let result = roster::provision(
            directory.as_ref(),
            &ticket.key,
            allow_auto_seed,
            ticket.already_seeded,
        )
        .await;

        let mut session = lock(&entry)?;
        let outcome = session.finish_roster_load(ticket, result)?;
        let (applied, seeded) = match outcome {
            LoadOutcome::Applied { seeded, .. } => (true, seeded),
            LoadOutcome::Stale => (false, false),
        };
        Ok::<_, ApiError>(RosterLoaded {
            applied,
            seeded,
            session: SessionView::capture(entry.id, &session),
        })
    });

    let loaded = task
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(loaded))
}

/* =========================
Marking
========================= */
#[utoipa::path(
    put,
    path = "/api/sessions/{session_id}/students/{student_id}",
    params(
        ("session_id" = String, Path, description = "Session id"),
        ("student_id" = String, Path, description = "Student on the loaded roster")
    ),
    request_body(content = StatusUpdate, content_type = "application/json"),
    responses(
        (status = 200, description = "Status recorded", body = SessionView),
        (status = 404, description = "Unknown session or student", body = ErrorBody),
        (status = 409, description = "Submission in progress", body = ErrorBody),
        (status = 422, description = "No roster loaded", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
pub async fn set_status(
    auth: AuthUser,
    store: web::Data<SessionStore>,
    path: web::Path<(Uuid, String)>,
    payload: web::Json<StatusUpdate>,
) -> Result<HttpResponse, ApiError> {
    let (id, student_id) = path.into_inner();
    let entry = find(&store, &id, &auth).await?;
    if !lock(&entry)?.set_status(&student_id, payload.status)? {
        return Err(ApiError::StudentNotFound(student_id));
    }
    view(&entry)
}

#[utoipa::path(
    put,
    path = "/api/sessions/{session_id}/students",
    params(("session_id" = String, Path, description = "Session id")),
    request_body(content = StatusUpdate, content_type = "application/json"),
    responses(
        (status = 200, description = "Every student set to the same status", body = SessionView),
        (status = 404, description = "Unknown or expired session", body = ErrorBody),
        (status = 409, description = "Submission in progress", body = ErrorBody),
        (status = 422, description = "No roster loaded", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
pub async fn set_all(
    auth: AuthUser,
    store: web::Data<SessionStore>,
    path: web::Path<Uuid>,
    payload: web::Json<StatusUpdate>,
) -> Result<HttpResponse, ApiError> {
    let entry = find(&store, &path.into_inner(), &auth).await?;
    lock(&entry)?.set_all(payload.status)?;
    view(&entry)
}

/* =========================
Submit
========================= */
#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/submit",
    params(("session_id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Batch accepted; the session is discarded", body = SubmitResponse),
        (status = 404, description = "Unknown or expired session", body = ErrorBody),
        (status = 409, description = "Submission or roster load in progress", body = ErrorBody),
        (status = 410, description = "Session already submitted", body = ErrorBody),
        (status = 422, description = "Selection or roster incomplete", body = ErrorBody),
        (status = 502, description = "Attendance service rejected the batch", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
pub async fn submit(
    auth: AuthUser,
    store: web::Data<SessionStore>,
    backend: web::Data<dyn BackendProvider>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let entry = find(&store, &id, &auth).await?;
    let batch = lock(&entry)?.begin_submit()?;
    let service = backend.connect(&auth.token);

    // detached so the submitting flag is always cleared
    let task = actix_web::rt::spawn(async move {
        let result = submission::send(service.as_ref(), &batch).await;

        let mut session = lock(&entry)?;
        let summary = session.finish_submit(result)?;
        Ok::<_, ApiError>(SubmitResponse {
            summary,
            session: SessionView::capture(entry.id, &session),
        })
    });

    let submitted = task
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    // closed sessions are of no further use
    store.remove(&id, &auth.principal()).await;
    info!(session_id = %id, user = %auth.username, "Attendance submitted, session discarded");
    Ok(HttpResponse::Ok().json(submitted))
}
