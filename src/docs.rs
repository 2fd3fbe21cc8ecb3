use crate::api::error::ErrorBody;
use crate::api::session::{
    CreateSession, RosterLoaded, RosterRow, SelectionUpdate, SessionView, StatusUpdate, StepView,
    SubmitResponse,
};
use crate::api::vocabulary::VocabularyView;
use crate::auth::auth::Principal;
use crate::model::attendance::AttendanceStatus;
use crate::model::institution::InstitutionKind;
use crate::session::ledger::{AttendanceCounts, PercentageBar};
use crate::session::selector::{Selection, Step};
use crate::session::submission::SubmissionSummary;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Desk API",
        version = "0.1.0",
        description = r#"
## Class attendance capture

A teacher opens a session, picks the class (or year and branch), division,
subject and date, loads the roster, marks each student **P**, **A** or **L**
and submits the whole class as one batch.

### Security
Every endpoint expects a **JWT Bearer** token from the institution's identity
service. Only `admin` and `teacher` roles may capture attendance, and a session
is visible only to the user who opened it.

### Roster seeding
When a roster is empty, `POST /sessions/{id}/roster?allow_auto_seed=true`
creates a batch of 40 students in the directory. This is a durable write and is
done at most once per roster in a session.
"#,
    ),
    paths(
        crate::api::vocabulary::me,
        crate::api::vocabulary::get_vocabulary,

        crate::api::session::create_session,
        crate::api::session::get_session,
        crate::api::session::close_session,
        crate::api::session::update_selection,
        crate::api::session::advance,
        crate::api::session::retreat,
        crate::api::session::load_roster,
        crate::api::session::set_status,
        crate::api::session::set_all,
        crate::api::session::submit
    ),
    components(
        schemas(
            ErrorBody,
            Principal,
            VocabularyView,
            CreateSession,
            SelectionUpdate,
            StatusUpdate,
            SessionView,
            StepView,
            RosterRow,
            RosterLoaded,
            SubmitResponse,
            Selection,
            Step,
            InstitutionKind,
            AttendanceStatus,
            AttendanceCounts,
            PercentageBar,
            SubmissionSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Session", description = "Attendance capture sessions"),
        (name = "Vocabulary", description = "Labels and caller identity"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
