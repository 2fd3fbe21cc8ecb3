use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::{AuthUser, Principal};
use crate::model::institution::InstitutionKind;
use crate::vocabulary::Vocabulary;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VocabularyQuery {
    /// Only needed for subjects.
    pub year_or_class: Option<String>,
    pub branch: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct VocabularyView {
    #[schema(example = json!(["8th", "9th", "10th"]))]
    pub school_classes: Vec<String>,
    #[schema(example = json!(["FY", "SY", "TY"]))]
    pub college_years: Vec<String>,
    pub branches: Vec<String>,
    pub divisions: Vec<String>,
    /// Empty unless `year_or_class` was given.
    pub subjects: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/vocabulary",
    params(VocabularyQuery),
    responses(
        (status = 200, description = "Labels the selection wizard offers", body = VocabularyView),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Vocabulary"
)]
pub async fn get_vocabulary(
    _auth: AuthUser,
    vocabulary: web::Data<dyn Vocabulary>,
    query: web::Query<VocabularyQuery>,
) -> impl Responder {
    let subjects = match query.year_or_class.as_deref().map(str::trim) {
        Some(year_or_class) if !year_or_class.is_empty() => {
            vocabulary.subjects(year_or_class, query.branch.as_deref().map(str::trim))
        }
        _ => Vec::new(),
    };

    HttpResponse::Ok().json(VocabularyView {
        school_classes: vocabulary.classes(InstitutionKind::School),
        college_years: vocabulary.classes(InstitutionKind::College),
        branches: vocabulary.branches(),
        divisions: vocabulary.divisions(),
        subjects,
    })
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Identity taken from the bearer token", body = Principal),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Vocabulary"
)]
pub async fn me(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(auth.describe())
}
