use crate::model::{institution::InstitutionKind, role::Role};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};
use serde::Serialize;
use utoipa::ToSchema;

/// Identity of the caller, placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub user_id: Option<u64>,
    pub org_code: Option<String>,
    pub role: Role,
    pub institution: Option<InstitutionKind>,
    /// Forwarded as-is to the upstream backend.
    pub token: String,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(ErrorUnauthorized("Missing token"))),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Principal {
    pub username: String,
    pub user_id: Option<u64>,
    pub org_code: Option<String>,
    #[schema(example = "teacher")]
    pub role: String,
    pub institution_type: Option<InstitutionKind>,
}

impl AuthUser {
    /// Key that owns sessions; the org code keeps equal usernames apart.
    pub fn principal(&self) -> String {
        match &self.org_code {
            Some(org) => format!("{org}/{}", self.username),
            None => self.username.clone(),
        }
    }

    pub fn describe(&self) -> Principal {
        Principal {
            username: self.username.clone(),
            user_id: self.user_id,
            org_code: self.org_code.clone(),
            role: self.role.to_string(),
            institution_type: self.institution,
        }
    }
}
