use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Fixed for a whole capture session. Decides the step sequence and
/// whether a branch is part of the class key.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum InstitutionKind {
    School,
    College,
}

impl InstitutionKind {
    pub fn has_branches(self) -> bool {
        matches!(self, InstitutionKind::College)
    }
}
