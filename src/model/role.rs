use strum_macros::{Display, EnumString};

/// Roles the upstream backend puts in the `role` claim.
/// Anything else is not allowed to take attendance.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    Admin,
    Teacher,
}

impl Role {
    pub fn from_claim(value: &str) -> Option<Self> {
        value.trim().parse().ok()
    }
}
