use serde::{Deserialize, Serialize};

/// Claims issued by the upstream identity service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub org_code: Option<String>,
    /// `school` or `college`; absent when the account spans both.
    #[serde(default)]
    pub institution_type: Option<String>,
    #[serde(default)]
    pub jti: Option<String>,
    /// Missing means access token.
    #[serde(default)]
    pub token_type: Option<TokenType>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl Claims {
    pub fn is_access(&self) -> bool {
        self.token_type.as_ref().is_none_or(|t| *t == TokenType::Access)
    }
}
