use serde::{Deserialize, Serialize};

/// Body of `POST /auth/v1/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Analyst,
    Buyer,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMeta {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub meta: Option<UserMeta>,
    /// Token type, usually `Bearer`
    #[serde(rename = "type", default)]
    pub token_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_decodes_roles() {
        let raw = r#"{"token":"jwt","meta":{"roles":["ADMIN","AUDITOR"],"userId":7},"type":"Bearer"}"#;
        let resp: LoginResponse = serde_json::from_str(raw).unwrap();
        let meta = resp.meta.unwrap();
        assert_eq!(meta.roles, vec![Role::Admin, Role::Unknown]);
        assert_eq!(meta.user_id, 7);
        assert_eq!(resp.token_type, "Bearer");
    }
}
