use quill::domain::UserInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One turn of an assistant conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Bare acknowledgement used by several endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditsResponse {
    pub credits: u64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedeemRequest {
    pub code: String,
}

/// Redemption reports the delta, not the new balance.
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemResponse {
    pub message: String,
    pub credits_gained: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub message: String,
    pub history: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub history: Vec<ChatMessage>,
    pub credits_remaining: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EssayRequest {
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EssayResponse {
    pub completed_essay: String,
    pub credits_remaining: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateCodeRequest {
    pub credits_value: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateCodeResponse {
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatisticsResponse {
    pub message: String,
    pub statistics: Value,
}

/// Shape of every non-2xx body the backend produces.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
