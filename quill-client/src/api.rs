use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use quill::balance::extract_balance;
use quill::credits::CreditsSynchronizer;
use quill::domain::now_timestamp_ms;
use quill::ports::{BalanceRefresh, BalanceSource};
use quill::session::SessionStore;
use shared::config::Config;
use shared::{Error, Result};

use crate::models::{
    ChangePasswordRequest, ChatMessage, ChatRequest, ChatResponse, CreditsResponse, EssayRequest,
    EssayResponse, GenerateCodeRequest, GenerateCodeResponse, HistoryResponse, LoginRequest,
    LoginResponse, MessageResponse, ProfileResponse, RedeemRequest, RedeemResponse,
    RegisterRequest, RegisterResponse, StatisticsResponse,
};
use crate::perf::CallPerformanceLog;
use crate::transport::RetryingTransport;

/// Typed client for the essay backend. Every successful response body is
/// forwarded to the credits synchronizer before deserialization.
#[derive(Clone)]
pub struct ApiClient {
    transport: RetryingTransport,
    base_url: String,
    session: SessionStore,
    synchronizer: Arc<CreditsSynchronizer>,
    perf: Option<Arc<CallPerformanceLog>>,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        transport: RetryingTransport,
        session: SessionStore,
        synchronizer: Arc<CreditsSynchronizer>,
    ) -> Self {
        Self {
            transport,
            base_url: config.api_base_url.clone(),
            session,
            synchronizer,
            perf: None,
        }
    }

    pub fn with_performance_log(mut self, perf: Arc<CallPerformanceLog>) -> Self {
        self.perf = Some(perf);
        self
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse> {
        self.post(
            "/api/register",
            &RegisterRequest {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            },
        )
        .await
    }

    /// Authenticate and persist the session on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let response: LoginResponse = self
            .post(
                "/api/login",
                &LoginRequest {
                    username: username.to_string(),
                    password: password.to_string(),
                },
            )
            .await?;
        self.session
            .save(&response.access_token, &response.user)
            .await?;
        Ok(response)
    }

    /// Drop the session and zero the published balance.
    pub async fn logout(&self) -> Result<()> {
        self.session.clear().await?;
        self.synchronizer.reset();
        Ok(())
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse> {
        self.post(
            "/api/user/change-password",
            &ChangePasswordRequest {
                old_password: old_password.to_string(),
                new_password: new_password.to_string(),
            },
        )
        .await
    }

    pub async fn profile(&self) -> Result<ProfileResponse> {
        self.get("/api/user/profile").await
    }

    pub async fn credits(&self) -> Result<CreditsResponse> {
        self.get("/api/user/credits").await
    }

    /// The response reports the credits gained, not the new balance, so
    /// callers refresh the synchronizer afterwards.
    pub async fn redeem(&self, code: &str) -> Result<RedeemResponse> {
        self.post(
            "/api/redeem",
            &RedeemRequest {
                code: code.to_string(),
            },
        )
        .await
    }

    pub async fn redemption_history(&self) -> Result<HistoryResponse> {
        self.get("/api/user/redemption-history").await
    }

    pub async fn usage_history(&self) -> Result<HistoryResponse> {
        self.get("/api/user/usage-history").await
    }

    pub async fn chat(&self, message: &str, history: Vec<ChatMessage>) -> Result<ChatResponse> {
        self.post(
            "/api/chat",
            &ChatRequest {
                message: message.to_string(),
                history,
            },
        )
        .await
    }

    pub async fn complete_essay(&self, history: Vec<ChatMessage>) -> Result<EssayResponse> {
        self.post("/api/complete_essay", &EssayRequest { history })
            .await
    }

    pub async fn generate_code(
        &self,
        credits_value: u64,
        expires_days: Option<u32>,
    ) -> Result<GenerateCodeResponse> {
        self.post(
            "/api/admin/generate-code",
            &GenerateCodeRequest {
                credits_value,
                expires_days,
            },
        )
        .await
    }

    pub async fn admin_statistics(&self) -> Result<StatisticsResponse> {
        self.get("/api/admin/statistics").await
    }

    /// Single unretried HEAD probe against the database status endpoint.
    pub async fn check_connection(&self) -> bool {
        let url = format!("{}/api/database/status", self.base_url);
        let probe = self
            .transport
            .request(Method::HEAD, &url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await;
        match probe {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                debug!("Connectivity probe against {} failed: {}", url, error);
                false
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None).await?;
        self.read(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let body = serde_json::to_value(body)
            .map_err(|e| Error::Internal(format!("Failed to serialize request body: {}", e)))?;
        let response = self.send(Method::POST, path, Some(body)).await?;
        self.read(response).await
    }

    /// The bearer token is attached whenever a session exists.
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.session.token().await;

        let started = Instant::now();
        let outcome = self
            .transport
            .execute(method, &url, |mut request| {
                if let Some(token) = &token {
                    request = request.bearer_auth(token);
                }
                if let Some(body) = &body {
                    request = request.json(body);
                }
                request
            })
            .await;

        if let Some(perf) = &self.perf {
            let success = outcome
                .as_ref()
                .map(|response| response.status().is_success())
                .unwrap_or(false);
            perf.record(path, started.elapsed().as_millis() as u64, success)
                .await;
        }

        outcome.map_err(|error| Error::Api(format!("Request to {} failed: {}", path, error)))
    }

    async fn read<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("request failed with status {}", status));
            return Err(Error::Api(message));
        }

        self.synchronizer.handle_api_response(&body).await;
        serde_json::from_value(body)
            .map_err(|e| Error::Api(format!("Unexpected response shape: {}", e)))
    }
}

/// Reads the authoritative balance from the profile endpoint.
pub struct CreditsFetcher {
    transport: RetryingTransport,
    base_url: String,
    session: SessionStore,
}

impl CreditsFetcher {
    pub fn new(config: &Config, transport: RetryingTransport, session: SessionStore) -> Self {
        Self {
            transport,
            base_url: config.api_base_url.clone(),
            session,
        }
    }
}

#[async_trait]
impl BalanceSource for CreditsFetcher {
    async fn fetch_balance(&self) -> Result<BalanceRefresh> {
        let Some(token) = self.session.token().await else {
            return Ok(BalanceRefresh::NoSession);
        };

        // The probe must bypass every cache between here and the backend.
        let url = format!(
            "{}/api/user/profile?_t={}",
            self.base_url,
            now_timestamp_ms()
        );
        let response = self
            .transport
            .execute(Method::GET, &url, move |request| {
                request
                    .bearer_auth(&token)
                    .header(CACHE_CONTROL, "no-cache")
                    .header(PRAGMA, "no-cache")
            })
            .await
            .map_err(|error| Error::Api(format!("Balance refresh failed: {}", error)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(BalanceRefresh::Unauthorized);
        }
        if !status.is_success() {
            return Err(Error::Api(format!(
                "Balance refresh failed with status {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("Failed to read profile response: {}", e)))?;
        match extract_balance(&body) {
            Some(balance) => Ok(BalanceRefresh::Balance(balance)),
            None => Err(Error::Api("Profile response carried no balance".to_string())),
        }
    }
}
