//! JSON-over-HTTP backend.
//!
//! Endpoints, relative to the base URL:
//! - `POST /auth/login`, `POST /auth/register`
//! - `GET /auth/me`, `POST /auth/logout` (bearer)
//! - `PUT /instructor/onboarding/steps/{n}` (bearer)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::model::{AccessToken, AuthResponse, Registration, Role, User};
use crate::auth::service::AuthService;
use crate::error::{AuthError, ConfigError, PersistenceError};
use crate::onboarding::model::{FormData, OnboardingStep};
use crate::onboarding::service::{PersistenceProvider, StepPersistence};

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    password: &'a str,
    role: Role,
}

#[derive(Deserialize)]
struct AuthResponseBody {
    access_token: String,
    user: User,
}

#[derive(Serialize)]
struct StepBody<'a> {
    step: u8,
    data: &'a FormData,
}

/// Shape of a 422 response. Both fields are optional on the wire.
#[derive(Deserialize, Default)]
struct ValidationBody {
    #[serde(default)]
    field: Option<String>,
    #[serde(default, alias = "detail")]
    message: Option<String>,
}

/// HTTP client for the auth and onboarding endpoints.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "TUTORLY_REQUEST_TIMEOUT_MS".into(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Step persistence authorized with `token`.
    pub fn steps(&self, token: AccessToken) -> HttpStepSaver {
        HttpStepSaver {
            api: self.clone(),
            token,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> AuthError {
        if e.is_timeout() {
            AuthError::Timeout(self.timeout)
        } else {
            AuthError::service(e)
        }
    }

    async fn auth_response(&self, resp: reqwest::Response) -> Result<AuthResponse, AuthError> {
        let resp = self.check_status(resp).await?;
        let body: AuthResponseBody = resp
            .json()
            .await
            .map_err(|e| AuthError::service(format!("malformed auth response: {e}")))?;
        Ok(AuthResponse {
            access_token: AccessToken::new(body.access_token),
            user: body.user,
        })
    }

    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, AuthError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        match status {
            StatusCode::UNAUTHORIZED => Err(AuthError::InvalidCredentials),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let body: ValidationBody = resp.json().await.unwrap_or_default();
                Err(AuthError::validation(
                    body.field.unwrap_or_else(|| "request".into()),
                    body.message.unwrap_or_else(|| "rejected by server".into()),
                ))
            }
            _ => {
                let text = resp.text().await.unwrap_or_default();
                Err(AuthError::service(format!("HTTP {status}: {text}")))
            }
        }
    }
}

#[async_trait]
impl AuthService for HttpApi {
    async fn login(&self, email: &str, password: &SecretString) -> Result<AuthResponse, AuthError> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginBody {
                email,
                password: password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.auth_response(resp).await
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, AuthError> {
        let resp = self
            .client
            .post(self.url("/auth/register"))
            .json(&RegisterBody {
                first_name: &registration.first_name,
                last_name: &registration.last_name,
                email: &registration.email,
                password: registration.password.expose_secret(),
                role: registration.role,
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.auth_response(resp).await
    }

    async fn current_user(&self, token: &AccessToken) -> Result<User, AuthError> {
        let resp = self
            .client
            .get(self.url("/auth/me"))
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let resp = self.check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| AuthError::service(format!("malformed user: {e}")))
    }

    async fn logout(&self, token: &AccessToken) -> Result<(), AuthError> {
        let resp = self
            .client
            .post(self.url("/auth/logout"))
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.check_status(resp).await?;
        debug!("Remote session closed");
        Ok(())
    }
}

impl PersistenceProvider for HttpApi {
    fn for_session(&self, token: &AccessToken, _user: &User) -> Arc<dyn StepPersistence> {
        Arc::new(self.steps(token.clone()))
    }
}

/// `PUT`s each step to the onboarding endpoint.
pub struct HttpStepSaver {
    api: HttpApi,
    token: AccessToken,
}

#[async_trait]
impl StepPersistence for HttpStepSaver {
    async fn save_step(&self, step: OnboardingStep, payload: &FormData) -> Result<(), PersistenceError> {
        let index = step.index();
        let resp = self
            .api
            .client
            .put(self.api.url(&format!("/instructor/onboarding/steps/{index}")))
            .bearer_auth(self.token.expose())
            .json(&StepBody {
                step: index,
                data: payload,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PersistenceError::Timeout(self.api.timeout)
                } else {
                    PersistenceError::SaveFailed {
                        step: index,
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(step = index, status = %status, "Onboarding step rejected");
            return Err(PersistenceError::SaveFailed {
                step: index,
                reason: format!("HTTP {status}: {text}"),
            });
        }
        Ok(())
    }
}
