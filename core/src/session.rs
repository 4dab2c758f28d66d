//! Client for the identity/session backend.
//!
//! # Design
//! Every operation is a `build_*` / `parse_*` pair plus an async façade that
//! runs the pair through the transport. All responses carry a 5-byte prefix
//! ahead of the JSON and report failures in-band under `status_message`.
//!
//! `create_session` is all-or-nothing from the caller's point of view: the
//! session and profile are committed to the [`ClientContext`] only after
//! both the session POST and the profile GET succeed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{join_url, ClientConfig};
use crate::context::{parse_set_cookie, ClientContext, XSRF_COOKIE};
use crate::envelope::{self, Envelope, StatusFields, SESSION_PREFIX_LEN};
use crate::error::{ApiError, DecodeError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{EndedSession, Profile, Session};

const SESSION_PATH: &str = "api/session";
const USERS_PATH: &str = "api/users";
const ENVELOPE: Envelope = Envelope::Prefixed(SESSION_PREFIX_LEN);

#[derive(Serialize)]
struct LoginBody<'a> {
    udacity: Credentials<'a>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    account: Option<AccountBody>,
    session: Option<SessionBody>,
}

#[derive(Deserialize)]
struct AccountBody {
    key: Option<String>,
}

#[derive(Deserialize)]
struct SessionBody {
    id: Option<String>,
}

#[derive(Deserialize)]
struct EndSessionResponse {
    session: Option<SessionBody>,
}

#[derive(Deserialize)]
struct UserResponse {
    user: Option<UserBody>,
}

#[derive(Deserialize)]
struct UserBody {
    first_name: Option<String>,
    last_name: Option<String>,
}

pub struct SessionClient {
    base_url: String,
    status: StatusFields,
    transport: Arc<dyn Transport>,
}

impl SessionClient {
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: config.session_base_url.trim_end_matches('/').to_string(),
            status: config.session_status.clone(),
            transport,
        }
    }

    pub fn build_create_session(&self, username: &str, password: &str) -> Result<HttpRequest, ApiError> {
        let body = LoginBody {
            udacity: Credentials { username, password },
        };
        let body = serde_json::to_vec(&body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest::new(HttpMethod::Post, join_url(&self.base_url, SESSION_PATH))
            .with_header("Accept", "application/json")
            .with_json_body(body))
    }

    /// A backend-reported failure here means the credentials were refused.
    pub fn parse_create_session(&self, response: &HttpResponse) -> Result<Session, ApiError> {
        let value = envelope::decode(&response.body, ENVELOPE, &self.status).map_err(|err| match err {
            DecodeError::BackendReported { message, code } => ApiError::InvalidCredentials { message, code },
            other => ApiError::Decode(other),
        })?;
        let parsed: CreateSessionResponse = envelope::schema(value)?;

        let subject_id = parsed
            .account
            .ok_or(ApiError::FieldMissing("account"))?
            .key
            .ok_or(ApiError::FieldMissing("account.key"))?;
        let session_token = parsed
            .session
            .ok_or(ApiError::FieldMissing("session"))?
            .id
            .ok_or(ApiError::FieldMissing("session.id"))?;

        Ok(Session {
            session_token,
            subject_id,
        })
    }

    /// `subject_id` is opaque and always sent as a single path segment.
    pub fn build_fetch_profile(&self, subject_id: &str) -> Result<HttpRequest, ApiError> {
        let users = join_url(&self.base_url, USERS_PATH);
        let mut url = Url::parse(&users).map_err(|e| TransportError::InvalidRequest(format!("{users}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidRequest(format!("{users}: not a hierarchical URL")))?
            .push(subject_id);
        Ok(HttpRequest::new(HttpMethod::Get, url).with_header("Accept", "application/json"))
    }

    pub fn parse_fetch_profile(&self, response: &HttpResponse) -> Result<Profile, ApiError> {
        let value = envelope::decode(&response.body, ENVELOPE, &self.status)?;
        let parsed: UserResponse = envelope::schema(value)?;
        let user = parsed.user.ok_or(ApiError::FieldMissing("user"))?;
        Ok(Profile {
            first_name: user.first_name.ok_or(ApiError::FieldMissing("user.first_name"))?,
            last_name: user.last_name.ok_or(ApiError::FieldMissing("user.last_name"))?,
        })
    }

    /// DELETE the session, echoing the `XSRF-TOKEN` cookie when the context
    /// holds one.
    pub fn build_end_session(&self, ctx: &ClientContext) -> HttpRequest {
        let mut request = HttpRequest::new(HttpMethod::Delete, join_url(&self.base_url, SESSION_PATH))
            .with_header("Accept", "application/json");
        if let Some(token) = ctx.cookie(XSRF_COOKIE) {
            request = request.with_header("X-XSRF-TOKEN", token);
        }
        if let Some(cookies) = ctx.cookie_header() {
            request = request.with_header("Cookie", cookies);
        }
        request
    }

    pub fn parse_end_session(&self, response: &HttpResponse) -> Result<EndedSession, ApiError> {
        let value = envelope::decode(&response.body, ENVELOPE, &self.status)?;
        let parsed: EndSessionResponse = envelope::schema(value)?;
        let session_id = parsed
            .session
            .ok_or(ApiError::FieldMissing("session"))?
            .id
            .ok_or(ApiError::FieldMissing("session.id"))?;
        Ok(EndedSession { session_id })
    }

    /// Sign in and load the user's profile.
    ///
    /// On success the session, profile and any cookies the backend set are
    /// stored in `ctx`. If the profile step fails the whole call fails and
    /// `ctx` is left untouched, even though the backend already created the
    /// session.
    pub async fn create_session(
        &self,
        ctx: &ClientContext,
        username: &str,
        password: &str,
    ) -> Result<Profile, ApiError> {
        let request = self.build_create_session(username, password)?;
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "create session response");
        let session = self.parse_create_session(&response)?;
        let mut cookies = response_cookies(&response);

        let profile = match self.request_profile(&session.subject_id).await {
            Ok((profile, rotated)) => {
                cookies.extend(rotated);
                profile
            }
            Err(err) => {
                warn!(
                    subject_id = %session.subject_id,
                    error = %err,
                    "profile fetch failed after sign in; remote session left open"
                );
                return Err(err);
            }
        };

        info!(subject_id = %session.subject_id, "signed in");
        ctx.establish(session, profile.clone(), cookies);
        Ok(profile)
    }

    /// Fetch a user's public profile and cache it in `ctx`.
    pub async fn fetch_profile(&self, ctx: &ClientContext, subject_id: &str) -> Result<Profile, ApiError> {
        let (profile, cookies) = self.request_profile(subject_id).await?;
        ctx.store_cookies(cookies);
        ctx.set_profile(profile.clone());
        Ok(profile)
    }

    /// End the current session and clear it from `ctx`.
    ///
    /// The DELETE is sent even when `ctx` holds no session or cookies; the
    /// backend decides what to end.
    pub async fn end_session(&self, ctx: &ClientContext) -> Result<EndedSession, ApiError> {
        let request = self.build_end_session(ctx);
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "end session response");
        ctx.store_cookies(response_cookies(&response));
        let ended = self.parse_end_session(&response)?;
        info!(session_id = %ended.session_id, "signed out");
        ctx.clear_session();
        Ok(ended)
    }

    async fn request_profile(&self, subject_id: &str) -> Result<(Profile, Vec<(String, String)>), ApiError> {
        let response = self.transport.send(self.build_fetch_profile(subject_id)?).await?;
        debug!(status = response.status, "fetch profile response");
        let profile = self.parse_fetch_profile(&response)?;
        Ok((profile, response_cookies(&response)))
    }
}

/// Cookies set by a session-backend response, in header order.
fn response_cookies(response: &HttpResponse) -> Vec<(String, String)> {
    response.header_values("set-cookie").filter_map(parse_set_cookie).collect()
}
