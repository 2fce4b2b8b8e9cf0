//! CSRF-compliant request pipeline for the console API.
//!
//! The server uses a double-submit cookie: it sets `XSRF-TOKEN` on a
//! bootstrap call and expects the value echoed in `X-XSRF-TOKEN` on every
//! mutating request. The token lives only in the cookie store and is re-read
//! for each request, because the server may rotate it on any response.
//!
//! Flow Overview:
//! - Mutating verbs force a fresh bootstrap before sending; GET attaches the
//!   token when present and bootstraps only when it is missing.
//! - Concurrent bootstraps collapse into one network call: callers queue on
//!   an async gate, and anyone who observes a bootstrap completed while
//!   queued returns without issuing another request.
//! - Responses are classified into the [`ApiError`] taxonomy; the one case
//!   where the client navigates on its own is a 419, since the browser may
//!   be holding the stale token across tabs and a retry is unsafe.

use crate::browser::{CookieSource, JarCookies, Navigator, NullNavigator};
use crate::config::ApiConfig;
use crate::errors::{ApiError, sanitize_body};
use reqwest::cookie::Jar;
use reqwest::{Method, Response, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::sleep;
use tracing::{Instrument, debug, info_span, warn};
use url::Url;

/// Cookie the server sets on bootstrap.
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";
/// Header the server expects the cookie value echoed in.
pub const XSRF_HEADER: &str = "X-XSRF-TOKEN";

const CSRF_COOKIE_PATH: &str = "/sanctum/csrf-cookie";
const REQUESTED_WITH_HEADER: &str = "X-Requested-With";
const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";
const APPLICATION_JSON: &str = "application/json";

/// HTTP client that performs all API calls with CSRF compliance and a stable
/// error taxonomy. Cheap to share behind an [`Arc`].
pub struct CsrfClient {
    http: reqwest::Client,
    cookies: Arc<dyn CookieSource>,
    navigator: Arc<dyn Navigator>,
    config: ApiConfig,
    bootstrap_gate: tokio::sync::Mutex<()>,
    bootstraps_completed: AtomicU64,
}

impl CsrfClient {
    /// Builds a client with its own cookie jar; the jar is shared between
    /// the request pipeline and the token reads.
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] when the session base URL does not parse
    /// or the underlying client cannot be constructed.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let origin = Url::parse(&config.session_base_url)
            .map_err(|err| ApiError::Config(format!("invalid session base URL: {err}")))?;
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .cookie_provider(jar.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ApiError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            cookies: Arc::new(JarCookies::new(jar, origin)),
            navigator: Arc::new(NullNavigator),
            config,
            bootstrap_gate: tokio::sync::Mutex::new(()),
            bootstraps_completed: AtomicU64::new(0),
        })
    }

    /// Installs the navigator used for the 419 hard redirect.
    #[must_use]
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Substitutes the cookie source, for embeddings without a reqwest jar.
    #[must_use]
    pub fn with_cookie_source(mut self, cookies: Arc<dyn CookieSource>) -> Self {
        self.cookies = cookies;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Current CSRF token, read fresh from the cookie store.
    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        self.cookies.get(XSRF_COOKIE)
    }

    /// Asks the server to set the CSRF cookie.
    ///
    /// Idempotent under concurrency: callers queue on the bootstrap gate,
    /// and a caller that observes a bootstrap completed while it was queued
    /// returns without another round-trip. With `force` false the call is a
    /// no-op when a token is already visible.
    ///
    /// # Errors
    /// Returns [`ApiError::Bootstrap`] when the call fails; nothing is
    /// mutated on failure (the token only ever lives in the cookie store).
    pub async fn bootstrap_csrf(&self, force: bool) -> Result<(), ApiError> {
        if !force && self.csrf_token().is_some() {
            return Ok(());
        }

        let observed = self.bootstraps_completed.load(Ordering::Acquire);
        let _gate = self.bootstrap_gate.lock().await;
        if self.bootstraps_completed.load(Ordering::Acquire) != observed {
            // Someone else finished a bootstrap while we queued; the cookie
            // they fetched is the current one.
            return Ok(());
        }

        let url = self.config.session_url(CSRF_COOKIE_PATH);
        let span = info_span!("csrf.bootstrap", http.method = "GET", url = %url);
        let response = self
            .http
            .get(&url)
            .header(header::ACCEPT, APPLICATION_JSON)
            .header(REQUESTED_WITH_HEADER, REQUESTED_WITH_VALUE)
            .send()
            .instrument(span)
            .await
            .map_err(|err| ApiError::Bootstrap(transport_error(err).to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::Bootstrap(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        // The cookie-jar write is not guaranteed visible on the same tick as
        // the response resolves.
        sleep(self.config.cookie_settle).await;
        if self.csrf_token().is_none() {
            debug!("bootstrap succeeded but no CSRF cookie is visible yet");
        }

        self.bootstraps_completed.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// GET returning a JSON body.
    ///
    /// # Errors
    /// Returns the classified [`ApiError`] for the response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, None::<&()>).await?;
        decode(response).await
    }

    /// POST returning a JSON body.
    ///
    /// # Errors
    /// Returns the classified [`ApiError`] for the response.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::POST, path, Some(body)).await?;
        decode(response).await
    }

    /// POST whose response body is irrelevant.
    ///
    /// # Errors
    /// Returns the classified [`ApiError`] for the response.
    pub async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        self.send(Method::POST, path, Some(body)).await.map(|_| ())
    }

    /// PUT returning a JSON body.
    ///
    /// # Errors
    /// Returns the classified [`ApiError`] for the response.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::PUT, path, Some(body)).await?;
        decode(response).await
    }

    /// DELETE returning a JSON body.
    ///
    /// # Errors
    /// Returns the classified [`ApiError`] for the response.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::DELETE, path, None::<&()>).await?;
        decode(response).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let mutating = method != Method::GET && method != Method::HEAD;
        if mutating {
            // A mutating call cannot rely on a possibly-stale token.
            self.bootstrap_csrf(true).await?;
        } else if self.csrf_token().is_none() {
            self.bootstrap_csrf(true).await?;
        }

        let url = self.config.api_url(path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(header::ACCEPT, APPLICATION_JSON)
            .header(REQUESTED_WITH_HEADER, REQUESTED_WITH_VALUE);

        if let Some(token) = self.csrf_token() {
            request = request.header(XSRF_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let span = info_span!("api.request", http.method = %method, url = %url);
        let response = request
            .send()
            .instrument(span)
            .await
            .map_err(transport_error)?;

        self.classify(response).await
    }

    async fn classify(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 => Err(ApiError::Auth {
                message: extract_message(&body)
                    .unwrap_or_else(|| "Unauthenticated.".to_string()),
            }),
            419 => {
                if let Err(err) = self.bootstrap_csrf(true).await {
                    warn!(%err, "re-bootstrap after CSRF mismatch failed");
                }
                self.navigator.replace(&self.config.login_path);
                Err(ApiError::CsrfMismatch {
                    message: extract_message(&body)
                        .unwrap_or_else(|| "CSRF token mismatch.".to_string()),
                })
            }
            422 => Err(parse_validation(&body)),
            _ => Err(ApiError::Server {
                status: status.as_u16(),
                message: extract_message(&body).unwrap_or_else(|| sanitize_body(&body)),
            }),
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::Decode(err.to_string()))
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(err.to_string())
    }
}

/// Pulls the conventional `{"message": "..."}` field out of an error body.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value.get("message")?.as_str()?.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

fn parse_validation(body: &str) -> ApiError {
    #[derive(serde::Deserialize)]
    struct ValidationBody {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        errors: HashMap<String, Vec<String>>,
    }

    match serde_json::from_str::<ValidationBody>(body) {
        Ok(parsed) => ApiError::Validation {
            message: parsed
                .message
                .unwrap_or_else(|| "The given data was invalid.".to_string()),
            errors: parsed.errors,
        },
        Err(_) => ApiError::Validation {
            message: sanitize_body(body),
            errors: HashMap::new(),
        },
    }
}
