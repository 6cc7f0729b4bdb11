use super::types::CategoryList;
use super::{
    ApiError, Backend, Category, CategoryForm, CategoryId, Entry, EntryId, EntryPage, FeedId,
    FeedUpdate, MoveDirection, NewFeed, UserForm,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Cap on any API response body.
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Name of the backend's session cookie.
const SESSION_COOKIE: &str = "session";

const JSON: &str = "application/json; charset=utf-8";
const FORM: &str = "application/x-www-form-urlencoded";

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub allow_insecure: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 2,
            allow_insecure: false,
        }
    }
}

/// reqwest implementation of [`Backend`].
///
/// Redirects are never followed: the server answers an unauthenticated API
/// call with a redirect to its login page, which is reported as
/// [`ApiError::Unauthorized`] instead of being decoded as HTML.
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    options: ClientOptions,
    session: Option<SecretString>,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base", &self.base.as_str())
            .field("session", &self.session.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl HttpBackend {
    pub fn new(options: ClientOptions) -> Result<Self, ApiError> {
        let mut base = Url::parse(options.base_url.trim())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", options.base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                base.scheme()
            )));
        }
        // Relative joins keep a path prefix such as https://host/rss/
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base,
            options,
            session: None,
        })
    }

    /// Use an existing session id instead of logging in.
    pub fn with_session(mut self, session: SecretString) -> Self {
        self.session = Some(session);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Log in through the HTML form endpoint and keep the session cookie.
    pub async fn login(&mut self, username: &str, password: &SecretString) -> Result<(), ApiError> {
        if !self.is_secure() {
            if !self.options.allow_insecure {
                tracing::error!(base_url = %self.base, "Refusing to send credentials over plain HTTP");
                return Err(ApiError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %self.base, "Sending credentials over plain HTTP (allow_insecure)");
        }

        let url = self.endpoint("login")?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .append_pair("password", password.expose_secret())
            .finish();

        let response = tokio::time::timeout(
            self.options.request_timeout,
            self.client
                .post(url)
                .header(CONTENT_TYPE, FORM)
                .body(body)
                .send(),
        )
        .await
        .map_err(|_| ApiError::Timeout(self.options.request_timeout.as_secs()))??;

        // A successful login redirects; a failed one re-renders the form with 200.
        if !response.status().is_redirection() {
            return Err(ApiError::Login(format!(
                "server answered {} (wrong username or password?)",
                response.status().as_u16()
            )));
        }

        let session = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_from_set_cookie)
            .ok_or_else(|| ApiError::Login("no session cookie in response".to_string()))?;

        tracing::info!(username, "Logged in");
        self.session = Some(SecretString::from(session));
        Ok(())
    }

    /// HTTPS, or plain HTTP against the local machine.
    fn is_secure(&self) -> bool {
        if self.base.scheme() == "https" {
            return true;
        }
        matches!(
            self.base.host_str(),
            Some("localhost") | Some("127.0.0.1") | Some("[::1]")
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Send one request and return the response body.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<(&'static str, String)>,
    ) -> Result<String, ApiError> {
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(session) = &self.session {
            request = request.header(
                COOKIE,
                format!("{}={}", SESSION_COOKIE, session.expose_secret()),
            );
        }
        if let Some((content_type, body)) = body {
            request = request.header(CONTENT_TYPE, content_type).body(body);
        }

        tracing::trace!(method = %method, url = %url, "API request");

        let timeout = self.options.request_timeout;
        let response = tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout(timeout.as_secs()))?
            .map_err(ApiError::Network)?;

        let status = response.status();
        if status.is_redirection() || status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status.as_u16()));
        }

        read_limited_text(response, MAX_RESPONSE_SIZE).await
    }

    /// GET with retry on transient failures.
    /// Uses exponential backoff: 1s, 2s, 4s... up to `max_retries`.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let mut retry_count = 0;

        let body = loop {
            match self.execute(Method::GET, url.clone(), None).await {
                Ok(body) => break body,
                Err(e) if e.is_retryable() && retry_count < self.options.max_retries => {
                    let delay = 1u64 << retry_count;
                    tracing::debug!(
                        error = %e,
                        url = %url,
                        retry = retry_count + 1,
                        delay_secs = delay,
                        "Retrying API request after transient error"
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        };

        Ok(serde_json::from_str(&body)?)
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<(), ApiError> {
        let body = serde_json::to_string(body)?;
        self.execute(method, url, Some((JSON, body))).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let list: CategoryList = self.get_json(self.endpoint("api/category/")?).await?;
        Ok(list.objects)
    }

    async fn create_category(&self, form: &CategoryForm) -> Result<(), ApiError> {
        self.send_json(Method::POST, self.endpoint("api/category/")?, form)
            .await
    }

    async fn update_category(&self, id: CategoryId, form: &CategoryForm) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/category/{}/", id))?;
        self.send_json(Method::POST, url, form).await
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/category/{}/", id))?;
        self.execute(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn move_category(
        &self,
        id: CategoryId,
        direction: MoveDirection,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/category/{}/{}", id, direction.path_segment()))?;
        self.execute(Method::POST, url, None).await?;
        Ok(())
    }

    async fn create_feed(&self, form: &NewFeed) -> Result<(), ApiError> {
        self.send_json(Method::POST, self.endpoint("api/feed/")?, form)
            .await
    }

    async fn update_feed(&self, id: FeedId, form: &FeedUpdate) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/feed/{}/", id))?;
        self.send_json(Method::PUT, url, form).await
    }

    async fn delete_feed(&self, id: FeedId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/feed/{}/", id))?;
        self.execute(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn list_entries(&self, feed: FeedId) -> Result<EntryPage, ApiError> {
        let mut url = self.endpoint("api/entry/")?;
        url.query_pairs_mut().append_pair("feed", &feed.to_string());
        self.get_json(url).await
    }

    async fn search_entries(&self, phrase: &str) -> Result<EntryPage, ApiError> {
        let mut url = self.endpoint("api/entry/search/")?;
        url.query_pairs_mut().append_pair("phrase", phrase);
        self.get_json(url).await
    }

    async fn fetch_page(&self, next_url: &str) -> Result<EntryPage, ApiError> {
        // Cursors come back as absolute paths ("/api/entry/?feed=1&page=2") or full URLs.
        let url = self.endpoint(next_url)?;
        self.get_json(url).await
    }

    async fn fetch_entry(&self, id: EntryId) -> Result<Entry, ApiError> {
        self.get_json(self.endpoint(&format!("api/entry/{}", id))?)
            .await
    }

    async fn update_user(&self, form: &UserForm) -> Result<(), ApiError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("name", &form.name)
            .append_pair("email", &form.email)
            .append_pair("password", &form.password)
            .finish();
        self.execute(Method::POST, self.endpoint("api/user/")?, Some((FORM, body)))
            .await?;
        Ok(())
    }
}

/// Extract the session id from one `Set-Cookie` header value.
fn session_from_set_cookie(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    if name.trim() == SESSION_COOKIE && !value.trim().is_empty() {
        Some(value.trim().to_string())
    } else {
        None
    }
}

async fn read_limited_text(response: reqwest::Response, limit: usize) -> Result<String, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| ApiError::InvalidUtf8)
}
