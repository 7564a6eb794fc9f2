//! HTTP client abstraction for making requests to the eLibros API

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use url::Url;

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::store::{SessionStore, ACCESS_TOKEN_KEY};

/// Page of results as returned by the list endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paginated<T> {
    /// Total number of records across all pages
    #[serde(default)]
    pub count: u64,

    /// URL of the next page
    #[serde(default)]
    pub next: Option<String>,

    /// URL of the previous page
    #[serde(default)]
    pub previous: Option<String>,

    /// Records on this page
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

impl<T> Paginated<T> {
    /// Wrap a locally built list as a single page
    pub fn single_page(results: Vec<T>) -> Self {
        Self {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        }
    }
}

/// Navigation hook invoked when the API rejects the stored session
pub trait Redirect: Send + Sync {
    /// Send the user to `path`
    fn redirect_to(&self, path: &str);
}

/// Default redirect that only records the event in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl Redirect for LogRedirect {
    fn redirect_to(&self, path: &str) {
        info!("session rejected, redirecting to {}", path);
    }
}

/// Shared state every request needs: the HTTP client, options, the session
/// store the bearer token comes from and the redirect hook
#[derive(Clone)]
pub struct HttpContext {
    client: Client,
    options: ClientOptions,
    store: Arc<dyn SessionStore>,
    redirect: Arc<dyn Redirect>,
    signed_in: Arc<watch::Sender<bool>>,
}

impl HttpContext {
    /// Create a new context
    pub fn new(
        client: Client,
        options: ClientOptions,
        store: Arc<dyn SessionStore>,
        redirect: Arc<dyn Redirect>,
    ) -> Self {
        let (signed_in, _) = watch::channel(false);
        Self {
            client,
            options,
            store,
            redirect,
            signed_in: Arc::new(signed_in),
        }
    }

    /// Same context backed by another session store
    pub(crate) fn with_store(&self, store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            ..self.clone()
        }
    }

    /// Same context with another redirect hook
    pub(crate) fn with_redirect(&self, redirect: Arc<dyn Redirect>) -> Self {
        Self {
            redirect,
            ..self.clone()
        }
    }

    /// Client options
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Session store
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Follow session changes: `true` once a login or restored session is
    /// accepted, `false` after logout or when the API rejects the token
    pub fn on_session_change(&self) -> watch::Receiver<bool> {
        self.signed_in.subscribe()
    }

    /// Whether a session is currently active
    pub fn is_signed_in(&self) -> bool {
        *self.signed_in.borrow()
    }

    pub(crate) fn set_signed_in(&self, signed_in: bool) {
        self.signed_in.send_if_modified(|current| {
            let changed = *current != signed_in;
            *current = signed_in;
            changed
        });
    }

    fn handle_unauthorized(&self) {
        info!("invalid token, clearing authentication data");
        if let Err(e) = self.store.clear_auth() {
            warn!("failed to clear session store: {}", e);
        }
        self.set_signed_in(false);
        self.redirect.redirect_to(&self.options.login_path);
    }

    /// Check the stored access token against `/auth/verify/`.
    ///
    /// Any failure, including a missing token, counts as invalid.
    pub async fn verify_token(&self) -> bool {
        let token = match self.store.get(ACCESS_TOKEN_KEY) {
            Some(token) => token,
            None => return false,
        };

        let request = match Fetch::post(self, "/auth/verify/")
            .skip_auth()
            .json(&serde_json::json!({ "token": token }))
        {
            Ok(request) => request,
            Err(_) => return false,
        };

        match request.send_unchecked().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("token verification failed: {}", e);
                false
            }
        }
    }
}

enum Body {
    Empty,
    Json(Vec<u8>),
    Multipart(Form),
}

/// Helper for building and executing HTTP requests
pub struct FetchBuilder<'a> {
    ctx: &'a HttpContext,
    path: String,
    method: Method,
    headers: HeaderMap,
    query_params: Vec<(String, String)>,
    body: Body,
    skip_auth: bool,
}

impl<'a> FetchBuilder<'a> {
    /// Create a new FetchBuilder for an API path such as `/livros/`
    pub fn new(ctx: &'a HttpContext, path: &str, method: Method) -> Self {
        Self {
            ctx,
            path: path.to_string(),
            method,
            headers: HeaderMap::new(),
            query_params: Vec::new(),
            body: Body::Empty,
            skip_auth: false,
        }
    }

    /// Add a header to the request
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Send the request without the stored bearer token. A 401 on such a
    /// request leaves the session alone.
    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    /// Add a single query parameter
    pub fn query_pair(mut self, key: &str, value: &str) -> Self {
        self.query_params.push((key.to_string(), value.to_string()));
        self
    }

    /// Add query parameters to the request
    pub fn query(mut self, params: Vec<(String, String)>) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Body::Json(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Add a multipart body; the upload timeout applies
    pub fn multipart(mut self, form: Form) -> Self {
        self.body = Body::Multipart(form);
        self
    }

    fn is_upload(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }

    fn timeout(&self) -> Duration {
        if self.is_upload() {
            self.ctx.options.upload_timeout
        } else {
            self.ctx.options.request_timeout
        }
    }

    fn build_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.ctx.options.endpoint(&self.path))?;
        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send the request without looking at the status code
    async fn send_unchecked(self) -> Result<Response> {
        let url = self.build_url()?;
        let upload = self.is_upload();
        let timeout = self.timeout();

        let mut headers = self.headers;
        if !self.skip_auth {
            if let Some(token) = self.ctx.store.get(ACCESS_TOKEN_KEY) {
                if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                    headers.insert(AUTHORIZATION, value);
                }
            }
        }

        debug!("{} {}", self.method, url);

        let mut req = self
            .ctx
            .client
            .request(self.method, url)
            .timeout(timeout);

        match self.body {
            Body::Empty => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            Body::Json(bytes) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                req = req.body(bytes);
            }
            Body::Multipart(form) => {
                req = req.multipart(form);
            }
        }

        req.headers(headers).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(upload)
            } else if e.is_connect() {
                Error::Connection
            } else {
                Error::Http(e)
            }
        })
    }

    /// Send the request and turn non-2xx answers into [`Error::Api`].
    ///
    /// A 401 on an authenticated request also clears the session store and
    /// fires the redirect hook.
    pub async fn execute_raw(self) -> Result<Response> {
        let ctx = self.ctx;
        let skip_auth = self.skip_auth;
        let response = self.send_unchecked().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED && !skip_auth {
            ctx.handle_unauthorized();
        }

        let text = response.text().await.unwrap_or_default();
        Err(Error::api(status, extract_error_details(status, &text)))
    }

    /// Execute the request and parse the response as JSON.
    ///
    /// Answers without content (204, non-JSON or empty bodies) are decoded
    /// as an empty object.
    pub async fn execute<T: DeserializeOwned>(self) -> Result<T> {
        let response = self.execute_raw().await?;
        match read_json(response).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(serde_json::from_value(Value::Object(Default::default()))?),
        }
    }

    /// Execute the request and ignore whatever body comes back
    pub async fn execute_unit(self) -> Result<()> {
        self.execute_raw().await?;
        Ok(())
    }
}

async fn read_json(response: Response) -> Result<Option<Value>> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false);

    if response.status() == StatusCode::NO_CONTENT || !is_json {
        return Ok(None);
    }

    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(None);
    }

    Ok(serde_json::from_str::<Value>(&text).ok())
}

/// Best-effort message from an error body: `detail`, then `error`, then the
/// field errors joined as `field: a, b; other: c`, then the status code
pub fn extract_error_details(status: StatusCode, body: &str) -> String {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            return format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )
            .trim_end()
            .to_string();
        }
    };

    if let Some(detail) = value.get("detail").filter(|v| is_truthy(v)) {
        return value_text(detail);
    }
    if let Some(error) = value.get("error").filter(|v| is_truthy(v)) {
        return value_text(error);
    }
    if let Value::Object(fields) = &value {
        let joined = fields
            .iter()
            .map(|(field, errors)| match errors {
                Value::Array(items) => format!(
                    "{}: {}",
                    field,
                    items.iter().map(value_text).collect::<Vec<_>>().join(", ")
                ),
                other => format!("{}: {}", field, value_text(other)),
            })
            .collect::<Vec<_>>()
            .join("; ");
        if !joined.is_empty() {
            return joined;
        }
    }

    status.as_u16().to_string()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Image sent along a multipart request
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    /// Content type of the part; the backend sniffs the file when unset
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Wrap in-memory bytes
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime: None,
            bytes,
        }
    }

    /// Read an image from disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(&file_name, bytes))
    }

    /// Send the part with an explicit content type such as `image/png`
    pub fn with_mime(mut self, mime: &str) -> Self {
        self.mime = Some(mime.to_string());
        self
    }

    pub(crate) fn into_part(self) -> Result<Part> {
        let part = Part::bytes(self.bytes).file_name(self.file_name);
        match self.mime {
            Some(mime) => Ok(part.mime_str(&mime)?),
            None => Ok(part),
        }
    }
}

/// Flatten a record into form fields: nulls are skipped, arrays repeat the
/// field name and nested objects are sent as JSON text
pub fn form_fields<T: Serialize + ?Sized>(data: &T) -> Result<Vec<(String, String)>> {
    let mut fields = Vec::new();
    if let Value::Object(map) = serde_json::to_value(data)? {
        for (key, value) in map {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    fields.extend(items.iter().map(|item| (key.clone(), value_text(item))));
                }
                other => fields.push((key, value_text(&other))),
            }
        }
    }
    Ok(fields)
}

/// Multipart form with the record's fields plus an optional file under
/// `file_field`
pub fn multipart_form<T: Serialize + ?Sized>(
    data: &T,
    file_field: &str,
    upload: Option<Upload>,
) -> Result<Form> {
    let mut form = Form::new();
    for (key, value) in form_fields(data)? {
        form = form.text(key, value);
    }
    if let Some(upload) = upload {
        form = form.part(file_field.to_string(), upload.into_part()?);
    }
    Ok(form)
}

/// Helper for creating HTTP requests
pub struct Fetch;

impl Fetch {
    /// Create a GET request
    pub fn get<'a>(ctx: &'a HttpContext, path: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(ctx, path, Method::GET)
    }

    /// Create a POST request
    pub fn post<'a>(ctx: &'a HttpContext, path: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(ctx, path, Method::POST)
    }

    /// Create a PUT request
    pub fn put<'a>(ctx: &'a HttpContext, path: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(ctx, path, Method::PUT)
    }

    /// Create a PATCH request
    pub fn patch<'a>(ctx: &'a HttpContext, path: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(ctx, path, Method::PATCH)
    }

    /// Create a DELETE request
    pub fn delete<'a>(ctx: &'a HttpContext, path: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(ctx, path, Method::DELETE)
    }
}
