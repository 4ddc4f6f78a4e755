use crate::error::ClientError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A query parameter value; `Multi` repeats the key once per element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => ParamValue::Multi(items.iter().map(json_text).collect()),
            other => ParamValue::Single(json_text(other)),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Multi(values)
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Status, headers and decoded body of one HTTP exchange
#[derive(Debug, Clone)]
pub struct ResponseData {
    pub body: String,
    pub headers: HeaderMap,
    pub status: StatusCode,
}

/// Outcome of a single request.
///
/// HTTP error statuses are not raised; they come back as `Failure` with the
/// reason phrase as body and an error count one higher than the caller passed in.
#[derive(Debug, Clone)]
pub enum ApiResponse {
    Success(ResponseData),
    Failure {
        response: ResponseData,
        error_count: u32,
    },
}

impl ApiResponse {
    pub fn data(&self) -> &ResponseData {
        match self {
            ApiResponse::Success(data) => data,
            ApiResponse::Failure { response, .. } => response,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.data().status
    }

    pub fn body(&self) -> &str {
        &self.data().body
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.data().headers
    }

    pub fn error_count(&self) -> u32 {
        match self {
            ApiResponse::Success(_) => 0,
            ApiResponse::Failure { error_count, .. } => *error_count,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    /// Decode the body as JSON.
    ///
    /// Malformed JSON yields an empty JSON string instead of an error, so a garbled
    /// body looks like an empty result to the caller. Use [`ApiResponse::parse`]
    /// when a typed failure is wanted.
    pub fn json(&self) -> Value {
        serde_json::from_str(self.body()).unwrap_or_else(|_| Value::String(String::new()))
    }

    /// Deserialize the body into `T`, failing on missing or malformed fields
    pub fn parse<T: DeserializeOwned>(&self, context: &str) -> Result<T, ClientError> {
        serde_json::from_str(self.body()).map_err(|source| ClientError::MalformedBody {
            context: context.to_string(),
            source,
        })
    }
}

/// Fully resolved request, ready to hand to reqwest
#[derive(Debug)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Builder for one HTTP call against a JSON API
#[derive(Debug, Clone)]
pub struct HttpRequest {
    url: String,
    method: String,
    params: Vec<(String, ParamValue)>,
    data: Map<String, Value>,
    headers: Vec<(String, String)>,
    data_as_json: bool,
    error_count: u32,
}

impl HttpRequest {
    /// Start a `GET` request with JSON body encoding
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            params: Vec::new(),
            data: Map::new(),
            headers: Vec::new(),
            data_as_json: true,
            error_count: 0,
        }
    }

    pub fn method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        set_param(&mut self.params, key.into(), value.into());
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        for (key, value) in params {
            set_param(&mut self.params, key.into(), value.into());
        }
        self
    }

    pub fn data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Use a serializable struct as body data; it must serialize to a JSON object
    pub fn data_from<T: Serialize>(self, data: &T) -> Result<Self, ClientError> {
        match serde_json::to_value(data)? {
            Value::Object(map) => Ok(self.data(map)),
            other => Err(ClientError::SerializationError(serde::ser::Error::custom(
                format!("request data must be a JSON object, got {other}"),
            ))),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn data_as_json(mut self, as_json: bool) -> Self {
        self.data_as_json = as_json;
        self
    }

    /// Failures accumulated by earlier calls; a failed response reports this plus one
    pub fn error_count(mut self, count: u32) -> Self {
        self.error_count = count;
        self
    }

    /// Resolve method, URL, headers and body without touching the network
    pub fn prepare(&self) -> Result<PreparedRequest, ClientError> {
        if !has_http_scheme(&self.url) {
            return Err(ClientError::InsecureUrl {
                url: self.url.clone(),
            });
        }

        let method = Method::from_bytes(self.method.as_bytes()).map_err(|_| {
            ClientError::InvalidMethod {
                method: self.method.clone(),
            }
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ClientError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        let mut params = self.params.clone();
        let mut data = self.data.clone();

        // GET carries everything in the query string
        if method == Method::GET {
            for (key, value) in std::mem::take(&mut data) {
                set_param(&mut params, key, ParamValue::from_json(&value));
            }
        }

        let mut url = self.url.clone();
        if !params.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&encode_params(&params, true));
        }

        let body = if data.is_empty() {
            None
        } else if self.data_as_json {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            Some(serde_json::to_vec(&data)?)
        } else {
            headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(FORM_CONTENT_TYPE));
            let pairs: Vec<(String, ParamValue)> = data
                .iter()
                .map(|(key, value)| (key.clone(), ParamValue::from_json(value)))
                .collect();
            Some(encode_params(&pairs, false).into_bytes())
        };

        Ok(PreparedRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Perform the request.
    ///
    /// Transport failures (DNS, refused connections, TLS) are returned as
    /// `ClientError::RequestFailed`; HTTP error statuses are not errors here.
    pub async fn send(self, client: &Client) -> Result<ApiResponse, ClientError> {
        let prepared = self.prepare()?;
        debug!(method = %prepared.method, url = %prepared.url, "sending request");

        let mut builder = client
            .request(prepared.method, &prepared.url)
            .headers(prepared.headers);
        if let Some(body) = prepared.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if status.is_client_error() || status.is_server_error() {
            debug!(status = status.as_u16(), "request returned error status");
            return Ok(ApiResponse::Failure {
                response: ResponseData {
                    body: status.canonical_reason().unwrap_or_default().to_string(),
                    headers,
                    status,
                },
                error_count: self.error_count + 1,
            });
        }

        // text() honours the declared charset and falls back to UTF-8
        let body = response.text().await?;
        Ok(ApiResponse::Success(ResponseData {
            body,
            headers,
            status,
        }))
    }
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn set_param(params: &mut Vec<(String, ParamValue)>, key: String, value: ParamValue) {
    match params.iter_mut().find(|(existing, _)| *existing == key) {
        Some(slot) => slot.1 = value,
        None => params.push((key, value)),
    }
}

fn encode_component(value: &str, keep_slash: bool) -> String {
    let encoded = urlencoding::encode(value).into_owned();
    if keep_slash {
        encoded.replace("%2F", "/")
    } else {
        encoded
    }
}

/// URL-encode parameters as `k=v&k=v`, repeating the key for multi-valued entries
pub fn encode_params(params: &[(String, ParamValue)], keep_slash: bool) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        let key = encode_component(key, keep_slash);
        match value {
            ParamValue::Single(v) => {
                pairs.push(format!("{}={}", key, encode_component(v, keep_slash)));
            }
            ParamValue::Multi(values) => {
                for v in values {
                    pairs.push(format!("{}={}", key, encode_component(v, keep_slash)));
                }
            }
        }
    }
    pairs.join("&")
}
