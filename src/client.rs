use std::env;
use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::Deserialize;
use url::Url;

use crate::backend::{Conversation, GenerativeBackend};
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_MODEL_PAGES, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS,
    STREAM_DURATION, STREAM_TTFB,
};
use crate::sse::process_sse;
use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Model, ModelInfo,
    ModelList,
};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_TEMPERATURE: f32 = 0.7;
const MODEL_PAGE_SIZE: u32 = 1000;
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Environment variable consulted when no API key is passed explicitly.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Client for the Gemini `generativelanguage` API.
#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    model: Model,
    generation_config: GenerationConfig,
}

impl Gemini {
    /// Create a new Gemini client.
    ///
    /// The API key can be provided directly or read from the GEMINI_API_KEY
    /// environment variable.  An empty key counts as no key.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(api_key, env::var(API_KEY_ENV).ok())?;

        let base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let base_url = if base_url.ends_with('/') {
            base_url
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&base_url)
            .map_err(|e| Error::url(format!("Invalid base URL {base_url}: {e}"), Some(e)))?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
            model: Model::default(),
            generation_config: GenerationConfig::default()
                .with_temperature(Some(DEFAULT_TEMPERATURE)),
        })
    }

    /// Use `model` for new conversations and one-shot prompts.
    ///
    /// Unlike [`Gemini::switch_model`] this does not ask the service whether
    /// the model exists.
    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the generation settings sent with every request.
    pub fn with_generation_config(mut self, generation_config: GenerationConfig) -> Self {
        self.generation_config = generation_config;
        self
    }

    /// The generation settings sent with every request.
    pub fn generation_config(&self) -> &GenerationConfig {
        &self.generation_config
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::url(format!("Invalid endpoint {path}: {e}"), Some(e)))
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::config("API key contains characters not allowed in a header"))?;
        headers.insert(API_KEY_HEADER, key);
        Ok(headers)
    }

    fn request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Send a request, mapping transport and HTTP-status failures.
    async fn execute(&self, request: RequestBuilder, resource: Option<&str>) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let started = Instant::now();
        let result = request.send().await;
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                CLIENT_REQUEST_ERRORS.click();
                return Err(self.request_error(e));
            }
        };
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response, resource).await);
        }
        Ok(response)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response, resource: Option<&str>) -> Error {
        let status_code = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };
        tracing::debug!(status_code, body = %body, "error response");
        error_from_body(status_code, retry_after, &body, resource)
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })
    }

    /// Call `generateContent` on `model` and return the raw response.
    pub async fn generate_content(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(&format!("{}:generateContent", model.resource_name()))?;
        tracing::debug!(model = %model, turns = request.contents.len(), "generateContent");

        let builder = self
            .client
            .post(url)
            .headers(self.default_headers()?)
            .json(request);
        let response = self.execute(builder, Some(model.id())).await?;
        let response: GenerateContentResponse = Self::parse_json(response).await?;
        check_blocked(&response)?;
        Ok(response)
    }

    /// Call `streamGenerateContent` on `model`.
    ///
    /// Returns a stream of partial responses, one per server-sent event.
    pub async fn stream_generate_content(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<impl Stream<Item = Result<GenerateContentResponse>>> {
        let mut url = self.endpoint(&format!("{}:streamGenerateContent", model.resource_name()))?;
        url.query_pairs_mut().append_pair("alt", "sse");
        tracing::debug!(model = %model, "streamGenerateContent");

        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let builder = self.client.post(url).headers(headers).json(request);
        let response = self.execute(builder, Some(model.id())).await?;
        Ok(process_sse(response.bytes_stream()))
    }

    fn request_for(&self, contents: Vec<Content>) -> GenerateContentRequest {
        GenerateContentRequest::new(contents).with_generation_config(self.generation_config.clone())
    }

    /// Generate a reply to a single prompt with the active model.
    ///
    /// ```no_run
    /// # tokio_test::block_on(async {
    /// use gemi::{Gemini, KnownModel};
    ///
    /// let client = Gemini::new(None)?.with_model(KnownModel::Gemini25Flash);
    /// let reply = client.generate_text("Write a haiku about borrow checking").await?;
    /// println!("{reply}");
    /// # Ok::<(), gemi::Error>(())
    /// # }).unwrap();
    /// ```
    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        validate_prompt(prompt)?;
        let request = self.request_for(vec![Content::user(prompt)]);
        let response = self.generate_content(&self.model, &request).await?;
        Ok(response.text())
    }

    /// Stream a reply to a single prompt with the active model.
    ///
    /// `on_fragment` sees every non-empty chunk of text in arrival order.
    pub async fn generate_text_stream<F>(&self, prompt: &str, mut on_fragment: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<()> + Send,
    {
        validate_prompt(prompt)?;
        let request = self.request_for(vec![Content::user(prompt)]);
        let started = Instant::now();
        let stream = self.stream_generate_content(&self.model, &request).await?;
        futures::pin_mut!(stream);

        let mut first = true;
        while let Some(event) = stream.next().await {
            let event = event?;
            if first {
                STREAM_TTFB.add(started.elapsed().as_secs_f64());
                first = false;
            }
            check_blocked(&event)?;
            let text = event.text();
            if !text.is_empty() {
                on_fragment(&text)?;
            }
        }
        STREAM_DURATION.add(started.elapsed().as_secs_f64());
        Ok(())
    }

    /// Send `prompt` as the next turn of `conversation`.
    pub async fn send_message(&self, conversation: &mut Conversation, prompt: &str) -> Result<String> {
        validate_prompt(prompt)?;
        let request = self.request_for(conversation.with_prompt(prompt));
        let response = self.generate_content(conversation.model(), &request).await?;
        let text = response.text();
        let reply = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .unwrap_or_else(|| Content::model(text.clone()));
        conversation.record(prompt, reply);
        Ok(text)
    }

    /// Fetch one page of the model catalog.
    pub async fn list_models_page(&self, page_token: Option<&str>) -> Result<ModelList> {
        let mut url = self.endpoint("models")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &MODEL_PAGE_SIZE.to_string());
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        let builder = self.client.get(url).headers(self.default_headers()?);
        let response = self.execute(builder, None).await?;
        CLIENT_MODEL_PAGES.click();
        Self::parse_json(response).await
    }

    /// Fetch the whole model catalog, following page tokens.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let mut models = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.list_models_page(token.as_deref()).await?;
            token = page.next_page().map(String::from);
            models.extend(page.models);
            if token.is_none() {
                break;
            }
        }
        tracing::debug!(count = models.len(), "listed models");
        Ok(models)
    }

    /// Fetch the descriptor of one model.
    pub async fn get_model(&self, model: &Model) -> Result<ModelInfo> {
        let url = self.endpoint(&model.resource_name())?;
        let builder = self.client.get(url).headers(self.default_headers()?);
        let response = self.execute(builder, Some(model.id())).await?;
        Self::parse_json(response).await
    }

    /// Make `name` the active model after checking that the service knows it.
    ///
    /// The client is unchanged if the name is empty or the lookup fails.
    pub async fn switch_model(&mut self, name: &str) -> Result<()> {
        let model = Model::from(name);
        if model.is_empty() {
            return Err(Error::validation(
                "model name cannot be empty",
                Some("model".to_string()),
            ));
        }
        self.get_model(&model).await?;
        tracing::info!(from = %self.model, to = %model, "switched model");
        self.model = model;
        Ok(())
    }
}

impl fmt::Debug for Gemini {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gemini")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GenerativeBackend for Gemini {
    fn model(&self) -> &Model {
        &self.model
    }

    fn start_session(&self) -> Conversation {
        Conversation::new(self.model.clone())
    }

    async fn send_prompt(&self, conversation: &mut Conversation, prompt: &str) -> Result<String> {
        self.send_message(conversation, prompt).await
    }

    async fn send_prompt_streaming(
        &self,
        prompt: &str,
        on_fragment: &mut (dyn for<'f> FnMut(&'f str) -> Result<()> + Send),
    ) -> Result<()> {
        self.generate_text_stream(prompt, |text| on_fragment(text))
            .await
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Gemini::list_models(self).await
    }

    async fn switch_model(&mut self, name: &str) -> Result<()> {
        Gemini::switch_model(self, name).await
    }
}

/// Pick the explicit key, else the environment's, treating empty as absent.
fn resolve_api_key(explicit: Option<String>, from_env: Option<String>) -> Result<String> {
    explicit
        .filter(|key| !key.is_empty())
        .or(from_env.filter(|key| !key.is_empty()))
        .ok_or_else(|| {
            Error::config(format!(
                "no API key provided. Use --api-key flag or set {API_KEY_ENV} environment variable"
            ))
        })
}

fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(Error::validation(
            "prompt cannot be empty",
            Some("prompt".to_string()),
        ));
    }
    Ok(())
}

/// A response without candidates whose prompt was blocked is a failure.
fn check_blocked(response: &GenerateContentResponse) -> Result<()> {
    match response.block_reason() {
        Some(reason) if response.candidates.is_empty() => Err(Error::bad_request(
            format!("prompt blocked: {reason}"),
            Some("contents".to_string()),
        )),
        _ => Ok(()),
    }
}

/// Map an HTTP failure and its body onto an [`Error`].
fn error_from_body(
    status_code: u16,
    retry_after: Option<u64>,
    body: &str,
    resource: Option<&str>,
) -> Error {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
        status: Option<String>,
    }

    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error);
    let status = detail.as_ref().and_then(|d| d.status.clone());
    let message = detail
        .and_then(|d| d.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    match status_code {
        400 if status.as_deref() == Some("UNAUTHENTICATED")
            || message.contains("API key not valid") =>
        {
            Error::authentication(message)
        }
        400 => Error::bad_request(message, None),
        401 => Error::authentication(message),
        403 => Error::permission(message),
        404 => Error::not_found(message, resource.map(String::from)),
        408 => Error::timeout(message, None),
        429 => Error::rate_limit(message, retry_after),
        500 => Error::internal_server(message),
        502..=504 => Error::service_unavailable(message, retry_after),
        _ => Error::api(status_code, status, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn client_creation() {
        let client = Gemini::new(Some("test-key".to_string())).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.base_url.as_str(), DEFAULT_API_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        assert_eq!(client.model, Model::default());
        assert_eq!(client.generation_config.temperature, Some(0.7));

        let client = Gemini::with_options(
            Some("test-key".to_string()),
            Some("https://custom-api.example.com/v1".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap()
        .with_model(KnownModel::Gemini25Flash);
        assert_eq!(client.base_url.as_str(), "https://custom-api.example.com/v1/");
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert_eq!(GenerativeBackend::model(&client).id(), "gemini-2.5-flash");
    }

    #[test]
    fn debug_hides_api_key() {
        let client = Gemini::new(Some("secret-key".to_string())).unwrap();
        assert!(!format!("{client:?}").contains("secret-key"));
    }

    #[test]
    fn api_key_resolution() {
        assert_eq!(
            resolve_api_key(Some("a".to_string()), Some("b".to_string())).unwrap(),
            "a"
        );
        assert_eq!(
            resolve_api_key(Some(String::new()), Some("b".to_string())).unwrap(),
            "b"
        );
        let err = resolve_api_key(None, Some(String::new())).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn endpoints() {
        let client = Gemini::new(Some("k".to_string())).unwrap();
        let model = Model::from("gemini-2.0-flash");
        let url = client
            .endpoint(&format!("{}:generateContent", model.resource_name()))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn error_mapping() {
        let body = r#"{"error": {"code": 404, "message": "models/nope is not found", "status": "NOT_FOUND"}}"#;
        let err = error_from_body(404, None, body, Some("nope"));
        assert!(err.is_not_found());
        assert!(err.to_string().contains("[nope]"));

        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#;
        assert!(error_from_body(400, None, body, None).is_authentication());

        let body = r#"{"error": {"code": 400, "message": "bad temperature", "status": "INVALID_ARGUMENT"}}"#;
        assert!(error_from_body(400, None, body, None).is_bad_request());

        let err = error_from_body(429, Some(7), "{}", None);
        assert!(err.is_rate_limit());
        assert!(err.to_string().contains("7 seconds"));

        let err = error_from_body(418, None, "teapot", None);
        assert_eq!(err.status_code(), Some(418));
        assert!(err.to_string().contains("teapot"));

        let err = error_from_body(503, None, "", None);
        assert!(err.is_transport());
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let err = check_blocked(&response).unwrap_err();
        assert!(err.is_bad_request());
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn empty_inputs_fail_before_the_network() {
        let mut client = Gemini::with_options(
            Some("k".to_string()),
            Some("http://127.0.0.1:9/".to_string()),
            None,
        )
        .unwrap();
        assert!(client.generate_text("  ").await.unwrap_err().is_validation());

        let before = client.model.clone();
        let err = client.switch_model("").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(client.model, before);

        let mut conversation = client.start_session();
        let err = client.send_message(&mut conversation, "").await.unwrap_err();
        assert!(err.is_validation());
        assert!(conversation.is_empty());
    }
}
