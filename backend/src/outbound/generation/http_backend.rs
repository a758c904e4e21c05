//! Reqwest-backed generation adapter for OpenAI-compatible chat endpoints.
//!
//! This adapter owns transport details only: request serialisation, bearer
//! authentication, timeout and status mapping, and decoding the first choice.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use zeroize::Zeroizing;

use super::dto::{ChatMessageDto, ChatRequestDto, ChatResponseDto};
use crate::domain::ModelTier;
use crate::domain::ports::{GenerationBackend, GenerationBackendError, GenerationRequest};

const DEFAULT_FAST_MODEL: &str = "gpt-4o-mini";
const DEFAULT_QUALITY_MODEL: &str = "gpt-4o";
const USER_AGENT: &str = "siteulation-backend/0.1";
const PREVIEW_CHAR_LIMIT: usize = 160;

/// Instruction sent ahead of every context.
pub const SYSTEM_PROMPT: &str = "You write complete, self-contained HTML pages. \
Reply with a single HTML document and nothing else. Inline all CSS and \
JavaScript; do not reference external assets.";

/// Model names used for each tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelNames {
    /// Model used for [`ModelTier::Fast`].
    pub fast: String,
    /// Model used for [`ModelTier::Quality`].
    pub quality: String,
}

impl ModelNames {
    /// Resolve the model name for `tier`.
    #[must_use]
    pub fn for_tier(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => self.fast.as_str(),
            ModelTier::Quality => self.quality.as_str(),
        }
    }
}

impl Default for ModelNames {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST_MODEL.to_owned(),
            quality: DEFAULT_QUALITY_MODEL.to_owned(),
        }
    }
}

/// Generation backend that POSTs chat-completion requests to one endpoint.
pub struct HttpGenerationBackend {
    client: Client,
    endpoint: Url,
    api_key: Option<Zeroizing<String>>,
    models: ModelNames,
}

impl HttpGenerationBackend {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        timeout: Duration,
        api_key: Option<String>,
        models: ModelNames,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key
                .filter(|key| !key.trim().is_empty())
                .map(Zeroizing::new),
            models,
        })
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationBackendError> {
        let payload = build_payload(&self.models, request);
        let mut call = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key.as_str());
        }

        let response = call.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_content(body.as_ref())
    }
}

fn build_payload<'a>(models: &'a ModelNames, request: &'a GenerationRequest) -> ChatRequestDto<'a> {
    ChatRequestDto {
        model: models.for_tier(request.tier),
        messages: [
            ChatMessageDto {
                role: "system",
                content: SYSTEM_PROMPT,
            },
            ChatMessageDto {
                role: "user",
                content: request.context.as_str(),
            },
        ],
    }
}

fn parse_content(body: &[u8]) -> Result<String, GenerationBackendError> {
    let decoded: ChatResponseDto = serde_json::from_slice(body).map_err(|error| {
        GenerationBackendError::invalid_response(format!("invalid completion JSON: {error}"))
    })?;
    decoded
        .into_content()
        .map_err(GenerationBackendError::invalid_response)
}

fn map_transport_error(error: reqwest::Error) -> GenerationBackendError {
    if error.is_timeout() {
        GenerationBackendError::timeout(error.to_string())
    } else {
        GenerationBackendError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> GenerationBackendError {
    let preview = body_preview(body);
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            GenerationBackendError::timeout(format!("status {}", status.as_u16()))
        }
        _ => GenerationBackendError::status(status.as_u16(), preview),
    }
}

fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for the non-network mapping helpers.

    use super::*;
    use rstest::rstest;

    fn request(tier: ModelTier) -> GenerationRequest {
        GenerationRequest {
            tier,
            title: "My Site".to_owned(),
            context: "make a page about otters".to_owned(),
            prompt: "make a page about otters".to_owned(),
        }
    }

    #[rstest]
    #[case(ModelTier::Fast, DEFAULT_FAST_MODEL)]
    #[case(ModelTier::Quality, DEFAULT_QUALITY_MODEL)]
    fn payload_selects_model_by_tier(#[case] tier: ModelTier, #[case] expected: &str) {
        let models = ModelNames::default();
        let req = request(tier);
        let payload = serde_json::to_value(build_payload(&models, &req)).expect("serialise");

        assert_eq!(payload["model"], expected);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["role"], "user");
        assert_eq!(payload["messages"][1]["content"], "make a page about otters");
    }

    #[test]
    fn parses_first_choice_content() {
        let body = br#"{"choices":[{"message":{"role":"assistant","content":"<html></html>"}},
            {"message":{"content":"ignored"}}]}"#;
        assert_eq!(parse_content(body).expect("decodes"), "<html></html>");
    }

    #[rstest]
    #[case::no_choices(br#"{"choices":[]}"#.as_slice())]
    #[case::null_content(br#"{"choices":[{"message":{"content":null}}]}"#.as_slice())]
    #[case::not_json(b"<html>gateway error</html>".as_slice())]
    fn rejects_unusable_responses(#[case] body: &[u8]) {
        let error = parse_content(body).expect_err("must fail");
        assert!(matches!(
            error,
            GenerationBackendError::InvalidResponse { .. }
        ));
    }

    #[rstest]
    #[case(StatusCode::GATEWAY_TIMEOUT)]
    #[case(StatusCode::REQUEST_TIMEOUT)]
    fn timeout_statuses_map_to_timeout(#[case] status: StatusCode) {
        assert!(matches!(
            map_status_error(status, b""),
            GenerationBackendError::Timeout { .. }
        ));
    }

    #[test]
    fn other_statuses_keep_code_and_preview() {
        let error = map_status_error(
            StatusCode::TOO_MANY_REQUESTS,
            b"{ \"error\":   \"rate limited\" }",
        );
        assert_eq!(
            error,
            GenerationBackendError::status(429_u16, "{ \"error\": \"rate limited\" }")
        );
    }

    #[test]
    fn long_bodies_are_truncated_in_previews() {
        let preview = body_preview("x".repeat(500).as_bytes());
        assert_eq!(preview.chars().count(), PREVIEW_CHAR_LIMIT + 3);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn blank_api_keys_are_ignored() {
        let endpoint = Url::parse("http://127.0.0.1:9/v1/chat/completions").expect("url");
        let backend = HttpGenerationBackend::new(
            endpoint,
            Duration::from_secs(1),
            Some("   ".to_owned()),
            ModelNames::default(),
        )
        .expect("client builds");
        assert!(backend.api_key.is_none());
    }
}
