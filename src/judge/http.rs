// HTTP vision judge
// Sends the rendered trace to a messages-style vision endpoint and parses a JSON verdict

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::judge::{HandwritingJudge, JudgeError, JudgeVerdict};
use crate::render::TraceImage;

const API_VERSION: &str = "2023-06-01";

/// Connection settings for the vision judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Consult the judge after a local accept
    pub enabled: bool,

    /// Messages endpoint URL
    pub endpoint: String,

    /// Vision model name
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Per-request timeout
    pub timeout_ms: u64,

    /// Extra attempts after the first for retriable failures (429, 5xx, timeouts)
    pub max_retries: u32,

    /// Response length cap
    pub max_tokens: u32,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        JudgeConfig {
            enabled: false,
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            api_key_env: "BRIGHTPATH_JUDGE_API_KEY".to_string(),
            timeout_ms: 8000,
            max_retries: 1,
            max_tokens: 128,
        }
    }
}

/// Judge backed by a remote vision model
pub struct HttpJudge {
    config: JudgeConfig,
    api_key: String,
    client: Client,
}

impl HttpJudge {
    /// Create a judge, reading the API key from `config.api_key_env`
    pub fn new(config: JudgeConfig) -> Result<Self, JudgeError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            JudgeError::NotConfigured(format!("{} is not set", config.api_key_env))
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Create a judge with an explicit API key
    pub fn with_api_key(config: JudgeConfig, api_key: String) -> Result<Self, JudgeError> {
        if api_key.trim().is_empty() {
            return Err(JudgeError::NotConfigured("empty API key".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(HttpJudge {
            config,
            api_key,
            client,
        })
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    fn build_request(&self, image: &TraceImage, letter: char) -> serde_json::Value {
        let prompt = format!(
            "This image shows a young child's attempt at writing the character '{}' \
             on a tablet. Judge leniently: wobbly lines and uneven proportions are fine \
             as long as the shape reads as '{}' and not as a different character. \
             Reply with only JSON: {{\"valid\": true or false, \"feedback\": \
             \"one short, encouraging sentence for the child\"}}.",
            letter, letter
        );

        serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": TraceImage::MEDIA_TYPE,
                            "data": image.to_base64()
                        }
                    },
                    {
                        "type": "text",
                        "text": prompt
                    }
                ]
            }]
        })
    }
}

impl HandwritingJudge for HttpJudge {
    async fn evaluate(&self, image: &TraceImage, letter: char) -> Result<JudgeVerdict, JudgeError> {
        #[derive(Deserialize)]
        struct ApiResponse {
            content: Vec<ContentBlock>,
        }
        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(default)]
            text: Option<String>,
        }

        let body = self.build_request(image, letter);
        let context = format!("Handwriting judge '{}'", letter);

        let response = send_with_retry(
            &self.client,
            |c| {
                c.post(&self.config.endpoint)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", API_VERSION)
                    .header("content-type", "application/json")
                    .json(&body)
            },
            self.config.max_retries,
            &context,
        )
        .await?;

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::MalformedResponse(e.to_string()))?;

        let text = api
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| JudgeError::MalformedResponse("no text content".to_string()))?;

        parse_verdict(&text)
    }
}

/// Extract the JSON verdict from model reply text
///
/// Tolerates prose or code fences around the object.
pub fn parse_verdict(text: &str) -> Result<JudgeVerdict, JudgeError> {
    let start = text.find('{');
    let end = text.rfind('}');

    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &text[s..=e],
        _ => {
            return Err(JudgeError::MalformedResponse(format!(
                "no JSON object in reply: {}",
                text.trim()
            )))
        }
    };

    let mut verdict: JudgeVerdict = serde_json::from_str(json)
        .map_err(|e| JudgeError::MalformedResponse(e.to_string()))?;

    verdict.feedback = verdict
        .feedback
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());

    Ok(verdict)
}

/// Send an HTTP request with retry and exponential backoff
///
/// - 429 (rate limited): backoff 2s, 4s, ...
/// - 5xx (server error): backoff 1s, 2s, ...
/// - Timeout/connect error: backoff 1s, 2s, ...
/// - Other 4xx: non-retriable, returns immediately
///
/// The request is always sent once; `max_retries` adds further attempts.
/// No backoff is taken after the final attempt.
async fn send_with_retry<F>(
    client: &Client,
    build_request: F,
    max_retries: u32,
    context: &str,
) -> Result<Response, JudgeError>
where
    F: Fn(&Client) -> RequestBuilder,
{
    let attempts = max_retries.saturating_add(1);

    for attempt in 0..attempts {
        let is_last = attempt + 1 == attempts;

        let delay = match build_request(client).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(resp);
                } else if status == StatusCode::TOO_MANY_REQUESTS {
                    log::warn!("{}: rate limited (429)", context);
                    Duration::from_secs(2u64.pow(attempt + 1))
                } else if status.is_server_error() {
                    log::warn!("{}: server error ({})", context, status);
                    Duration::from_secs(2u64.pow(attempt))
                } else {
                    log::warn!("{}: non-retriable error ({})", context, status);
                    return Err(JudgeError::Status(status.as_u16()));
                }
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                log::warn!("{}: network error ({})", context, e);
                Duration::from_secs(2u64.pow(attempt))
            }
            Err(e) => {
                log::warn!("{}: request failed: {}", context, e);
                return Err(JudgeError::Http(e));
            }
        };

        if !is_last {
            log::debug!("{}: retrying in {:?}", context, delay);
            tokio::time::sleep(delay).await;
        }
    }

    log::warn!("{}: failed after {} attempts", context, attempts);
    Err(JudgeError::RetriesExhausted(attempts))
}
