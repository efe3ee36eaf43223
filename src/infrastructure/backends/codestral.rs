#[cfg(test)]
#[path = "codestral_test.rs"]
mod tests;

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::configuration::PROVIDER_TOKEN_ENV;
use crate::domain::models::AppError;
use crate::domain::models::Gateway;
use crate::domain::models::GatewayRequest;
use crate::domain::models::Message;
use crate::domain::models::RawReply;

const CHAT_TEMPERATURE: f32 = 0.7;
const CHAT_MAX_TOKENS: u32 = 1000;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct MessageRequest {
    role: String,
    content: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<MessageRequest>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionChoiceResponse {
    #[serde(default)]
    message: Option<CompletionMessageResponse>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoiceResponse>,
}

/// Looks up the provider credential. Runs on every call so a missing key only
/// surfaces when a request actually needs it.
fn configured_credential() -> Option<String> {
    let configured = Config::get(ConfigKey::ProviderToken);
    if !configured.is_empty() {
        return Some(configured);
    }

    return env::var(PROVIDER_TOKEN_ENV).ok();
}

type CredentialFn = Box<dyn Fn() -> Option<String> + Send + Sync>;

fn to_message_request(message: &Message) -> MessageRequest {
    return MessageRequest {
        role: message.role.to_string(),
        content: message.content.to_string(),
    };
}

/// Server-side gateway to the Codestral chat-completions API. Holds the
/// provider credential so clients never see it.
pub struct Codestral {
    url: String,
    model: String,
    timeout: Duration,
    credential: CredentialFn,
    client: reqwest::Client,
}

impl Default for Codestral {
    fn default() -> Codestral {
        let timeout = Config::get(ConfigKey::UpstreamTimeout)
            .parse::<u64>()
            .unwrap_or(60_000);

        return Codestral {
            url: Config::get(ConfigKey::ProviderURL),
            model: Config::get(ConfigKey::Model),
            timeout: Duration::from_millis(timeout),
            credential: Box::new(configured_credential),
            client: reqwest::Client::new(),
        };
    }
}

impl Codestral {
    fn build_request(&self, request: &GatewayRequest) -> Result<CompletionRequest, AppError> {
        match request {
            GatewayRequest::Code(action_request) => {
                return Ok(CompletionRequest {
                    model: self.model.to_string(),
                    messages: vec![
                        MessageRequest {
                            role: "system".to_string(),
                            content: action_request.action.system_instruction().to_string(),
                        },
                        MessageRequest {
                            role: "user".to_string(),
                            content: action_request.user_content(),
                        },
                    ],
                    temperature: action_request.action.temperature(),
                    max_tokens: None,
                });
            }
            GatewayRequest::Chat(messages) => {
                if messages.is_empty() {
                    return Err(AppError::invalid_input("Conversation is empty"));
                }

                return Ok(CompletionRequest {
                    model: self.model.to_string(),
                    messages: messages.iter().map(to_message_request).collect(),
                    temperature: CHAT_TEMPERATURE,
                    max_tokens: Some(CHAT_MAX_TOKENS),
                });
            }
        }
    }
}

#[async_trait]
impl Gateway for Codestral {
    #[allow(clippy::implicit_return)]
    async fn execute(&self, request: &GatewayRequest) -> Result<RawReply, AppError> {
        let token = (self.credential)().filter(|token| return !token.trim().is_empty());
        let Some(token) = token else {
            tracing::error!("Codestral API key not configured");
            return Err(AppError::ServiceUnavailable);
        };

        let req = self.build_request(request)?;

        let res = self
            .client
            .post(format!("{url}/v1/chat/completions", url = self.url))
            .header("Authorization", format!("Bearer {token}"))
            .timeout(self.timeout)
            .json(&req)
            .send()
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "Codestral is not reachable");
                return AppError::from_transport(err, self.timeout);
            })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|err| return AppError::from_transport(err, self.timeout))?;

        if !status.is_success() {
            tracing::error!(
                status = status.as_u16(),
                body = body,
                "Failed to make completion request to Codestral"
            );
            return Err(AppError::UpstreamError {
                status: status.as_u16(),
                body,
            });
        }

        let completion = serde_json::from_str::<CompletionResponse>(&body).map_err(|err| {
            tracing::error!(error = ?err, "Codestral returned a body that is not a completion");
            return AppError::MalformedUpstreamResponse(err.to_string());
        })?;
        tracing::debug!(body = ?completion, "Completion response");

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| return choice.message)
            .and_then(|message| return message.content)
            .ok_or_else(|| {
                return AppError::MalformedUpstreamResponse(
                    "missing choices[0].message.content".to_string(),
                );
            })?;

        tracing::info!("AI response received successfully");
        return Ok(RawReply { text });
    }
}
