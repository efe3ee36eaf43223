#[cfg(test)]
#[path = "proxy_client_test.rs"]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use serde_json::json;
use serde_json::Value;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AppError;
use crate::domain::models::Gateway;
use crate::domain::models::GatewayRequest;
use crate::domain::models::RawReply;
use crate::domain::models::Snippet;
use crate::domain::models::SnippetDraft;
use crate::domain::models::StatField;
use crate::domain::models::UsageRecorder;
use crate::domain::models::UsageStats;

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
struct SnippetsResponse {
    snippets: Vec<Snippet>,
}

#[derive(Debug, Deserialize)]
struct SavedResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IncrementResponse {
    stats: UsageStats,
}

#[derive(Debug, Serialize)]
struct IncrementRequest {
    field: StatField,
    value: f64,
}

/// Client for a running `codeaction serve` host. Speaks the same JSON surface a
/// browser front end would.
pub struct ProxyClient {
    url: String,
    token: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl Default for ProxyClient {
    fn default() -> ProxyClient {
        let timeout = Config::get(ConfigKey::UpstreamTimeout)
            .parse::<u64>()
            .unwrap_or(60_000);

        return ProxyClient {
            url: Config::get(ConfigKey::ProxyURL),
            token: Config::get(ConfigKey::ProxyToken),
            // The host applies the same upstream timeout, leave it room to answer.
            timeout: Duration::from_millis(timeout) + Duration::from_secs(5),
            client: reqwest::Client::new(),
        };
    }
}

impl ProxyClient {
    /// Turns a host error status back into the matching error kind.
    fn error_from_status(&self, status: u16, body: &str) -> AppError {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|res| return res.error)
            .unwrap_or_else(|_| return body.to_string());

        match status {
            400 => return AppError::InvalidInput(message),
            401 => return AppError::Unauthorized,
            404 => {
                // The host reports `Unknown action '<name>'`, keep only the name.
                let name = message
                    .strip_prefix("Unknown action '")
                    .and_then(|rest| return rest.strip_suffix('\''))
                    .unwrap_or(&message);
                return AppError::UnknownAction(name.to_string());
            }
            503 => return AppError::ServiceUnavailable,
            504 => return AppError::Timeout(self.timeout),
            500 => return AppError::PersistenceError(message),
            _ => return AppError::UpstreamError {
                status,
                body: message,
            },
        }
    }

    /// Builds `{url}/snippets/{id}` with `id` as one encoded path segment, so
    /// characters like `?` or `/` in it cannot address another resource.
    fn snippet_url(&self, id: &str) -> Result<reqwest::Url, AppError> {
        let invalid = || {
            return AppError::InvalidInput(format!("'{}' is not a valid host URL", self.url));
        };

        let mut url = reqwest::Url::parse(&self.url).map_err(|_| return invalid())?;
        url.path_segments_mut()
            .map_err(|_| return invalid())?
            .pop_if_empty()
            .push("snippets")
            .push(id);

        return Ok(url);
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value, AppError> {
        let mut req = req.timeout(self.timeout);
        if !self.token.is_empty() {
            req = req.bearer_auth(&self.token);
        }

        let res = req.send().await.map_err(|err| {
            tracing::error!(error = ?err, url = self.url, "Host is not reachable");
            return AppError::from_transport(err, self.timeout);
        })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|err| return AppError::from_transport(err, self.timeout))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), body, "Host returned an error");
            return Err(self.error_from_status(status.as_u16(), &body));
        }

        return serde_json::from_str::<Value>(&body)
            .map_err(|err| return AppError::MalformedUpstreamResponse(err.to_string()));
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, AppError> {
        return serde_json::from_value::<T>(value)
            .map_err(|err| return AppError::MalformedUpstreamResponse(err.to_string()));
    }

    fn read_text(value: &Value, field: &str) -> Result<String, AppError> {
        return value
            .get(field)
            .and_then(|text| return text.as_str())
            .map(|text| return text.to_string())
            .ok_or_else(|| {
                return AppError::MalformedUpstreamResponse(format!("missing '{field}' in reply"));
            });
    }

    pub async fn snippets(&self) -> Result<Vec<Snippet>, AppError> {
        let res = self
            .send(self.client.get(format!("{url}/snippets", url = self.url)))
            .await?;
        return Ok(ProxyClient::decode::<SnippetsResponse>(res)?.snippets);
    }

    /// Returns the id the host assigned.
    pub async fn save_snippet(&self, draft: &SnippetDraft) -> Result<String, AppError> {
        let res = self
            .send(
                self.client
                    .post(format!("{url}/snippets", url = self.url))
                    .json(draft),
            )
            .await?;
        return Ok(ProxyClient::decode::<SavedResponse>(res)?.id);
    }

    pub async fn delete_snippet(&self, id: &str) -> Result<(), AppError> {
        self.send(self.client.delete(self.snippet_url(id)?)).await?;
        return Ok(());
    }

    pub async fn stats(&self) -> Result<UsageStats, AppError> {
        let res = self
            .send(self.client.get(format!("{url}/stats", url = self.url)))
            .await?;
        return ProxyClient::decode::<UsageStats>(res);
    }
}

#[async_trait]
impl Gateway for ProxyClient {
    #[allow(clippy::implicit_return)]
    async fn execute(&self, request: &GatewayRequest) -> Result<RawReply, AppError> {
        match request {
            GatewayRequest::Code(action_request) => {
                let action = action_request.action;
                let mut body = serde_json::Map::new();
                body.insert(
                    action.input_field().to_string(),
                    json!(action_request.primary_input),
                );
                body.insert("language".to_string(), json!(action_request.language));

                let res = self
                    .send(
                        self.client
                            .post(format!("{url}/code/{action}", url = self.url))
                            .json(&body),
                    )
                    .await?;

                let text = ProxyClient::read_text(&res, action.response_field())?;
                return Ok(RawReply { text });
            }
            GatewayRequest::Chat(messages) => {
                let res = self
                    .send(
                        self.client
                            .post(format!("{url}/ai/chat", url = self.url))
                            .json(&json!({ "messages": messages })),
                    )
                    .await?;

                let text = ProxyClient::read_text(&res, "message")?;
                return Ok(RawReply { text });
            }
        }
    }
}

#[async_trait]
impl UsageRecorder for ProxyClient {
    #[allow(clippy::implicit_return)]
    async fn increment(&self, field: StatField, value: f64) -> Result<UsageStats, AppError> {
        let res = self
            .send(
                self.client
                    .post(format!("{url}/stats/increment", url = self.url))
                    .json(&IncrementRequest { field, value }),
            )
            .await?;
        return Ok(ProxyClient::decode::<IncrementResponse>(res)?.stats);
    }
}
