use async_trait::async_trait;

use super::ActionRequest;
use super::AppError;
use super::Message;
use super::StatField;
use super::UsageStats;

/// What gets forwarded upstream. Code actions are a single shaped turn, chat
/// forwards the whole conversation untouched.
#[derive(Clone, Debug, PartialEq)]
pub enum GatewayRequest {
    Code(ActionRequest),
    Chat(Vec<Message>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawReply {
    pub text: String,
}

#[async_trait]
pub trait Gateway {
    /// Executes a single request against the model. Exactly one attempt is
    /// made, failures are never retried.
    async fn execute(&self, request: &GatewayRequest) -> Result<RawReply, AppError>;
}

pub type GatewayBox = Box<dyn Gateway + Send + Sync>;

#[async_trait]
pub trait UsageRecorder {
    /// Atomically adds `value` to `field`, returning the stats after the write.
    async fn increment(&self, field: StatField, value: f64) -> Result<UsageStats, AppError>;
}
