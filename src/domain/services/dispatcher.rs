#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;

use super::ContentParser;
use crate::domain::models::ActionRequest;
use crate::domain::models::AppError;
use crate::domain::models::CodeAction;
use crate::domain::models::ContentSegment;
use crate::domain::models::GatewayBox;
use crate::domain::models::GatewayRequest;
use crate::domain::models::Message;
use crate::domain::models::Role;
use crate::domain::models::StatField;
use crate::domain::models::UsageRecorder;
use crate::domain::models::TIME_SAVED_PER_ACTION;

/// Lifecycle of a single invocation. Only traced, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum DispatchState {
    Idle,
    Validating,
    InvalidInput,
    Dispatching,
    UpstreamFailure,
    ParsingReply,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionOutcome {
    pub segments: Vec<ContentSegment>,
    pub raw: String,
}

/// Which stat increments a completed invocation earns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsageKind {
    Action(CodeAction),
    Chat,
}

impl UsageKind {
    pub fn increments(&self) -> Vec<(StatField, f64)> {
        match self {
            UsageKind::Action(action) => {
                let mut res = vec![];
                if *action == CodeAction::Generate {
                    res.push((StatField::CodeGenerated, 1.0));
                }
                res.push((StatField::TasksCompleted, 1.0));
                res.push((StatField::TimeSaved, TIME_SAVED_PER_ACTION));
                return res;
            }
            UsageKind::Chat => return vec![(StatField::TasksCompleted, 1.0)],
        }
    }
}

fn transition(state: &mut DispatchState, next: DispatchState) {
    tracing::debug!(from = %state, to = %next, "Dispatch state");
    *state = next;
}

pub struct ActionDispatcher {
    gateway: GatewayBox,
}

impl ActionDispatcher {
    pub fn new(gateway: GatewayBox) -> ActionDispatcher {
        return ActionDispatcher { gateway };
    }

    async fn dispatch(
        &self,
        state: &mut DispatchState,
        request: GatewayRequest,
    ) -> Result<ActionOutcome, AppError> {
        transition(state, DispatchState::Dispatching);
        let reply = match self.gateway.execute(&request).await {
            Ok(reply) => reply,
            Err(err) => {
                transition(state, DispatchState::UpstreamFailure);
                return Err(err);
            }
        };

        transition(state, DispatchState::ParsingReply);
        let segments = ContentParser::parse(&reply.text);

        transition(state, DispatchState::Completed);
        return Ok(ActionOutcome {
            segments,
            raw: reply.text,
        });
    }

    /// Validates, executes and parses one code action. Invalid input never
    /// reaches the gateway.
    pub async fn run(&self, request: &ActionRequest) -> Result<ActionOutcome, AppError> {
        let mut state = DispatchState::Idle;
        transition(&mut state, DispatchState::Validating);
        if let Err(err) = request.validate() {
            transition(&mut state, DispatchState::InvalidInput);
            return Err(err);
        }

        tracing::info!(
            action = %request.action,
            language = request.language,
            "Running code action"
        );
        return self
            .dispatch(&mut state, GatewayRequest::Code(request.clone()))
            .await;
    }

    /// Sends the whole conversation. The last message must be a non-blank user
    /// turn.
    pub async fn chat(&self, messages: &[Message]) -> Result<ActionOutcome, AppError> {
        let mut state = DispatchState::Idle;
        transition(&mut state, DispatchState::Validating);

        let has_prompt = messages
            .last()
            .map(|message| {
                return message.role == Role::User && !message.content.trim().is_empty();
            })
            .unwrap_or(false);
        if !has_prompt {
            transition(&mut state, DispatchState::InvalidInput);
            return Err(AppError::invalid_input("Please enter a message"));
        }

        tracing::info!(messages = messages.len(), "Running chat");
        return self
            .dispatch(&mut state, GatewayRequest::Chat(messages.to_vec()))
            .await;
    }
}

/// Applies the stat increments for a completed invocation. Failures are
/// logged and handed back as warnings, they never fail the action itself.
pub async fn record_usage(
    recorder: &(dyn UsageRecorder + Send + Sync),
    kind: UsageKind,
) -> Vec<AppError> {
    let mut warnings = vec![];
    for (field, value) in kind.increments() {
        if let Err(err) = recorder.increment(field, value).await {
            tracing::warn!(error = ?err, %field, "Failed to record usage");
            warnings.push(err);
        }
    }

    return warnings;
}
