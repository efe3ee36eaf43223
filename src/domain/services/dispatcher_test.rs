use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use test_utils::codeblock_fixture;

use super::record_usage;
use super::ActionDispatcher;
use super::UsageKind;
use crate::domain::models::ActionRequest;
use crate::domain::models::AppError;
use crate::domain::models::CodeAction;
use crate::domain::models::ContentSegment;
use crate::domain::models::Gateway;
use crate::domain::models::GatewayRequest;
use crate::domain::models::Message;
use crate::domain::models::RawReply;
use crate::domain::models::SegmentKind;
use crate::domain::models::StatField;
use crate::domain::models::UsageRecorder;
use crate::domain::models::UsageStats;
use crate::domain::services::Stats;
use crate::infrastructure::stores::StoreManager;

struct FakeGateway {
    reply: Result<String, AppError>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<GatewayRequest>>>,
}

impl FakeGateway {
    fn replying(reply: Result<String, AppError>) -> FakeGateway {
        return FakeGateway {
            reply,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(vec![])),
        };
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn execute(&self, request: &GatewayRequest) -> Result<RawReply, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        return self.reply.clone().map(|text| return RawReply { text });
    }
}

fn fake_dispatcher(reply: Result<String, AppError>) -> (ActionDispatcher, Arc<AtomicUsize>) {
    let gateway = FakeGateway::replying(reply);
    let calls = Arc::clone(&gateway.calls);
    return (ActionDispatcher::new(Box::new(gateway)), calls);
}

struct FailingRecorder {}

#[async_trait]
impl UsageRecorder for FailingRecorder {
    async fn increment(&self, _field: StatField, _value: f64) -> Result<UsageStats, AppError> {
        return Err(AppError::persistence("disk is full"));
    }
}

#[tokio::test]
async fn it_rejects_empty_code_without_calling_the_gateway() {
    let (dispatcher, calls) = fake_dispatcher(Ok("unused".to_string()));

    for input in ["", "   ", "\n\t"] {
        let res = dispatcher
            .run(&ActionRequest::new(CodeAction::Format, "JavaScript", input))
            .await;
        assert_eq!(res, Err(AppError::invalid_input("Please enter code")));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn it_rejects_empty_descriptions_without_calling_the_gateway() {
    let (dispatcher, calls) = fake_dispatcher(Ok("unused".to_string()));
    let res = dispatcher
        .run(&ActionRequest::new(CodeAction::Generate, "Python", " "))
        .await;

    assert_eq!(res, Err(AppError::invalid_input("Please enter a description")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn it_returns_plain_generated_code_as_a_single_prose_segment() -> Result<()> {
    let code = "def add(a, b):\n    return a + b";
    let (dispatcher, calls) = fake_dispatcher(Ok(code.to_string()));

    let res = dispatcher
        .run(&ActionRequest::new(
            CodeAction::Generate,
            "Python",
            "a function that adds two numbers",
        ))
        .await?;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(res.raw, code);
    assert_eq!(res.segments, vec![ContentSegment::prose(code)]);
    return Ok(());
}

#[tokio::test]
async fn it_parses_fenced_replies() -> Result<()> {
    let (dispatcher, _) = fake_dispatcher(Ok(codeblock_fixture().to_string()));
    let res = dispatcher
        .run(&ActionRequest::new(CodeAction::Review, "Rust", "fn main() {}"))
        .await?;

    let kinds = res
        .segments
        .iter()
        .map(|segment| return segment.kind)
        .collect::<Vec<SegmentKind>>();
    assert_eq!(kinds.iter().filter(|kind| return **kind == SegmentKind::Code).count(), 4);
    assert_eq!(kinds.first(), Some(&SegmentKind::Prose));
    assert_eq!(res.raw, codeblock_fixture());
    return Ok(());
}

#[tokio::test]
async fn it_sends_the_request_unchanged() -> Result<()> {
    let gateway = FakeGateway::replying(Ok("ok".to_string()));
    let requests = Arc::clone(&gateway.requests);
    let dispatcher = ActionDispatcher::new(Box::new(gateway));

    let req = ActionRequest::new(CodeAction::Debug, "Go", "func main() {}");
    dispatcher.run(&req).await?;

    assert_eq!(*requests.lock().unwrap(), vec![GatewayRequest::Code(req)]);
    return Ok(());
}

#[tokio::test]
async fn it_passes_upstream_failures_through() {
    let failure = AppError::UpstreamError {
        status: 429,
        body: "rate limited".to_string(),
    };
    let (dispatcher, calls) = fake_dispatcher(Err(failure.clone()));

    let res = dispatcher
        .run(&ActionRequest::new(CodeAction::Optimize, "C", "int x;"))
        .await;

    assert_eq!(res, Err(failure));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn it_requires_a_trailing_user_message_for_chat() {
    let (dispatcher, calls) = fake_dispatcher(Ok("unused".to_string()));

    for messages in [
        vec![],
        vec![Message::greeting()],
        vec![Message::greeting(), Message::user("   ")],
    ] {
        let res = dispatcher.chat(&messages).await;
        assert!(matches!(res, Err(AppError::InvalidInput(_))));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn it_forwards_chat_conversations() -> Result<()> {
    let gateway = FakeGateway::replying(Ok("Sure.".to_string()));
    let requests = Arc::clone(&gateway.requests);
    let dispatcher = ActionDispatcher::new(Box::new(gateway));

    let messages = vec![Message::greeting(), Message::user("Explain lifetimes")];
    let res = dispatcher.chat(&messages).await?;

    assert_eq!(res.segments, vec![ContentSegment::prose("Sure.")]);
    assert_eq!(*requests.lock().unwrap(), vec![GatewayRequest::Chat(messages)]);
    return Ok(());
}

#[test]
fn it_computes_usage_increments() {
    assert_eq!(
        UsageKind::Action(CodeAction::Generate).increments(),
        vec![
            (StatField::CodeGenerated, 1.0),
            (StatField::TasksCompleted, 1.0),
            (StatField::TimeSaved, 0.5),
        ]
    );
    assert_eq!(
        UsageKind::Action(CodeAction::Format).increments(),
        vec![(StatField::TasksCompleted, 1.0), (StatField::TimeSaved, 0.5)]
    );
    assert_eq!(
        UsageKind::Chat.increments(),
        vec![(StatField::TasksCompleted, 1.0)]
    );
}

#[tokio::test]
async fn it_records_usage_into_stats() -> Result<()> {
    let stats = Stats::new(StoreManager::in_memory());
    let warnings = record_usage(&stats, UsageKind::Action(CodeAction::Generate)).await;
    assert!(warnings.is_empty());

    let res = stats.get()?;
    assert_eq!(
        res,
        UsageStats {
            code_generated: 1,
            tasks_completed: 1,
            time_saved: 0.5,
        }
    );
    return Ok(());
}

#[tokio::test]
async fn it_keeps_the_outcome_when_recording_usage_fails() -> Result<()> {
    let (dispatcher, _) = fake_dispatcher(Ok("const a = 1;".to_string()));
    let res = dispatcher
        .run(&ActionRequest::new(CodeAction::Format, "JavaScript", "const a=1"))
        .await?;

    let warnings = record_usage(&FailingRecorder {}, UsageKind::Action(CodeAction::Format)).await;

    assert_eq!(warnings.len(), 2);
    assert_eq!(res.raw, "const a = 1;");
    return Ok(());
}
