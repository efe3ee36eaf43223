use anyhow::Result;

use super::Message;
use super::Role;

#[test]
fn it_executes_new() {
    let msg = Message::new(Role::User, "Hi there!");
    assert_eq!(msg.role, Role::User);
    assert_eq!(msg.role.to_string(), "user");
    assert_eq!(msg.content, "Hi there!".to_string());
    assert!(!msg.id.is_empty());
}

#[test]
fn it_creates_unique_ids() {
    let first = Message::user("Hi there!");
    let second = Message::user("Hi there!");
    assert_ne!(first.id, second.id);
}

#[test]
fn it_serializes_lowercase_roles() -> Result<()> {
    let msg = Message::assistant("Hello");
    let json = serde_json::to_value(&msg)?;
    assert_eq!(json["role"], "assistant");
    assert_eq!(json["content"], "Hello");
    return Ok(());
}

#[test]
fn it_deserializes_without_id() -> Result<()> {
    let msg: Message = serde_json::from_str(r#"{"role":"user","content":"What is a monad?"}"#)?;
    assert_eq!(msg.role, Role::User);
    assert_eq!(msg.content, "What is a monad?");
    assert!(!msg.id.is_empty());
    return Ok(());
}

#[test]
fn it_rejects_unknown_roles() {
    let res = serde_json::from_str::<Message>(r#"{"role":"system","content":"x"}"#);
    assert!(res.is_err());
}
