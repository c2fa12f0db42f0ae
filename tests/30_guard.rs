mod common;

use anyhow::Result;
use serde_json::{json, Value};

#[tokio::test]
async fn deep_operation_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = common::browser()?;

    let query = r#"{ singleNote(id: "x") { author { notes { author { notes { author { id } } } } } } }"#;
    let body = common::graphql(server, &client, query, json!({})).await?;

    assert_eq!(common::error_code(&body), Some("VALIDATION_REJECTED"));
    assert_eq!(body["data"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn fan_out_operation_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = common::browser()?;

    let query = "{ allNotes { favoritedBy { favorites { favoritedBy { favorites { id } } } } } }";
    let body = common::graphql(server, &client, query, json!({})).await?;

    assert_eq!(common::error_code(&body), Some("VALIDATION_REJECTED"));
    assert!(body["errors"][0]["message"].as_str().unwrap_or_default().contains("complexity"));
    Ok(())
}

#[tokio::test]
async fn operation_within_limits_runs() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = common::browser()?;

    let body = common::graphql(server, &client, "{ allNotes { id author { name } } }", json!({})).await?;
    assert!(body.get("errors").is_none());
    assert!(body["data"]["allNotes"].is_array());
    Ok(())
}
