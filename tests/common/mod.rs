#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // In-memory backends: an empty DATABASE_URL also wins over any .env file
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_notedly-api"));
        cmd.env("PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("DATABASE_URL", "")
            .env("SESSION_SECRET", "integration-test-secret")
            .env("AUTH_ENABLE_DEV_LOGIN", "true")
            .env("NOTES_MUTATION_POLICY", "permissive")
            .env("NOTES_STRICT_AUTH_ERRORS", "false")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// A client that keeps the session cookie between requests, like a browser.
pub fn browser() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().cookie_store(true).build()?)
}

/// Signs `client` in through the development strategy. Returns the user.
pub async fn sign_in(server: &TestServer, client: &reqwest::Client, name: &str) -> Result<Value> {
    let res = client
        .post(server.url("/auth/login/dev"))
        .json(&json!({ "name": name }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "sign-in failed: {}", res.status());

    let body: Value = res.json().await?;
    Ok(body["data"].clone())
}

/// Posts one GraphQL operation and returns the whole response body.
pub async fn graphql(server: &TestServer, client: &reqwest::Client, query: &str, variables: Value) -> Result<Value> {
    let res = client
        .post(server.url("/api"))
        .json(&json!({ "query": query, "variables": variables }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "unexpected status: {}", res.status());
    Ok(res.json().await?)
}

/// `extensions.code` of the first GraphQL error, if any.
pub fn error_code(body: &Value) -> Option<&str> {
    body["errors"][0]["extensions"]["code"].as_str()
}
