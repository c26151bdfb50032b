#![allow(dead_code)]

use async_trait::async_trait;
use henhouse_core::llm::{ChatModel, ModelReply, ToolInvocation, ToolSpec, Turn};
use henhouse_core::tools::{FetchedPage, SearchHit, ToolResult, WebBackend};
use henhouse_core::{Error, Result};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn tool_call(name: &str, arguments: Value) -> ModelReply {
    ModelReply::ToolCall(ToolInvocation {
        id: None,
        name: name.into(),
        arguments,
    })
}

pub fn search_call(query: &str) -> ModelReply {
    tool_call("web_search", json!({ "query": query }))
}

/// A model that plays back scripted replies.
///
/// Tool-enabled turns pop from `turns` (or repeat `repeat` once empty);
/// tool-free turns pop from `plain`.
#[derive(Default)]
pub struct ScriptedModel {
    turns: Mutex<VecDeque<ModelReply>>,
    plain: Mutex<VecDeque<String>>,
    repeat: Option<ModelReply>,
    respond_calls: AtomicU32,
    plain_calls: AtomicU32,
    tool_offers: Mutex<Vec<usize>>,
    plain_transcripts: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedModel {
    pub fn new(turns: Vec<ModelReply>, plain: Vec<&str>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            plain: Mutex::new(plain.into_iter().map(String::from).collect()),
            ..Default::default()
        }
    }

    /// Request the same tool on every tool-enabled turn
    pub fn always(reply: ModelReply, plain: Vec<&str>) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::new(Vec::new(), plain)
        }
    }

    pub fn respond_calls(&self) -> u32 {
        self.respond_calls.load(Ordering::SeqCst)
    }

    pub fn plain_calls(&self) -> u32 {
        self.plain_calls.load(Ordering::SeqCst)
    }

    /// Number of tools offered on each tool-enabled turn
    pub fn tool_offers(&self) -> Vec<usize> {
        self.tool_offers.lock().unwrap().clone()
    }

    pub fn plain_transcripts(&self) -> Vec<Vec<Turn>> {
        self.plain_transcripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn respond(&self, _transcript: &[Turn], tools: &[ToolSpec]) -> Result<ModelReply> {
        self.respond_calls.fetch_add(1, Ordering::SeqCst);
        self.tool_offers.lock().unwrap().push(tools.len());
        let next = self.turns.lock().unwrap().pop_front();
        next.or_else(|| self.repeat.clone())
            .ok_or_else(|| Error::Model("script exhausted".into()))
    }

    async fn respond_without_tools(&self, transcript: &[Turn]) -> Result<String> {
        self.plain_calls.fetch_add(1, Ordering::SeqCst);
        self.plain_transcripts.lock().unwrap().push(transcript.to_vec());
        Ok(self.plain.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Web backend returning one canned hit per search
#[derive(Default)]
pub struct FakeWeb {
    pub searches: AtomicU32,
    pub fetches: AtomicU32,
}

impl FakeWeb {
    pub fn searches(&self) -> u32 {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebBackend for FakeWeb {
    async fn search(&self, query: &str, _max_results: u32) -> ToolResult<Vec<SearchHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(vec![SearchHit {
            title: Some(format!("About {query}")),
            url: Some("https://example.com/hens".into()),
            content: Some("Hens are clever birds.".into()),
        }])
    }

    async fn fetch(&self, url: &str) -> ToolResult<FetchedPage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(FetchedPage {
            title: Some("Hens".into()),
            content: Some(format!("Content of {url}")),
            links: Vec::new(),
        })
    }
}

/// Serve every request on a throw-away local port with a canned response.
/// Returns the base URL (`http://127.0.0.1:PORT`).
pub async fn serve_canned(status: u16, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut sock).await;
                let resp = format!(
                    "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

/// Accept connections and read requests but never answer.
/// Returns the base URL (`http://127.0.0.1:PORT`).
pub async fn serve_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut sock).await;
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                drop(sock);
            });
        }
    });
    format!("http://{addr}")
}

async fn read_request(sock: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match sock.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        let Some(header_end) = find(&buf, b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let length = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= header_end + 4 + length {
            return;
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
