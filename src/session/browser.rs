//! Browser-backed model session
//!
//! Drives a chat web UI through the W3C WebDriver wire protocol. Launching
//! the browser, logging in and dismissing overlays are external concerns;
//! this module only attaches to a running WebDriver session, types prompts
//! into the composer and reads replies back out of the page source.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use super::ModelSession;
use crate::error::{RecipeForgeError, Result};

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const ENTER_KEY: char = '\u{e007}';

const DEFAULT_COMPOSER_XPATH: &str = "//textarea[@name='user-prompt']";
const DEFAULT_REPLY_MARKER: &str = "chat-message";

/// A chat UI the session can type into and read replies from.
///
/// Kept as a trait so tests can drive the session without a browser.
#[async_trait]
pub trait ChatSurface: Send {
    /// Type the text into the chat composer and submit it.
    async fn submit(&mut self, text: &str) -> Result<()>;

    /// Wait for the model to finish answering and return the reply text.
    async fn await_reply(&mut self) -> Result<String>;
}

/// Model session realized against an interactive chat UI
pub struct BrowserSession<S: ChatSurface> {
    surface: S,
    reply_timeout: Duration,
}

impl<S: ChatSurface> BrowserSession<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            reply_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    async fn exchange(&mut self, text: &str) -> Result<String> {
        self.surface.submit(text).await?;
        tokio::time::timeout(self.reply_timeout, self.surface.await_reply())
            .await
            .map_err(|_| {
                RecipeForgeError::timeout("chat reply", self.reply_timeout.as_secs())
            })?
    }
}

#[async_trait]
impl<S: ChatSurface> ModelSession for BrowserSession<S> {
    async fn initialize_chat(&mut self, caption: &str) -> Result<()> {
        tracing::info!("initializing chat with recipe context");
        let context_prompt = format!(
            "I'm going to ask you questions about this recipe. Please use \
             this recipe information as context for all your responses: {}",
            caption
        );
        self.exchange(&context_prompt).await?;
        tracing::info!("chat initialized successfully with recipe context");
        Ok(())
    }

    async fn send_raw_prompt(&mut self, prompt: &str) -> Option<String> {
        match self.exchange(prompt).await {
            Ok(reply) => Some(reply),
            Err(err) => {
                tracing::warn!(error = %err, "failed to send prompt through chat UI");
                None
            }
        }
    }
}

/// Chat surface speaking the WebDriver REST protocol over HTTP
pub struct WebDriverSurface {
    client: Client,
    base_url: String,
    session_id: String,
    composer_xpath: String,
    reply_marker: String,
    reply_block_re: Regex,
    poll_interval: Duration,
    composer_wait: Duration,
    seen_replies: usize,
}

impl WebDriverSurface {
    /// Open a new WebDriver session against a running driver.
    pub async fn connect(base_url: &str) -> Result<Self> {
        let client = Self::build_client()?;
        let url = format!("{}/session", base_url.trim_end_matches('/'));
        let response: Value = client
            .post(&url)
            .json(&json!({"capabilities": {"alwaysMatch": {}}}))
            .send()
            .await?
            .json()
            .await?;
        let session_id = response["value"]["sessionId"]
            .as_str()
            .ok_or_else(|| {
                RecipeForgeError::session("WebDriver did not return a session id")
            })?
            .to_string();
        tracing::info!(session_id = %session_id, "WebDriver session opened");
        Ok(Self::with_session(client, base_url, session_id))
    }

    /// Attach to a WebDriver session somebody else already opened.
    pub fn attach(base_url: &str, session_id: &str) -> Result<Self> {
        let client = Self::build_client()?;
        Ok(Self::with_session(client, base_url, session_id.to_string()))
    }

    fn build_client() -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| RecipeForgeError::network(e.to_string(), None, None))
    }

    fn with_session(client: Client, base_url: &str, session_id: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id,
            composer_xpath: DEFAULT_COMPOSER_XPATH.to_string(),
            reply_marker: DEFAULT_REPLY_MARKER.to_string(),
            reply_block_re: reply_block_re(DEFAULT_REPLY_MARKER),
            poll_interval: Duration::from_millis(750),
            composer_wait: Duration::from_secs(15),
            seen_replies: 0,
        }
    }

    /// Override the UI selectors; chat UIs rename their CSS classes often.
    pub fn with_selectors(mut self, composer_xpath: &str, reply_marker: &str) -> Self {
        self.composer_xpath = composer_xpath.to_string();
        self.reply_marker = reply_marker.to_string();
        self.reply_block_re = reply_block_re(reply_marker);
        self
    }

    fn session_url(&self, endpoint: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, endpoint)
    }

    async fn find_composer(&self) -> Result<String> {
        let deadline = Instant::now() + self.composer_wait;
        loop {
            let response: Value = self
                .client
                .post(self.session_url("/element"))
                .json(&json!({"using": "xpath", "value": self.composer_xpath.as_str()}))
                .send()
                .await?
                .json()
                .await?;
            if let Some(element_id) = response["value"][ELEMENT_KEY].as_str() {
                return Ok(element_id.to_string());
            }
            if Instant::now() >= deadline {
                return Err(RecipeForgeError::timeout(
                    "waiting for chat composer",
                    self.composer_wait.as_secs(),
                ));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn page_source(&self) -> Result<String> {
        let response: Value = self
            .client
            .get(self.session_url("/source"))
            .send()
            .await?
            .json()
            .await?;
        response["value"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RecipeForgeError::session("WebDriver returned no page source"))
    }
}

#[async_trait]
impl ChatSurface for WebDriverSurface {
    async fn submit(&mut self, text: &str) -> Result<()> {
        let composer = self.find_composer().await?;
        self.seen_replies = count_reply_blocks(&self.page_source().await?, &self.reply_marker);

        self.client
            .post(self.session_url(&format!("/element/{}/clear", composer)))
            .json(&json!({}))
            .send()
            .await?;

        let keys = format!("{}{}", text, ENTER_KEY);
        let response = self
            .client
            .post(self.session_url(&format!("/element/{}/value", composer)))
            .json(&json!({"text": keys}))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RecipeForgeError::session(format!(
                "WebDriver rejected keystrokes ({})",
                response.status()
            )));
        }
        Ok(())
    }

    async fn await_reply(&mut self) -> Result<String> {
        // A reply counts as complete once its text stops changing between
        // two consecutive polls.
        let mut last_text: Option<String> = None;
        loop {
            tokio::time::sleep(self.poll_interval).await;
            let source = self.page_source().await?;
            if count_reply_blocks(&source, &self.reply_marker) <= self.seen_replies {
                continue;
            }
            let Some(text) = extract_reply(&source, &self.reply_block_re) else {
                continue;
            };
            if last_text.as_deref() == Some(text.as_str()) {
                self.seen_replies = count_reply_blocks(&source, &self.reply_marker);
                return Ok(text);
            }
            last_text = Some(text);
        }
    }
}

fn count_reply_blocks(source: &str, marker: &str) -> usize {
    source.matches(marker).count()
}

fn json_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<code[^>]*class="[^"]*language-json[^"]*"[^>]*>(.*?)</code>"#)
            .expect("valid regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"))
}

/// Regex matching one marked reply block; the marker is escaped, so the
/// pattern is always valid.
fn reply_block_re(marker: &str) -> Regex {
    Regex::new(&format!(
        r#"(?s)<div[^>]*class="[^"]*{}[^"]*"[^>]*>(.*?)</div>"#,
        regex::escape(marker)
    ))
    .expect("valid regex")
}

/// Pull the latest reply out of the page source.
///
/// A fenced JSON reply is rendered by chat UIs as a highlighted code block;
/// that block is re-wrapped in a ```json fence so the generic extractor can
/// handle it. The code-block search is confined to the newest reply block:
/// a code block from an earlier turn must not shadow a newer prose reply.
/// Without a code block, the newest reply block is reduced to its text.
fn extract_reply(source: &str, block_re: &Regex) -> Option<String> {
    let newest = block_re
        .captures_iter(source)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());

    let span = newest.unwrap_or(source);
    if let Some(block) = json_code_re().captures_iter(span).last().and_then(|c| c.get(1)) {
        let code = unescape_entities(&strip_tags(block.as_str()));
        return Some(format!("```json\n{}\n```", code.trim()));
    }

    let text = unescape_entities(&strip_tags(newest?)).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn strip_tags(html: &str) -> String {
    tag_re().replace_all(html, "").to_string()
}

fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#34;", "\"")
        .replace("&amp;", "&")
}
