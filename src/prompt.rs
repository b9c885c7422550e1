//! Prompt templates
//!
//! Prompts are fetched from the backend and compiled locally by substituting
//! `{{variable}}` placeholders. Text prompts are a single template; chat
//! prompts are a list of role/content messages, each content a template.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::client::PromptBackend;
use crate::error::{Result, TraceQueryError};

static VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptBody {
    Text(String),
    Chat(Vec<ChatMessage>),
}

impl PromptBody {
    fn templates(&self) -> Vec<&str> {
        match self {
            PromptBody::Text(text) => vec![text.as_str()],
            PromptBody::Chat(messages) => messages.iter().map(|m| m.content.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub version: u32,
    #[serde(rename = "prompt")]
    pub body: PromptBody,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPrompt {
    pub name: String,
    pub version: u32,
    pub prompt: PromptBody,
}

impl Prompt {
    /// Distinct variable names, in order of first appearance
    pub fn variables(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for template in self.body.templates() {
            for caps in VARIABLE.captures_iter(template) {
                let name = caps[1].to_string();
                if !seen.contains(&name) {
                    seen.push(name);
                }
            }
        }
        seen
    }

    /// Substitute every placeholder. Fails if any variable has no value;
    /// unused values are ignored.
    pub fn compile(&self, values: &HashMap<String, String>) -> Result<CompiledPrompt> {
        let missing: Vec<String> = self
            .variables()
            .into_iter()
            .filter(|v| !values.contains_key(v))
            .collect();
        if !missing.is_empty() {
            return Err(TraceQueryError::Prompt(format!(
                "prompt '{}' v{} is missing variables: {}",
                self.name,
                self.version,
                missing.join(", ")
            )));
        }

        let fill = |template: &str| -> String {
            VARIABLE
                .replace_all(template, |caps: &Captures| values[&caps[1]].clone())
                .into_owned()
        };

        let prompt = match &self.body {
            PromptBody::Text(text) => PromptBody::Text(fill(text)),
            PromptBody::Chat(messages) => PromptBody::Chat(
                messages
                    .iter()
                    .map(|m| ChatMessage {
                        role: m.role.clone(),
                        content: fill(&m.content),
                    })
                    .collect(),
            ),
        };

        Ok(CompiledPrompt {
            name: self.name.clone(),
            version: self.version,
            prompt,
        })
    }
}

/// Fetches prompts and compiles them
pub struct PromptService {
    backend: Arc<dyn PromptBackend>,
}

impl PromptService {
    pub fn new(backend: Arc<dyn PromptBackend>) -> Self {
        Self { backend }
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        version: Option<u32>,
        label: Option<&str>,
    ) -> Result<Prompt> {
        if name.trim().is_empty() {
            return Err(TraceQueryError::InvalidRequest(
                "prompt name must not be empty".to_string(),
            ));
        }
        debug!(prompt = %name, ?version, ?label, "Fetching prompt");
        self.backend
            .fetch_prompt(name, version, label)
            .await
            .map_err(|e| TraceQueryError::Prompt(format!("failed to fetch '{}': {}", name, e)))
    }

    pub async fn compile_prompt(
        &self,
        name: &str,
        version: Option<u32>,
        label: Option<&str>,
        values: &HashMap<String, String>,
    ) -> Result<CompiledPrompt> {
        self.get_prompt(name, version, label).await?.compile(values)
    }
}
