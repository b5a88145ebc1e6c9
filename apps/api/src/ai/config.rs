use std::str::FromStr;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    OpenAi,
    Anthropic,
    Gemini,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Anthropic => "anthropic",
            AiProvider::Gemini => "gemini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "https://api.openai.com/v1",
            AiProvider::Anthropic => "https://api.anthropic.com/v1",
            AiProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "gpt-4o-mini",
            AiProvider::Anthropic => "claude-sonnet-4-5",
            AiProvider::Gemini => "gemini-2.5-flash",
        }
    }
}

impl FromStr for AiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(AiProvider::OpenAi),
            "anthropic" | "claude" => Ok(AiProvider::Anthropic),
            "gemini" | "google" => Ok(AiProvider::Gemini),
            other => Err(format!("unknown AI provider '{other}'")),
        }
    }
}

/// Provider settings for résumé analysis. The backend holds the persisted copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    #[serde(default)]
    pub provider: Option<AiProvider>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl AiConfig {
    /// A known provider and a non-blank API key; nothing else matters.
    pub fn is_configured(&self) -> bool {
        self.provider.is_some() && !self.api_key.trim().is_empty()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.provider.map(|p| p.default_base_url()))
    }

    pub fn model(&self) -> Option<&str> {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.provider.map(|p| p.default_model()))
    }

    /// Copy safe to return to clients: the key is reduced to its last four characters.
    pub fn redacted(&self) -> Self {
        let visible: String = self
            .api_key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        Self {
            api_key: if self.api_key.is_empty() {
                String::new()
            } else {
                format!("****{visible}")
            },
            ..self.clone()
        }
    }
}

/// In-memory holder for the active provider configuration.
#[derive(Debug, Default)]
pub struct AiSettings {
    current: RwLock<Option<AiConfig>>,
}

impl AiSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_config(&self, config: AiConfig) {
        if let Ok(mut current) = self.current.write() {
            *current = Some(config);
        }
    }

    pub fn config(&self) -> Option<AiConfig> {
        self.current.read().ok().and_then(|c| c.clone())
    }

    pub fn clear(&self) {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
    }

    pub fn is_configured(&self) -> bool {
        self.current
            .read()
            .map(|c| c.as_ref().is_some_and(AiConfig::is_configured))
            .unwrap_or(false)
    }
}
