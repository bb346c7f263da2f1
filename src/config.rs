//! Configuration for markup generation

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a markup configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Quote character used around rendered attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    #[default]
    Single,
    Double,
}

impl QuoteStyle {
    pub fn as_char(self) -> char {
        match self {
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
        }
    }
}

/// Options controlling rendered markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupConfig {
    /// Quote style for attribute values
    pub quote: QuoteStyle,

    /// Tags rendered as self-closing, without children
    pub void_tags: Vec<String>,
}

/// TOML structure for deserializing a config file
#[derive(Deserialize)]
struct TomlMarkupConfig {
    markup: Option<TomlMarkup>,
}

#[derive(Deserialize)]
struct TomlMarkup {
    quote: Option<QuoteStyle>,
    void_tags: Option<Vec<String>>,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            quote: QuoteStyle::Single,
            void_tags: vec!["br".to_string()],
        }
    }
}

impl MarkupConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string; missing keys keep their defaults
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlMarkupConfig = toml::from_str(content)?;
        let mut config = Self::default();
        if let Some(markup) = parsed.markup {
            if let Some(quote) = markup.quote {
                config.quote = quote;
            }
            if let Some(void_tags) = markup.void_tags {
                config.void_tags = void_tags;
            }
        }
        Ok(config)
    }

    /// Set the attribute quote style
    pub fn with_quote(mut self, quote: QuoteStyle) -> Self {
        self.quote = quote;
        self
    }

    /// Add a self-closing tag
    pub fn with_void_tag(mut self, tag: impl Into<String>) -> Self {
        self.void_tags.push(tag.into());
        self
    }

    /// Whether `tag` renders as a self-closing element
    pub fn is_void(&self, tag: &str) -> bool {
        self.void_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
