//! # Voice Command Matcher
//!
//! Named patterns evaluated against every transcript chunk. All patterns are
//! checked independently, so one transcript can fire several commands.
//! Matching ignores case and surrounding whitespace.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::config::VoiceConfig;
use crate::error::InteractionResult;
use crate::event::{Transcript, VoiceEvent};

/// How a keyword set matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMode {
    /// Any keyword present.
    #[default]
    Any,
    /// Every keyword present.
    All,
}

/// A compiled voice pattern.
#[derive(Debug, Clone)]
pub enum VoicePattern {
    /// The whole transcript equals the phrase.
    Exact(String),
    /// Keywords appearing as whole words.
    Keywords {
        /// Lowercased keywords.
        words: Vec<String>,
        /// Whether any or all must be present.
        mode: KeywordMode,
    },
    /// A case-insensitive regular expression.
    Regex(Regex),
}

impl VoicePattern {
    /// Match an exact phrase. Case, spacing, and leading or trailing
    /// punctuation are ignored.
    #[must_use]
    pub fn exact(phrase: &str) -> Self {
        Self::Exact(trim_edges(&normalize(phrase)).to_string())
    }

    /// Match if any keyword is spoken.
    #[must_use]
    pub fn any_keyword<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::keywords(words, KeywordMode::Any)
    }

    /// Match if every keyword is spoken.
    #[must_use]
    pub fn all_keywords<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::keywords(words, KeywordMode::All)
    }

    fn keywords<I, S>(words: I, mode: KeywordMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Keywords {
            words: words
                .into_iter()
                .map(|w| normalize(w.as_ref()))
                .filter(|w| !w.is_empty())
                .collect(),
            mode,
        }
    }

    /// Compile a case-insensitive regular expression.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InvalidPattern`](crate::InteractionError::InvalidPattern)
    /// if the expression does not compile.
    pub fn regex(pattern: &str) -> InteractionResult<Self> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self::Regex(regex))
    }

    /// Test a normalized transcript, returning named captures on success.
    fn matches(&self, text: &str) -> Option<BTreeMap<String, String>> {
        match self {
            Self::Exact(phrase) => {
                (!phrase.is_empty() && trim_edges(text) == phrase.as_str()).then(BTreeMap::new)
            }
            Self::Keywords { words, mode } => {
                if words.is_empty() {
                    return None;
                }
                let spoken: Vec<&str> = text.split_whitespace().map(trim_punctuation).collect();
                let hit = |word: &String| contains_phrase(&spoken, word);
                let matched = match mode {
                    KeywordMode::Any => words.iter().any(hit),
                    KeywordMode::All => words.iter().all(hit),
                };
                matched.then(BTreeMap::new)
            }
            Self::Regex(regex) => {
                let captures = regex.captures(text)?;
                Some(
                    regex
                        .capture_names()
                        .flatten()
                        .filter_map(|name| {
                            captures
                                .name(name)
                                .map(|m| (name.to_string(), m.as_str().to_string()))
                        })
                        .collect(),
                )
            }
        }
    }
}

/// Serializable description of a [`VoicePattern`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSpec {
    /// Exact phrase.
    Exact(String),
    /// Keyword set.
    Keywords {
        /// Keywords.
        words: Vec<String>,
        /// Any or all.
        #[serde(default)]
        mode: KeywordMode,
    },
    /// Regular expression.
    Regex(String),
}

impl PatternSpec {
    /// Compile into a matcher.
    ///
    /// # Errors
    ///
    /// Returns an error if a regular expression does not compile.
    pub fn compile(&self) -> InteractionResult<VoicePattern> {
        match self {
            Self::Exact(phrase) => Ok(VoicePattern::exact(phrase)),
            Self::Keywords { words, mode } => Ok(VoicePattern::keywords(words, *mode)),
            Self::Regex(pattern) => VoicePattern::regex(pattern),
        }
    }
}

/// Lowercase, trim and collapse inner whitespace.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| c.is_ascii_punctuation())
}

fn trim_edges(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
}

/// Whether the (possibly multi-word) keyword appears as consecutive words.
fn contains_phrase(spoken: &[&str], keyword: &str) -> bool {
    let parts: Vec<&str> = keyword.split(' ').collect();
    !parts.is_empty() && spoken.windows(parts.len()).any(|window| window == parts.as_slice())
}

/// Registry of named voice patterns.
#[derive(Debug, Default)]
pub struct VoiceCommandMatcher {
    commands: BTreeMap<String, VoicePattern>,
    config: VoiceConfig,
}

impl VoiceCommandMatcher {
    /// Create an empty matcher with default filtering.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(VoiceConfig::default())
    }

    /// Create an empty matcher with custom filtering.
    #[must_use]
    pub fn with_config(config: VoiceConfig) -> Self {
        Self {
            commands: BTreeMap::new(),
            config,
        }
    }

    /// Register (or replace) the pattern for `name`.
    pub fn command(&mut self, name: impl Into<String>, pattern: VoicePattern) {
        let name = name.into();
        tracing::debug!(command = %name, "Voice command registered");
        self.commands.insert(name, pattern);
    }

    /// Remove the pattern for `name`.
    pub fn remove(&mut self, name: &str) -> bool {
        self.commands.remove(name).is_some()
    }

    /// Whether a pattern is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered command names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Drop every pattern.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Evaluate every pattern against a transcript chunk.
    ///
    /// Empty, interim (when filtered) and low-confidence chunks produce no
    /// events.
    #[must_use]
    pub fn match_transcript(&self, transcript: &Transcript) -> Vec<VoiceEvent> {
        if self.config.final_only && !transcript.is_final {
            return Vec::new();
        }
        if transcript.confidence < self.config.min_confidence {
            tracing::debug!(
                confidence = transcript.confidence,
                "Transcript below confidence floor"
            );
            return Vec::new();
        }
        let text = normalize(&transcript.text);
        if text.is_empty() {
            return Vec::new();
        }

        self.commands
            .iter()
            .filter_map(|(name, pattern)| {
                pattern.matches(&text).map(|captures| VoiceEvent {
                    name: name.clone(),
                    transcript: transcript.text.trim().to_string(),
                    confidence: transcript.confidence,
                    timestamp_ms: transcript.timestamp_ms,
                    captures,
                })
            })
            .collect()
    }
}
