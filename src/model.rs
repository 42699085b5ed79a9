use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Models offered by the model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum ModelId {
    #[default]
    #[serde(rename = "gemini-2.5-flash")]
    #[value(name = "gemini-2.5-flash")]
    Gemini25Flash,

    #[serde(rename = "gemini-2.5-pro")]
    #[value(name = "gemini-2.5-pro")]
    Gemini25Pro,

    #[serde(rename = "gemini-2.0-flash")]
    #[value(name = "gemini-2.0-flash")]
    Gemini20Flash,

    #[serde(rename = "gemini-1.5-flash")]
    #[value(name = "gemini-1.5-flash")]
    Gemini15Flash,

    #[serde(rename = "gemini-1.5-pro")]
    #[value(name = "gemini-1.5-pro")]
    Gemini15Pro,
}

impl ModelId {
    pub const ALL: [ModelId; 5] = [
        ModelId::Gemini25Flash,
        ModelId::Gemini25Pro,
        ModelId::Gemini20Flash,
        ModelId::Gemini15Flash,
        ModelId::Gemini15Pro,
    ];

    /// Identifier used in the request path.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelId::Gemini25Flash => "gemini-2.5-flash",
            ModelId::Gemini25Pro => "gemini-2.5-pro",
            ModelId::Gemini20Flash => "gemini-2.0-flash",
            ModelId::Gemini15Flash => "gemini-1.5-flash",
            ModelId::Gemini15Pro => "gemini-1.5-pro",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|m| *m == self).unwrap_or(0)
    }

    /// Next entry in selector order, wrapping around.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
