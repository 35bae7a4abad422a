use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The resource prefix the API puts in front of model names.
pub const MODEL_RESOURCE_PREFIX: &str = "models/";

/// Represents a Gemini model identifier.
///
/// This can be a predefined model or a custom string value for models that
/// are not listed here (tuned models, previews, newer releases).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier
    Custom(String),
}

/// Known Gemini models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// Gemini 1.5 Pro (latest)
    #[serde(rename = "gemini-1.5-pro-latest")]
    Gemini15ProLatest,

    /// Gemini 1.5 Flash (latest)
    #[serde(rename = "gemini-1.5-flash-latest")]
    Gemini15FlashLatest,

    /// Gemini 2.0 Flash
    #[serde(rename = "gemini-2.0-flash")]
    Gemini20Flash,

    /// Gemini 2.5 Flash
    #[serde(rename = "gemini-2.5-flash")]
    Gemini25Flash,

    /// Gemini 2.5 Pro
    #[serde(rename = "gemini-2.5-pro")]
    Gemini25Pro,
}

impl KnownModel {
    const ALL: [KnownModel; 5] = [
        KnownModel::Gemini15ProLatest,
        KnownModel::Gemini15FlashLatest,
        KnownModel::Gemini20Flash,
        KnownModel::Gemini25Flash,
        KnownModel::Gemini25Pro,
    ];

    /// The API identifier of this model.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Gemini15ProLatest => "gemini-1.5-pro-latest",
            KnownModel::Gemini15FlashLatest => "gemini-1.5-flash-latest",
            KnownModel::Gemini20Flash => "gemini-2.0-flash",
            KnownModel::Gemini25Flash => "gemini-2.5-flash",
            KnownModel::Gemini25Pro => "gemini-2.5-pro",
        }
    }
}

impl Model {
    /// The model name without the `models/` resource prefix.
    pub fn id(&self) -> &str {
        match self {
            Model::Known(known) => known.as_str(),
            Model::Custom(custom) => custom,
        }
    }

    /// The full resource name, e.g. `models/gemini-2.5-pro`.
    ///
    /// Identifiers that already name a collection (`tunedModels/...`) are
    /// returned unchanged.
    pub fn resource_name(&self) -> String {
        let id = self.id();
        if id.contains('/') {
            id.to_string()
        } else {
            format!("{MODEL_RESOURCE_PREFIX}{id}")
        }
    }

    /// Returns true if the identifier is empty.
    pub fn is_empty(&self) -> bool {
        self.id().is_empty()
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Gemini15ProLatest)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Model {
    type Err = Infallible;

    /// Parses a model name, with or without the `models/` prefix.
    ///
    /// Surrounding whitespace is ignored.  Names that are not known become
    /// [`Model::Custom`]; this never fails.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let id = trimmed
            .strip_prefix(MODEL_RESOURCE_PREFIX)
            .unwrap_or(trimmed);
        Ok(KnownModel::ALL
            .iter()
            .find(|known| known.as_str() == id)
            .map(|known| Model::Known(*known))
            .unwrap_or_else(|| Model::Custom(id.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        match model.parse() {
            Ok(model) => model,
            Err(never) => match never {},
        }
    }
}
