use serde::{Deserialize, Serialize};

/// Information about a model, as returned by the `models` endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Full resource name, e.g. `models/gemini-1.5-pro-001`.
    pub name: String,

    /// Canonical identifier shared by every version of the model.
    #[serde(default)]
    pub base_model_id: String,

    /// Version of this model.
    #[serde(default)]
    pub version: String,

    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub display_name: Option<String>,

    /// Short description.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,

    /// Maximum prompt size in tokens.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub input_token_limit: Option<u64>,

    /// Maximum response size in tokens.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output_token_limit: Option<u64>,

    /// API methods the model supports, e.g. `generateContent`.
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Creates a model descriptor from its three identifying fields.
    pub fn new(
        name: impl Into<String>,
        base_model_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_model_id: base_model_id.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// The last `/`-separated segment of the resource name.
    ///
    /// `models/gemini-1.5-pro-001` becomes `gemini-1.5-pro-001`.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Returns true if the model can serve `generateContent` calls.
    ///
    /// Models that do not report their methods are assumed to support it.
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods.is_empty()
            || self
                .supported_generation_methods
                .iter()
                .any(|method| method == "generateContent")
    }
}

/// A page of results from the model list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelList {
    /// Models on this page.
    #[serde(default)]
    pub models: Vec<ModelInfo>,

    /// Token for the following page; absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_page_token: Option<String>,
}

impl ModelList {
    /// Returns the token for the next page, treating an empty token as absent.
    pub fn next_page(&self) -> Option<&str> {
        self.next_page_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_info_deserialization() {
        let value = json!({
            "name": "models/gemini-1.5-flash-001",
            "baseModelId": "gemini-1.5-flash",
            "version": "001",
            "displayName": "Gemini 1.5 Flash 001",
            "inputTokenLimit": 1000000,
            "outputTokenLimit": 8192,
            "supportedGenerationMethods": ["generateContent", "countTokens"]
        });
        let info: ModelInfo = serde_json::from_value(value).unwrap();
        assert_eq!(info.short_name(), "gemini-1.5-flash-001");
        assert_eq!(info.base_model_id, "gemini-1.5-flash");
        assert_eq!(info.version, "001");
        assert_eq!(info.input_token_limit, Some(1_000_000));
        assert!(info.supports_generation());
    }

    #[test]
    fn sparse_model_info() {
        let info: ModelInfo = serde_json::from_value(json!({"name": "models/x"})).unwrap();
        assert_eq!(info.base_model_id, "");
        assert_eq!(info.version, "");
        assert!(info.supports_generation());

        let embed = ModelInfo {
            supported_generation_methods: vec!["embedContent".to_string()],
            ..ModelInfo::new("models/embedding-001", "embedding", "001")
        };
        assert!(!embed.supports_generation());
    }

    #[test]
    fn short_name_without_prefix() {
        assert_eq!(ModelInfo::new("plain", "", "").short_name(), "plain");
    }

    #[test]
    fn model_list_paging() {
        let page: ModelList =
            serde_json::from_value(json!({"models": [], "nextPageToken": "abc"})).unwrap();
        assert_eq!(page.next_page(), Some("abc"));
        let last: ModelList =
            serde_json::from_value(json!({"models": [], "nextPageToken": ""})).unwrap();
        assert_eq!(last.next_page(), None);
    }
}
