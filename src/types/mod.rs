//! Wire types for the Gemini `generativelanguage` REST API.

mod content;
mod generate_content;
mod model;
mod model_info;

pub use content::{Content, Part, Role, TextPart};
pub use generate_content::{
    Candidate, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    PromptFeedback, UsageMetadata,
};
pub use model::{KnownModel, MODEL_RESOURCE_PREFIX, Model};
pub use model_info::{ModelInfo, ModelList};
