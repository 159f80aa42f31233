use serde::{Deserialize, Serialize};

/// A stored question/SQL pair used for few-shot prompting.
///
/// Immutable once stored; the store itself only grows (see
/// [`crate::examples::ExampleStore`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    pub question: String,
    pub sql: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    pub data_type: String,
}

/// One table of the live schema. Fetched fresh from the database on each
/// schema read, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaTable {
    pub name: String,
    pub columns: Vec<SchemaColumn>,
}

/// Sampling parameters forwarded to the model collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub use_cache: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 200,
            temperature: 0.1,
            top_p: 0.9,
            use_cache: true,
        }
    }
}
