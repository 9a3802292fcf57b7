//! Sources, domains and scenarios

use serde::{Deserialize, Serialize};

use super::time::Timestamp;

/// How a source's content is ingested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum SourceType {
    Web,
    SingleFile,
    ArchivedFiles,
    WithCredentials,
}

impl TryFrom<i32> for SourceType {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Web),
            2 => Ok(Self::SingleFile),
            3 => Ok(Self::ArchivedFiles),
            4 => Ok(Self::WithCredentials),
            other => Err(format!("unknown source type: {}", other)),
        }
    }
}

impl From<SourceType> for i32 {
    fn from(value: SourceType) -> Self {
        match value {
            SourceType::Web => 1,
            SourceType::SingleFile => 2,
            SourceType::ArchivedFiles => 3,
            SourceType::WithCredentials => 4,
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "file" | "single-file" => Ok(Self::SingleFile),
            "archive" | "archived-files" => Ok(Self::ArchivedFiles),
            "credentials" | "with-credentials" => Ok(Self::WithCredentials),
            other => Err(format!("unknown source type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CronSchedule {
    pub minute: i32,
    pub hour: i32,
    pub day_of_month: i32,
    pub month: i32,
    pub day_of_week: i32,
}

/// Re-ingestion schedule of a source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<CronSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every_period: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    /// Raw type code; see [`Source::source_type`]
    #[serde(default)]
    pub typ: i32,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
    #[serde(default)]
    pub update_params: Option<UpdateParams>,
}

impl Source {
    pub fn source_type(&self) -> Option<SourceType> {
        SourceType::try_from(self.typ).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSourceRequest {
    pub title: String,
    pub typ: SourceType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_params: Option<UpdateParams>,
}

/// Named collection of sources used as retrieval context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source_ids: Vec<i64>,
    #[serde(default)]
    pub scenario_ids: Vec<i64>,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDomainRequest {
    pub title: String,
    pub source_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    pub model_name: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub top_k: i32,
    pub top_p: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultiQueryConfig {
    pub use_multiquery: bool,
    pub n_queries: i32,
    pub query_model_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RerankerConfig {
    pub use_rerank: bool,
    pub reranker_model: String,
    pub reranker_max_length: i32,
    pub top_k: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VectorSearchConfig {
    pub top_n: i32,
    pub threshold: f64,
    pub search_by_query: bool,
}

/// Model and retrieval parameters applied to one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: i64,
    #[serde(default)]
    pub domain_id: i64,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub multi_query: MultiQueryConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub vector_search: VectorSearchConfig,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScenarioRequest {
    pub domain_id: i64,
    pub model: ModelConfig,
    pub multi_query: MultiQueryConfig,
    pub reranker: RerankerConfig,
    pub vector_search: VectorSearchConfig,
}

impl CreateScenarioRequest {
    /// Request with the settings a new scenario starts from
    pub fn for_domain(domain_id: i64) -> Self {
        Self {
            domain_id,
            model: ModelConfig {
                temperature: 0.7,
                top_k: 5,
                top_p: 0.9,
                ..Default::default()
            },
            multi_query: MultiQueryConfig {
                n_queries: 3,
                ..Default::default()
            },
            reranker: RerankerConfig {
                reranker_max_length: 512,
                top_k: 5,
                ..Default::default()
            },
            vector_search: VectorSearchConfig {
                top_n: 10,
                threshold: 0.5,
                search_by_query: true,
            },
        }
    }
}
