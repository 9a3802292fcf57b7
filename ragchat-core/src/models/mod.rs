//! Records exchanged with the REST backend

pub mod auth;
pub mod catalog;
pub mod chat;
pub mod time;

pub use auth::{LoginRequest, LoginResponse, Role, UserMeta};
pub use catalog::{
    CreateDomainRequest, CreateScenarioRequest, CreateSourceRequest, CronSchedule, Domain,
    ModelConfig, MultiQueryConfig, RerankerConfig, Scenario, Source, SourceType, UpdateParams,
    VectorSearchConfig,
};
pub use chat::{
    DisplayedExchange, DisplayedSession, Session, SessionContentMessage, SessionQuery,
    SessionResponse, ShortSession,
};
pub use time::Timestamp;
