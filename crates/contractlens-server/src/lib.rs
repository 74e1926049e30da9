//! Contract analysis pipeline and its HTTP API.

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod pipeline;
pub mod rate_limit;
pub mod responses;
pub mod server;

pub use config::{Environment, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use health::{Databases, DependencyStatus, check_databases};
pub use pipeline::{Analysis, AnalysisMetadata, Pipeline, PipelineError};
pub use server::{ContractLensServer, ServerError};
