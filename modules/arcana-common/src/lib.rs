pub mod config;
pub mod error;
pub mod policy;
pub mod taxonomy;
pub mod types;

pub use config::Config;
pub use error::PipelineError;
pub use policy::ContentPolicy;
pub use taxonomy::Taxonomy;
pub use types::*;
