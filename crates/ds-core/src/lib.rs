pub mod error;
pub mod params;
pub mod gaussian_cloud;
pub mod images;
pub mod pipeline;
pub mod inference;
pub mod candidate;
pub mod seed;
pub mod preprocess;
pub mod scheduler;
pub mod selector;
pub mod delivery;
pub mod orchestrator;
#[cfg(test)]
mod testing;

pub use candidate::{CandidateResult, ChampionResult, Strategy};
pub use error::{BoxError, Error, Result};
pub use orchestrator::{ChampionOrchestrator, GenerationRequest};
pub use params::{GenerationParameters, ParameterOverride};
pub use seed::Seed;
