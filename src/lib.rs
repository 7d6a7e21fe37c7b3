pub mod analysis;
pub mod core;
pub mod engine;
pub mod interface;

pub use crate::core::error::{SansError, SansResult};
pub use crate::core::model::{ModelParameters, SansModel};
pub use crate::engine::evaluator::ScatteringEvaluator;
pub use crate::engine::sampler::{default_rng, seeded_rng, ScatEvent};
