//! Gateway module - provider polling and the generation pipeline

pub mod pipeline;
pub mod poller;

pub use pipeline::{GenerationOutcome, GenerationService};
pub use poller::{await_completion, Completion};
