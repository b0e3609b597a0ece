//! Media generation providers

pub mod apiframe;
pub mod kling;
pub mod pollinations;
pub mod registry;
pub mod replicate;
pub mod schema;
pub mod traits;
pub mod transport;

pub use registry::ProviderRegistry;
pub use schema::{extract_result_url, PollSchema, ResultExtractor};
pub use traits::{
    Destination, GenerationJob, JobParameters, MediaProvider, PollPolicy, PollResult,
    ProviderKind, ProviderRequest, ResultRef, Submission, TaskHandle,
};
