// Business logic for generation requests

pub mod entitlement;
pub mod generation_store;
pub mod image_stager;
pub mod job_poller;
pub mod job_submitter;
pub mod jwt;
pub mod object_storage;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod rate_limit;

pub use entitlement::{
    DieselEntitlementStore, Denial, EntitlementLedger, EntitlementStore, LedgerError,
};
pub use generation_store::{DieselGenerationStore, GenerationStore, GenerationStoreError};
pub use image_stager::{ImageStager, StagedImage, StagingError};
pub use job_poller::{JobPoller, PollOutcome};
pub use job_submitter::{AspectRatio, JobSpec, JobSubmitter};
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use object_storage::{HttpObjectStorage, ObjectStorage, StorageError};
pub use orchestrator::{CallSite, Collaborators, GenerationOrchestrator, GenerationPolicy};
pub use prompt::ShootPrompt;
pub use provider::{HttpImageProvider, ImageProvider, ProviderError, TaskState, TaskStatus};
pub use rate_limit::{
    RateLimitConfig, RateLimitError, RateLimitResult, RateLimiter, RedisRateLimiter,
};
