// Generation orchestrator
// validate -> ownership -> rate limit -> reserve -> stage -> submit -> poll -> reconcile

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::app_config::AppConfig;
use crate::models::entitlement::{QualityTier, ReservationPlan};
use crate::models::generation::{
    GenerationRecord, GenerationRequest, GenerationResponse, GenerationStatus,
    GenerationStatusResponse, MAX_REFERENCE_IMAGES,
};
use crate::services::entitlement::{EntitlementLedger, EntitlementStore};
use crate::services::generation_store::GenerationStore;
use crate::services::image_stager::ImageStager;
use crate::services::job_poller::{JobPoller, PollOutcome};
use crate::services::job_submitter::{AspectRatio, JobSpec, JobSubmitter};
use crate::services::object_storage::ObjectStorage;
use crate::services::prompt::ShootPrompt;
use crate::services::provider::ImageProvider;
use crate::services::rate_limit::RateLimiter;
use crate::utils::service_error::GenerationError;

const MAX_TASK_ID_LEN: usize = 128;

// =============================================================================
// CALL SITES & POLICY
// =============================================================================

/// The three generation entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite {
    Model,
    JewelryPreset,
    Template,
}

impl CallSite {
    /// Rate-limit counter name
    pub fn endpoint(&self) -> &'static str {
        match self {
            CallSite::Model => "generate-model",
            CallSite::JewelryPreset => "generate-jewelry",
            CallSite::Template => "generate-template",
        }
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        match self {
            CallSite::JewelryPreset => AspectRatio::Square,
            CallSite::Model | CallSite::Template => AspectRatio::Portrait,
        }
    }

    /// Model shots are try-ons and need at least one garment
    pub fn requires_reference_image(&self) -> bool {
        matches!(self, CallSite::Model)
    }
}

/// Tunables for one orchestrator instance
#[derive(Debug, Clone)]
pub struct GenerationPolicy {
    pub poll_interval: Duration,
    pub standard_poll_budget: Duration,
    pub pro_poll_budget: Duration,
    pub max_prompt_chars: usize,
    pub max_image_bytes: usize,
    pub signed_url_ttl: Duration,
    pub standard_model: String,
    pub pro_model: String,
    pub rate_limiting_enabled: bool,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            standard_poll_budget: Duration::from_secs(90),
            pro_poll_budget: Duration::from_secs(25),
            max_prompt_chars: 5000,
            max_image_bytes: 10 * 1024 * 1024,
            signed_url_ttl: Duration::from_secs(3600),
            standard_model: "google/nano-banana-edit".to_string(),
            pro_model: "nano-banana-pro".to_string(),
            rate_limiting_enabled: true,
        }
    }
}

impl GenerationPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        let generation = &config.generation;
        Self {
            poll_interval: generation.poll_interval(),
            standard_poll_budget: Duration::from_secs(generation.standard_poll_budget_secs),
            pro_poll_budget: Duration::from_secs(generation.pro_poll_budget_secs),
            max_prompt_chars: generation.max_prompt_chars,
            max_image_bytes: generation.max_image_bytes,
            signed_url_ttl: Duration::from_secs(config.storage.signed_url_ttl_secs),
            standard_model: config.provider.standard_model.clone(),
            pro_model: config.provider.pro_model.clone(),
            rate_limiting_enabled: config.features.enable_rate_limiting,
        }
    }

    pub fn poll_budget(&self, tier: QualityTier) -> Duration {
        match tier {
            QualityTier::Standard => self.standard_poll_budget,
            QualityTier::Pro => self.pro_poll_budget,
        }
    }
}

/// External collaborators, constructed once at startup
#[derive(Clone)]
pub struct Collaborators {
    pub entitlements: Arc<dyn EntitlementStore>,
    pub generations: Arc<dyn GenerationStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub provider: Arc<dyn ImageProvider>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

pub struct GenerationOrchestrator {
    ledger: EntitlementLedger,
    generations: Arc<dyn GenerationStore>,
    stager: ImageStager,
    submitter: JobSubmitter,
    poller: JobPoller,
    rate_limiter: Arc<dyn RateLimiter>,
    policy: GenerationPolicy,
}

impl GenerationOrchestrator {
    pub fn new(collaborators: Collaborators, policy: GenerationPolicy) -> Self {
        let Collaborators {
            entitlements,
            generations,
            storage,
            provider,
            rate_limiter,
        } = collaborators;

        Self {
            ledger: EntitlementLedger::new(entitlements),
            generations,
            stager: ImageStager::new(storage, policy.signed_url_ttl, policy.max_image_bytes),
            submitter: JobSubmitter::new(
                provider.clone(),
                policy.standard_model.clone(),
                policy.pro_model.clone(),
                policy.max_prompt_chars,
            ),
            poller: JobPoller::new(provider, policy.poll_interval),
            rate_limiter,
            policy,
        }
    }

    pub fn policy(&self) -> &GenerationPolicy {
        &self.policy
    }

    /// Run a generation on its own task so a dropped client connection
    /// cannot interrupt reconciliation
    pub async fn run_detached<C: ShootPrompt>(
        self: Arc<Self>,
        user_id: Uuid,
        request: GenerationRequest<C>,
    ) -> Result<GenerationResponse, GenerationError> {
        tokio::spawn(async move { self.run(user_id, request).await })
            .await
            .map_err(|e| GenerationError::Internal(format!("Generation task aborted: {}", e)))?
    }

    /// One complete generation for an authenticated user
    #[instrument(skip(self, request), fields(call_site = C::CALL_SITE.endpoint(), tier = %request.quality_tier))]
    pub async fn run<C: ShootPrompt>(
        &self,
        user_id: Uuid,
        request: GenerationRequest<C>,
    ) -> Result<GenerationResponse, GenerationError> {
        let call_site = C::CALL_SITE;

        // Validating
        let generation_id = parse_generation_id(&request.target_id)?;
        request.config.validate()?;
        validate_reference_count(call_site, request.reference_images.len())?;

        // Ownership
        let record = self.owned_record(user_id, generation_id).await?;
        if record.status.is_terminal() {
            return Err(GenerationError::ValidationFailed(format!(
                "Generation is already {}",
                record.status.as_str()
            )));
        }

        // Rate limiting
        let slot = self.acquire_rate_limit(user_id, call_site).await?;

        let result = self
            .execute(user_id, generation_id, call_site, request)
            .await;

        // Only successful requests count against the window
        if result.is_err() {
            if let Some(slot) = slot {
                if let Err(e) = self
                    .rate_limiter
                    .release(user_id, call_site.endpoint(), &slot)
                    .await
                {
                    warn!("Failed to release rate limit slot for user {}: {}", user_id, e);
                }
            }
        }

        result
    }

    /// Reserve through reconcile, once the request has been admitted
    async fn execute<C: ShootPrompt>(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
        call_site: CallSite,
        request: GenerationRequest<C>,
    ) -> Result<GenerationResponse, GenerationError> {
        let tier = request.quality_tier;

        // Reserving
        let plan = self.ledger.reserve(user_id, tier).await?;

        if let Err(e) = self
            .generations
            .set_status(generation_id, GenerationStatus::Processing, None)
            .await
        {
            return Err(self
                .abort(generation_id, &plan, GenerationError::from(e))
                .await);
        }

        // Staging
        let mut images = request.config.leading_images();
        images.extend(request.reference_images);

        let staged = self.stager.stage(generation_id, &images).await;
        if staged.is_empty() {
            return Err(self
                .abort(generation_id, &plan, GenerationError::StagingFailed)
                .await);
        }

        // Submitting
        let spec = JobSpec {
            prompt: request.config.prompt(),
            image_urls: staged.into_iter().map(|image| image.url).collect(),
            tier,
            aspect_ratio: call_site.aspect_ratio(),
        };

        let task_id = match self.submitter.submit(&spec).await {
            Ok(task_id) => task_id,
            Err(e) => {
                return Err(self
                    .abort(
                        generation_id,
                        &plan,
                        GenerationError::ProviderRejected(e.to_string()),
                    )
                    .await);
            },
        };

        if let Err(e) = self.generations.attach_task(generation_id, &task_id).await {
            error!(
                "Failed to bind task {} to generation {}: {}",
                task_id, generation_id, e
            );
        }

        // Polling
        match self
            .poller
            .wait(&task_id, self.policy.poll_budget(tier))
            .await
        {
            PollOutcome::Completed(image_url) => {
                self.complete(generation_id, &image_url).await;
                Ok(GenerationResponse::completed(image_url, tier, plan.credit_cost()))
            },
            PollOutcome::Failed(reason) => Err(self
                .abort(generation_id, &plan, GenerationError::ProviderFailed(reason))
                .await),
            PollOutcome::StillProcessing => {
                info!(
                    "Generation {} handed off as processing (task {})",
                    generation_id, task_id
                );
                Ok(GenerationResponse::processing(task_id, tier, plan.credit_cost()))
            },
        }
    }

    /// Check a job handed off as `processing` once, without waiting.
    ///
    /// Never re-submits, re-charges or refunds.
    #[instrument(skip(self))]
    pub async fn resume(
        &self,
        user_id: Uuid,
        generation_id: &str,
        task_id: &str,
    ) -> Result<GenerationStatusResponse, GenerationError> {
        let generation_id = parse_generation_id(generation_id)?;
        let task_id = task_id.trim();
        if task_id.is_empty() || task_id.len() > MAX_TASK_ID_LEN {
            return Err(GenerationError::ValidationFailed(
                "taskId is required".to_string(),
            ));
        }

        let record = self.owned_record(user_id, generation_id).await?;
        match record.status {
            GenerationStatus::Completed => {
                return record
                    .image_url
                    .map(GenerationStatusResponse::completed)
                    .ok_or_else(|| {
                        GenerationError::Internal(format!(
                            "Completed generation {} has no image",
                            generation_id
                        ))
                    });
            },
            GenerationStatus::Failed => {
                return Err(GenerationError::ProviderFailed(
                    "Generation failed".to_string(),
                ));
            },
            GenerationStatus::Pending => {
                return Err(GenerationError::ValidationFailed(
                    "Generation has not been started".to_string(),
                ));
            },
            GenerationStatus::Processing => {},
        }

        // Only the job this record was submitted as may settle it
        if record.task_id.as_deref() != Some(task_id) {
            warn!(
                "User {} resumed generation {} with an unknown task {}",
                user_id, generation_id, task_id
            );
            return Err(GenerationError::ValidationFailed(
                "taskId does not belong to this generation".to_string(),
            ));
        }

        match self.poller.check_once(task_id).await {
            Some(PollOutcome::Completed(image_url)) => {
                self.complete(generation_id, &image_url).await;
                Ok(GenerationStatusResponse::completed(image_url))
            },
            Some(PollOutcome::Failed(reason)) => {
                self.generations
                    .set_status(generation_id, GenerationStatus::Failed, None)
                    .await?;
                Err(GenerationError::ProviderFailed(reason))
            },
            Some(PollOutcome::StillProcessing) | None => {
                Ok(GenerationStatusResponse::processing(task_id.to_string()))
            },
        }
    }

    async fn owned_record(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
    ) -> Result<GenerationRecord, GenerationError> {
        let record = self.generations.find(generation_id).await?;

        // Foreign records look exactly like missing ones
        if record.owner_id != user_id {
            warn!(
                "User {} requested generation {} owned by someone else",
                user_id, generation_id
            );
            return Err(GenerationError::NotFound);
        }
        Ok(record)
    }

    /// Take a window slot for this request. `None` when limiting is off or
    /// the limiter is unreachable, in which case the request goes through.
    async fn acquire_rate_limit(
        &self,
        user_id: Uuid,
        call_site: CallSite,
    ) -> Result<Option<String>, GenerationError> {
        if !self.policy.rate_limiting_enabled {
            return Ok(None);
        }

        match self.rate_limiter.acquire(user_id, call_site.endpoint()).await {
            Ok(result) if !result.allowed => Err(GenerationError::RateLimited {
                retry_after_secs: result.retry_after.unwrap_or(1),
            }),
            Ok(result) => Ok(result.slot),
            Err(e) => {
                warn!(
                    "Rate limit check failed for user {}, allowing request: {}",
                    user_id, e
                );
                Ok(None)
            },
        }
    }

    /// Persist a finished generation. The image exists either way, so a
    /// failed write is logged rather than surfaced.
    async fn complete(&self, generation_id: Uuid, image_url: &str) {
        if let Err(e) = self
            .generations
            .set_status(generation_id, GenerationStatus::Completed, Some(image_url))
            .await
        {
            error!(
                "Failed to mark generation {} completed: {}",
                generation_id, e
            );
        }
    }

    /// Undo the reservation and mark the record failed, then hand back `cause`
    async fn abort(
        &self,
        generation_id: Uuid,
        plan: &ReservationPlan,
        cause: GenerationError,
    ) -> GenerationError {
        warn!("Generation {} failed: {}", generation_id, cause);

        if let Err(e) = self.ledger.refund(plan).await {
            error!(
                "Refund of {} to {:?} for user {} failed: {}",
                plan.amount, plan.source, plan.user_id, e
            );
        }

        if let Err(e) = self
            .generations
            .set_status(generation_id, GenerationStatus::Failed, None)
            .await
        {
            error!("Failed to mark generation {} failed: {}", generation_id, e);
        }

        cause
    }
}

fn parse_generation_id(raw: &str) -> Result<Uuid, GenerationError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| GenerationError::ValidationFailed("targetId must be a valid UUID".to_string()))
}

fn validate_reference_count(call_site: CallSite, count: usize) -> Result<(), GenerationError> {
    if call_site.requires_reference_image() && count == 0 {
        return Err(GenerationError::ValidationFailed(
            "At least one garment image is required".to_string(),
        ));
    }
    if count > MAX_REFERENCE_IMAGES {
        return Err(GenerationError::ValidationFailed(format!(
            "At most {} reference images are allowed",
            MAX_REFERENCE_IMAGES
        )));
    }
    Ok(())
}
