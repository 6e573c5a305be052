pub mod auth;
pub mod entitlement;
pub mod generation;
pub mod shoot;

// Re-export common types
pub use auth::*;
pub use entitlement::{
    ChargeSource, Entitlement, EntitlementRow, Plan, QualityTier, ReservationPlan,
    PRO_CREDIT_COST, STANDARD_CREDIT_COST,
};
pub use generation::{
    GenerationRecord, GenerationRequest, GenerationResponse, GenerationRow, GenerationStatus,
    GenerationStatusResponse, JewelryGenerationRequest, ModelGenerationRequest, ReferenceImage,
    ResponseStatus, StatusQuery, TemplateGenerationRequest, MAX_REFERENCE_IMAGES,
};
pub use shoot::{JewelryShootConfig, ModelShootConfig, TemplateShootConfig};
