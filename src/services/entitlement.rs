// Entitlement ledger: affordability, reservation and refund
// Single implementation shared by every generation call site

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::DieselPool;
use crate::models::entitlement::{
    ChargeSource, Entitlement, EntitlementRow, Plan, QualityTier, ReservationPlan,
};
use crate::schema::entitlements;

/// Attempts before a reservation gives up on a contended row
const MAX_RESERVE_ATTEMPTS: usize = 3;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Why a user cannot afford a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("You have used all of your free generations. Upgrade or buy credits to continue.")]
    TrialExhausted,

    #[error("This generation needs {required} credits but you have {available}. Buy more credits to continue.")]
    InsufficientCredits { required: i32, available: i32 },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Denied(#[from] Denial),

    #[error("No entitlement record for user {0}")]
    NotFound(Uuid),

    #[error("Entitlement record is contended, retry later")]
    Contended,

    #[error("Entitlement store error: {0}")]
    Store(String),
}

impl From<diesel::result::Error> for LedgerError {
    fn from(error: diesel::result::Error) -> Self {
        LedgerError::Store(error.to_string())
    }
}

// =============================================================================
// AFFORDABILITY
// =============================================================================

/// Pick the balance a generation at `tier` will be charged to.
///
/// Trial accounts spend the tier's trial bucket first and only then fall back
/// to purchased credits. Paid plans only ever spend credits.
pub fn resolve_affordability(
    entitlement: &Entitlement,
    tier: QualityTier,
) -> Result<ReservationPlan, Denial> {
    let cost = tier.credit_cost();

    if entitlement.plan == Plan::Trial {
        let trial_source = ChargeSource::trial_for(tier);
        if entitlement.balance(trial_source) > 0 {
            return Ok(ReservationPlan {
                user_id: entitlement.user_id,
                tier,
                source: trial_source,
                amount: 1,
            });
        }
    }

    if entitlement.credits_remaining >= cost {
        return Ok(ReservationPlan {
            user_id: entitlement.user_id,
            tier,
            source: ChargeSource::Credits,
            amount: cost,
        });
    }

    // Trial users who never bought credits are told to upgrade, everyone else to top up
    if entitlement.plan == Plan::Trial && entitlement.credits_remaining == 0 {
        Err(Denial::TrialExhausted)
    } else {
        Err(Denial::InsufficientCredits {
            required: cost,
            available: entitlement.credits_remaining,
        })
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Persistent per-user entitlement balances
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Current balances. Not `load`, which diesel's `RunQueryDsl` would shadow.
    async fn fetch(&self, user_id: Uuid) -> Result<Entitlement, LedgerError>;

    /// Subtract `amount` from `source` only if the balance covers it.
    /// Returns `false` when no row was changed.
    async fn decrement_if_available(
        &self,
        user_id: Uuid,
        source: ChargeSource,
        amount: i32,
    ) -> Result<bool, LedgerError>;

    async fn increment(
        &self,
        user_id: Uuid,
        source: ChargeSource,
        amount: i32,
    ) -> Result<(), LedgerError>;
}

/// PostgreSQL-backed entitlement store
pub struct DieselEntitlementStore {
    pool: DieselPool,
}

impl DieselEntitlementStore {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementStore for DieselEntitlementStore {
    async fn fetch(&self, user_id: Uuid) -> Result<Entitlement, LedgerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        let row = entitlements::table
            .find(user_id)
            .select(EntitlementRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .ok_or(LedgerError::NotFound(user_id))?;

        Entitlement::try_from(row).map_err(LedgerError::Store)
    }

    async fn decrement_if_available(
        &self,
        user_id: Uuid,
        source: ChargeSource,
        amount: i32,
    ) -> Result<bool, LedgerError> {
        use entitlements::dsl;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        let row = dsl::entitlements.filter(dsl::user_id.eq(user_id));
        let now = Utc::now();

        // Single conditional UPDATE so concurrent reservations can never overdraw
        let updated = match source {
            ChargeSource::TrialStandard => {
                diesel::update(row.filter(dsl::trial_standard_remaining.ge(amount)))
                    .set((
                        dsl::trial_standard_remaining.eq(dsl::trial_standard_remaining - amount),
                        dsl::updated_at.eq(now),
                    ))
                    .execute(&mut conn)
                    .await?
            },
            ChargeSource::TrialPro => {
                diesel::update(row.filter(dsl::trial_pro_remaining.ge(amount)))
                    .set((
                        dsl::trial_pro_remaining.eq(dsl::trial_pro_remaining - amount),
                        dsl::updated_at.eq(now),
                    ))
                    .execute(&mut conn)
                    .await?
            },
            ChargeSource::Credits => {
                diesel::update(row.filter(dsl::credits_remaining.ge(amount)))
                    .set((
                        dsl::credits_remaining.eq(dsl::credits_remaining - amount),
                        dsl::updated_at.eq(now),
                    ))
                    .execute(&mut conn)
                    .await?
            },
        };

        Ok(updated == 1)
    }

    async fn increment(
        &self,
        user_id: Uuid,
        source: ChargeSource,
        amount: i32,
    ) -> Result<(), LedgerError> {
        use entitlements::dsl;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        let row = dsl::entitlements.filter(dsl::user_id.eq(user_id));
        let now = Utc::now();

        let updated = match source {
            ChargeSource::TrialStandard => {
                diesel::update(row)
                    .set((
                        dsl::trial_standard_remaining.eq(dsl::trial_standard_remaining + amount),
                        dsl::updated_at.eq(now),
                    ))
                    .execute(&mut conn)
                    .await?
            },
            ChargeSource::TrialPro => {
                diesel::update(row)
                    .set((
                        dsl::trial_pro_remaining.eq(dsl::trial_pro_remaining + amount),
                        dsl::updated_at.eq(now),
                    ))
                    .execute(&mut conn)
                    .await?
            },
            ChargeSource::Credits => {
                diesel::update(row)
                    .set((
                        dsl::credits_remaining.eq(dsl::credits_remaining + amount),
                        dsl::updated_at.eq(now),
                    ))
                    .execute(&mut conn)
                    .await?
            },
        };

        if updated == 0 {
            return Err(LedgerError::NotFound(user_id));
        }
        Ok(())
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// Reserve/refund accessor over an [`EntitlementStore`]
#[derive(Clone)]
pub struct EntitlementLedger {
    store: Arc<dyn EntitlementStore>,
}

impl EntitlementLedger {
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self { store }
    }

    pub async fn entitlement(&self, user_id: Uuid) -> Result<Entitlement, LedgerError> {
        self.store.fetch(user_id).await
    }

    /// Resolve and atomically take the charge for one generation.
    ///
    /// A lost conditional update means another request spent the balance in
    /// between, so the plan is resolved again from fresh balances.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        user_id: Uuid,
        tier: QualityTier,
    ) -> Result<ReservationPlan, LedgerError> {
        for attempt in 1..=MAX_RESERVE_ATTEMPTS {
            let entitlement = self.store.fetch(user_id).await?;
            let plan = resolve_affordability(&entitlement, tier)?;

            if self
                .store
                .decrement_if_available(user_id, plan.source, plan.amount)
                .await?
            {
                info!(
                    "Reserved {} from {:?} for user {} ({} tier)",
                    plan.amount, plan.source, user_id, tier
                );
                return Ok(plan);
            }

            warn!(
                "Reservation race lost for user {} on {:?} (attempt {}/{})",
                user_id, plan.source, attempt, MAX_RESERVE_ATTEMPTS
            );
        }

        Err(LedgerError::Contended)
    }

    /// Give back exactly what `reserve` took
    #[instrument(skip(self))]
    pub async fn refund(&self, plan: &ReservationPlan) -> Result<(), LedgerError> {
        self.store
            .increment(plan.user_id, plan.source, plan.amount)
            .await?;

        info!(
            "Refunded {} to {:?} for user {}",
            plan.amount, plan.source, plan.user_id
        );
        Ok(())
    }
}
