// Entitlement ledger model
// One row per user: plan plus trial and credit balances

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::entitlements;

/// Credits consumed by a standard-tier generation
pub const STANDARD_CREDIT_COST: i32 = 1;

/// Credits consumed by a pro-tier generation
pub const PRO_CREDIT_COST: i32 = 4;

/// Account plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Trial,
    Starter,
    Pro,
    Creator,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Trial => "trial",
            Plan::Starter => "starter",
            Plan::Pro => "pro",
            Plan::Creator => "creator",
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(Plan::Trial),
            "starter" => Ok(Plan::Starter),
            "pro" => Ok(Plan::Pro),
            "creator" => Ok(Plan::Creator),
            _ => Err(format!("Invalid plan: {}", s)),
        }
    }
}

/// Quality tier selects both the provider endpoint and the credit cost
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    #[default]
    Standard,
    Pro,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Standard => "standard",
            QualityTier::Pro => "pro",
        }
    }

    pub fn credit_cost(&self) -> i32 {
        match self {
            QualityTier::Standard => STANDARD_CREDIT_COST,
            QualityTier::Pro => PRO_CREDIT_COST,
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's entitlement balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub user_id: Uuid,
    pub plan: Plan,
    pub trial_standard_remaining: i32,
    pub trial_pro_remaining: i32,
    pub credits_remaining: i32,
}

impl Entitlement {
    /// Current value of the balance a charge source draws from
    pub fn balance(&self, source: ChargeSource) -> i32 {
        match source {
            ChargeSource::TrialStandard => self.trial_standard_remaining,
            ChargeSource::TrialPro => self.trial_pro_remaining,
            ChargeSource::Credits => self.credits_remaining,
        }
    }
}

/// Which balance a reservation was drawn from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChargeSource {
    TrialStandard,
    TrialPro,
    Credits,
}

impl ChargeSource {
    /// Trial allowance bucket for a tier
    pub fn trial_for(tier: QualityTier) -> Self {
        match tier {
            QualityTier::Standard => ChargeSource::TrialStandard,
            QualityTier::Pro => ChargeSource::TrialPro,
        }
    }

    pub fn is_trial(&self) -> bool {
        !matches!(self, ChargeSource::Credits)
    }
}

/// The exact charge selected for one generation attempt.
///
/// Refunds replay this value verbatim, never a freshly resolved one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReservationPlan {
    pub user_id: Uuid,
    pub tier: QualityTier,
    pub source: ChargeSource,
    pub amount: i32,
}

impl ReservationPlan {
    /// Credits billed to the user by this reservation (zero when a trial bucket paid)
    pub fn credit_cost(&self) -> i32 {
        if self.source.is_trial() {
            0
        } else {
            self.amount
        }
    }
}

/// Database row for the entitlements table
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = entitlements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EntitlementRow {
    pub user_id: Uuid,
    pub plan: String,
    pub trial_standard_remaining: i32,
    pub trial_pro_remaining: i32,
    pub credits_remaining: i32,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = String;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        Ok(Entitlement {
            user_id: row.user_id,
            plan: row.plan.parse()?,
            trial_standard_remaining: row.trial_standard_remaining,
            trial_pro_remaining: row.trial_pro_remaining,
            credits_remaining: row.credits_remaining,
        })
    }
}
