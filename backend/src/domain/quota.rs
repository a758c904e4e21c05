//! Token quota: balances, refill policy and model tier pricing.
//!
//! Refill is lazy. Whenever a balance is read or spent, a single flat grant is
//! applied if at least one refill period has elapsed since the last grant.
//! Being several periods overdue still yields exactly one grant.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens granted at signup.
pub const DEFAULT_INITIAL_TOKENS: u32 = 16;
/// Tokens granted per refill.
pub const DEFAULT_REFILL_AMOUNT: u32 = 16;
/// Hours between refills.
pub const DEFAULT_REFILL_PERIOD_HOURS: i64 = 24;
/// Cost of a generation on the fast tier.
pub const DEFAULT_FAST_COST: u32 = 2;
/// Cost of a generation on the quality tier.
pub const DEFAULT_QUALITY_COST: u32 = 4;

/// Model tier requested for a generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Cheaper, lower latency model.
    #[default]
    Fast,
    /// Slower, higher quality model.
    Quality,
}

impl ModelTier {
    /// Wire name of the tier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Quality => "quality",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for unknown tier names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown model tier '{0}'; expected fast or quality")]
pub struct UnknownModelTier(pub String);

impl FromStr for ModelTier {
    type Err = UnknownModelTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "quality" => Ok(Self::Quality),
            _ => Err(UnknownModelTier(s.to_owned())),
        }
    }
}

/// A user's balance together with the time of the last refill grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalance {
    tokens: u32,
    last_refill: DateTime<Utc>,
}

impl TokenBalance {
    #[must_use]
    pub fn new(tokens: u32, last_refill: DateTime<Utc>) -> Self {
        Self {
            tokens,
            last_refill,
        }
    }

    #[must_use]
    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    #[must_use]
    pub fn last_refill(&self) -> DateTime<Utc> {
        self.last_refill
    }

    /// Apply at most one refill grant.
    ///
    /// # Examples
    /// ```
    /// use chrono::{Duration, TimeZone, Utc};
    /// use siteulation::domain::{TokenBalance, TokenPolicy};
    ///
    /// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    /// let balance = TokenBalance::new(3, start);
    /// let later = start + Duration::hours(72);
    /// let refilled = balance.refilled(&TokenPolicy::default(), later);
    /// assert_eq!(refilled.tokens(), 19);
    /// assert_eq!(refilled.last_refill(), later);
    /// ```
    #[must_use]
    pub fn refilled(self, policy: &TokenPolicy, now: DateTime<Utc>) -> Self {
        if policy.is_refill_due(self.last_refill, now) {
            Self {
                tokens: self.tokens.saturating_add(policy.refill_amount()),
                last_refill: now,
            }
        } else {
            self
        }
    }

    /// Spend `amount` tokens, or `None` if the balance is too low.
    #[must_use]
    pub fn debited(self, amount: u32) -> Option<Self> {
        self.tokens.checked_sub(amount).map(|tokens| Self {
            tokens,
            last_refill: self.last_refill,
        })
    }
}

/// Quota rules shared by the identity and generation services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    initial_tokens: u32,
    refill_amount: u32,
    refill_period: Duration,
    fast_cost: u32,
    quality_cost: u32,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            initial_tokens: DEFAULT_INITIAL_TOKENS,
            refill_amount: DEFAULT_REFILL_AMOUNT,
            refill_period: Duration::hours(DEFAULT_REFILL_PERIOD_HOURS),
            fast_cost: DEFAULT_FAST_COST,
            quality_cost: DEFAULT_QUALITY_COST,
        }
    }
}

impl TokenPolicy {
    /// Override the signup grant.
    #[must_use]
    pub fn with_initial_tokens(mut self, tokens: u32) -> Self {
        self.initial_tokens = tokens;
        self
    }

    /// Override the refill grant and period.
    #[must_use]
    pub fn with_refill(mut self, amount: u32, period: Duration) -> Self {
        self.refill_amount = amount;
        self.refill_period = period;
        self
    }

    /// Override per-tier generation costs.
    #[must_use]
    pub fn with_costs(mut self, fast: u32, quality: u32) -> Self {
        self.fast_cost = fast;
        self.quality_cost = quality;
        self
    }

    #[must_use]
    pub fn initial_tokens(&self) -> u32 {
        self.initial_tokens
    }

    #[must_use]
    pub fn refill_amount(&self) -> u32 {
        self.refill_amount
    }

    #[must_use]
    pub fn refill_period(&self) -> Duration {
        self.refill_period
    }

    /// Tokens charged for one generation on `tier`.
    #[must_use]
    pub fn cost(&self, tier: ModelTier) -> u32 {
        match tier {
            ModelTier::Fast => self.fast_cost,
            ModelTier::Quality => self.quality_cost,
        }
    }

    /// Latest `last_refill` that still makes a grant due at `now`.
    #[must_use]
    pub fn refill_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.refill_period
    }

    /// Whether a grant is due for a balance last refilled at `last_refill`.
    #[must_use]
    pub fn is_refill_due(&self, last_refill: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        last_refill <= self.refill_cutoff(now)
    }
}
