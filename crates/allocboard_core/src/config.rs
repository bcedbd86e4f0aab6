//! Product-level defaulting policy.
//!
//! # Responsibility
//! - Hold the soft defaults applied to operator input (capacity, email
//!   domain, skills, category, calendar span).
//! - Load overrides from a JSON document; absent fields keep defaults.
//!
//! # Invariants
//! - `default_weekly_capacity_hours` is always positive after loading.
//! - `email_domain` is non-empty and has no leading `@`.

use crate::model::developer::DEFAULT_WEEKLY_CAPACITY_HOURS;
use crate::model::project::ProjectCategory;
use serde::{Deserialize, Serialize};

const DEFAULT_EMAIL_DOMAIN: &str = "company.com";
const DEFAULT_SKILL: &str = "General";
const DEFAULT_CALENDAR_SPAN_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductDefaults {
    pub default_weekly_capacity_hours: u32,
    pub email_domain: String,
    pub default_skills: Vec<String>,
    pub default_category: ProjectCategory,
    /// Length of a calendar entry for projects with no end date.
    pub calendar_span_days: u32,
}

impl Default for ProductDefaults {
    fn default() -> Self {
        Self {
            default_weekly_capacity_hours: DEFAULT_WEEKLY_CAPACITY_HOURS,
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            default_skills: vec![DEFAULT_SKILL.to_string()],
            default_category: ProjectCategory::Web,
            calendar_span_days: DEFAULT_CALENDAR_SPAN_DAYS,
        }
    }
}

impl ProductDefaults {
    /// Parses overrides from JSON and validates the result.
    ///
    /// # Errors
    /// - Returns an error string for malformed JSON or unknown fields.
    /// - Returns an error string when capacity is zero or the domain is blank.
    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        let mut defaults: Self =
            serde_json::from_str(raw).map_err(|err| format!("invalid defaults document: {err}"))?;
        defaults.email_domain = defaults.email_domain.trim().trim_start_matches('@').to_string();
        defaults.validate()?;
        Ok(defaults)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.default_weekly_capacity_hours == 0 {
            return Err("default_weekly_capacity_hours must be greater than 0".to_string());
        }
        if self.email_domain.trim().is_empty() {
            return Err("email_domain must not be empty".to_string());
        }
        Ok(())
    }

    /// Calendar span in milliseconds.
    pub fn calendar_span_ms(&self) -> i64 {
        i64::from(self.calendar_span_days) * 24 * 60 * 60 * 1000
    }
}
