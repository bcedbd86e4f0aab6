//! Developer use-case service.
//!
//! # Responsibility
//! - Turn operator input into valid developer records.
//! - Apply product defaults (email domain, skills, capacity).
//!
//! # Invariants
//! - Names are trimmed and never blank.
//! - Derived emails are lowercase with whitespace runs collapsed to `.`.
//! - Capacity input never fails: unusable text falls back to the default.

use crate::config::ProductDefaults;
use crate::engine::capacity::MissingEntity;
use crate::model::developer::{Developer, DeveloperId};
use crate::model::ValidationError;
use crate::repo::developer_repo::DeveloperRepository;
use crate::repo::RepoError;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Service error for developer use-cases.
#[derive(Debug)]
pub enum DeveloperServiceError {
    /// Name is empty after trimming.
    BlankName,
    DeveloperNotFound(DeveloperId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for DeveloperServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "developer name must not be blank"),
            Self::DeveloperNotFound(id) => write!(f, "developer not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DeveloperServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DeveloperServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(MissingEntity::Developer(id)) => Self::DeveloperNotFound(id),
            RepoError::Validation(ValidationError::BlankName) => Self::BlankName,
            other => Self::Repo(other),
        }
    }
}

/// Operator input for creating a developer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeveloperInput {
    pub name: String,
    /// Explicit email; derived from the name when absent.
    pub email: Option<String>,
    /// Empty means "use the default skills".
    pub skills: Vec<String>,
    /// Raw capacity text as typed by the operator.
    pub capacity: Option<String>,
    pub is_available: Option<bool>,
}

/// Partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeveloperPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub skills: Option<Vec<String>>,
    pub capacity: Option<String>,
    pub is_available: Option<bool>,
}

/// Developer service facade over repository implementations.
pub struct DeveloperService<R: DeveloperRepository> {
    repo: R,
    defaults: ProductDefaults,
}

impl<R: DeveloperRepository> DeveloperService<R> {
    pub fn new(repo: R, defaults: ProductDefaults) -> Self {
        Self { repo, defaults }
    }

    pub fn create_developer(
        &self,
        input: DeveloperInput,
    ) -> Result<Developer, DeveloperServiceError> {
        let name = normalize_name(&input.name)?;
        let email = match input.email {
            Some(email) if !email.trim().is_empty() => email.trim().to_string(),
            _ => derive_email(&name, &self.defaults.email_domain),
        };

        let mut developer = Developer::new(name, email);
        developer.skills = self.normalize_skills(input.skills);
        developer.weekly_capacity_hours = Some(parse_capacity_input(
            input.capacity.as_deref(),
            self.defaults.default_weekly_capacity_hours,
        ));
        developer.is_available = input.is_available.unwrap_or(true);

        self.repo.create_developer(&developer)?;
        info!("event=developer_create module=service status=ok");
        Ok(developer)
    }

    /// Applies a patch. A capacity change recomputes allocation percentages.
    pub fn update_developer(
        &self,
        id: DeveloperId,
        patch: DeveloperPatch,
    ) -> Result<Developer, DeveloperServiceError> {
        let mut developer = self.get_developer(id)?;

        if let Some(name) = patch.name {
            developer.name = normalize_name(&name)?;
        }
        if let Some(email) = patch.email {
            let email = email.trim();
            developer.email = if email.is_empty() {
                derive_email(&developer.name, &self.defaults.email_domain)
            } else {
                email.to_string()
            };
        }
        if let Some(skills) = patch.skills {
            developer.skills = self.normalize_skills(skills);
        }
        if let Some(capacity) = patch.capacity {
            developer.weekly_capacity_hours = Some(parse_capacity_input(
                Some(capacity.as_str()),
                self.defaults.default_weekly_capacity_hours,
            ));
        }
        if let Some(is_available) = patch.is_available {
            developer.is_available = is_available;
        }

        self.repo.update_developer(&developer)?;
        info!("event=developer_update module=service status=ok");
        Ok(developer)
    }

    pub fn set_availability(
        &self,
        id: DeveloperId,
        is_available: bool,
    ) -> Result<Developer, DeveloperServiceError> {
        self.update_developer(
            id,
            DeveloperPatch {
                is_available: Some(is_available),
                ..DeveloperPatch::default()
            },
        )
    }

    pub fn get_developer(&self, id: DeveloperId) -> Result<Developer, DeveloperServiceError> {
        self.repo
            .get_developer(id, false)?
            .ok_or(DeveloperServiceError::DeveloperNotFound(id))
    }

    pub fn list_developers(&self) -> Result<Vec<Developer>, DeveloperServiceError> {
        Ok(self.repo.list_developers(false)?)
    }

    /// Tombstones the developer; their allocations become orphaned.
    pub fn delete_developer(&self, id: DeveloperId) -> Result<(), DeveloperServiceError> {
        self.repo.soft_delete_developer(id)?;
        info!("event=developer_delete module=service status=ok");
        Ok(())
    }

    fn normalize_skills(&self, skills: Vec<String>) -> Vec<String> {
        let mut normalized: Vec<String> = Vec::new();
        for skill in skills {
            let skill = skill.trim();
            if !skill.is_empty() && !normalized.iter().any(|existing| existing == skill) {
                normalized.push(skill.to_string());
            }
        }
        if normalized.is_empty() {
            return self.defaults.default_skills.clone();
        }
        normalized
    }
}

fn normalize_name(raw: &str) -> Result<String, DeveloperServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DeveloperServiceError::BlankName);
    }
    Ok(name.to_string())
}

/// Builds `first.last@domain` from a display name.
pub fn derive_email(name: &str, domain: &str) -> String {
    let local = WHITESPACE_RE
        .replace_all(name.trim(), ".")
        .to_lowercase();
    format!("{local}@{}", domain.trim().trim_start_matches('@'))
}

/// Parses operator capacity text. Missing, non-numeric or non-positive
/// input yields `default_hours`.
pub fn parse_capacity_input(raw: Option<&str>, default_hours: u32) -> u32 {
    raw.map(str::trim)
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|hours| *hours > 0)
        .and_then(|hours| u32::try_from(hours).ok())
        .unwrap_or(default_hours)
}

#[cfg(test)]
mod tests {
    use super::{derive_email, parse_capacity_input};

    #[test]
    fn derive_email_collapses_whitespace_and_lowercases() {
        assert_eq!(derive_email("Ada  Lovelace", "company.com"), "ada.lovelace@company.com");
        assert_eq!(derive_email(" Grace\tB Hopper ", "@lab.io"), "grace.b.hopper@lab.io");
    }

    #[test]
    fn capacity_input_falls_back_to_default() {
        assert_eq!(parse_capacity_input(Some("32"), 40), 32);
        assert_eq!(parse_capacity_input(Some(" 20 "), 40), 20);
        assert_eq!(parse_capacity_input(Some("abc"), 40), 40);
        assert_eq!(parse_capacity_input(Some("0"), 40), 40);
        assert_eq!(parse_capacity_input(Some("-5"), 40), 40);
        assert_eq!(parse_capacity_input(None, 40), 40);
    }
}
