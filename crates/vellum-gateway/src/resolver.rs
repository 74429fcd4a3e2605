//! Path resolution from logical identifiers to store folders
//!
//! Resolution is pure: it validates both identifiers against a strict
//! charset, checks the category against the configured set, and builds the
//! canonical folder. Nothing here touches the store, so rejected input never
//! causes an external call.

use tracing::debug;

use vellum_core::{ArtifactFolder, ArtifactNames};

use crate::config::{ConfigError, GatewayConfig};
use crate::error::{Field, PathValidationError, ValidationReason};

/// Longest accepted identifier, in bytes
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Check one identifier against the allowed charset (`A-Z a-z 0-9 - _`)
///
/// Reports the most specific reason: traversal and separators are named as
/// such rather than as a disallowed character.
pub fn validate_identifier(field: Field, value: &str) -> Result<(), PathValidationError> {
    let reject = |reason| Err(PathValidationError::new(field, reason));

    if value.is_empty() {
        return reject(ValidationReason::Empty);
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return reject(ValidationReason::TooLong {
            len: value.len(),
            max: MAX_IDENTIFIER_LEN,
        });
    }
    if value.contains("..") {
        return reject(ValidationReason::ParentTraversal);
    }
    if value.contains(['/', '\\']) {
        return reject(ValidationReason::PathSeparator);
    }
    if let Some(c) = value.chars().find(|c| c.is_control()) {
        debug!(code = c as u32, "Rejected control character");
        return reject(ValidationReason::ControlCharacter);
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return reject(ValidationReason::DisallowedCharacter(c));
    }
    Ok(())
}

/// The configured set of selectable categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    categories: Vec<String>,
}

impl CategorySet {
    /// Build a set, validating every member with the identifier rules
    pub fn new<I, S>(categories: I) -> Result<Self, PathValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set: Vec<String> = Vec::new();
        for category in categories {
            let category = category.as_ref();
            validate_identifier(Field::Category, category)?;
            if set.iter().any(|c| c == category) {
                return Err(PathValidationError::new(
                    Field::Category,
                    ValidationReason::Duplicate,
                ));
            }
            set.push(category.to_string());
        }
        if set.is_empty() {
            return Err(PathValidationError::new(
                Field::Category,
                ValidationReason::Empty,
            ));
        }
        Ok(Self { categories: set })
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Categories in configured order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Maps `(category, participant)` to an [`ArtifactFolder`]
#[derive(Debug, Clone)]
pub struct PathResolver {
    categories: CategorySet,
    names: ArtifactNames,
}

impl PathResolver {
    pub fn new(categories: CategorySet, names: ArtifactNames) -> Self {
        Self { categories, names }
    }

    /// Build a resolver from validated configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let categories = CategorySet::new(&config.categories)
            .map_err(|e| ConfigError::invalid(format!("categories: {e}")))?;
        Ok(Self::new(categories, config.artifacts.clone()))
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn names(&self) -> &ArtifactNames {
        &self.names
    }

    /// Resolve a pair to its folder, or say which field is wrong
    pub fn resolve(
        &self,
        category: &str,
        participant_id: &str,
    ) -> Result<ArtifactFolder, PathValidationError> {
        validate_identifier(Field::Category, category)?;
        if !self.categories.contains(category) {
            return Err(PathValidationError::new(
                Field::Category,
                ValidationReason::UnknownCategory,
            ));
        }
        validate_identifier(Field::ParticipantId, participant_id)?;

        Ok(ArtifactFolder::new(
            category,
            participant_id,
            self.names.clone(),
        ))
    }
}
