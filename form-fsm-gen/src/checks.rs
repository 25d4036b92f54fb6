//! Construction-time checks of a [`FormConfig`].
//!
//! Everything here runs before any state or table is built, so a bad
//! description never yields a partially generated machine.

use std::collections::{HashMap, HashSet};

use form_fsm_core::ident::ASYNC_ERRORS_KEY;
use form_fsm_core::{ActionId, EventType, GuardId, Phase};

use crate::config::{FieldConfig, FormConfig, SubmitPolicy};
use crate::error::ConfigError;

/// Runs every check, stopping at the first violation.
pub fn check(config: &FormConfig) -> Result<(), ConfigError> {
    let fields = config.field_configs();
    if fields.is_empty() {
        return Err(ConfigError::NoFields(config.form_name().to_string()));
    }

    let mut seen = HashSet::new();
    for (index, field) in fields.iter().enumerate() {
        check_field_name(field, index)?;
        if !seen.insert(field.name()) {
            return Err(ConfigError::DuplicateField(field.name().to_string()));
        }
        check_validations(field)?;
    }

    check_collisions(config)?;

    if config.submit_service().is_none() {
        return Err(ConfigError::MissingSubmit(config.form_name().to_string()));
    }
    Ok(())
}

/// Field names become context keys and state keys.
pub(crate) fn check_field_name(field: &FieldConfig, index: usize) -> Result<(), ConfigError> {
    let name = field.name();
    if name.is_empty() {
        return Err(ConfigError::MissingFieldName { index });
    }
    if !is_identifier(name) {
        return Err(ConfigError::InvalidName {
            name: name.to_string(),
        });
    }
    if name == ASYNC_ERRORS_KEY {
        return Err(ConfigError::ReservedName(name.to_string()));
    }
    Ok(())
}

fn check_validations(field: &FieldConfig) -> Result<(), ConfigError> {
    for phase in Phase::ALL {
        let mut seen = HashSet::new();
        for (index, rule) in field.validations(phase).iter().enumerate() {
            if rule.name().is_empty() {
                return Err(ConfigError::MissingValidationName {
                    field: field.name().to_string(),
                    phase,
                    index,
                });
            }
            if !is_identifier(rule.name()) {
                return Err(ConfigError::InvalidName {
                    name: rule.name().to_string(),
                });
            }
            if !seen.insert(rule.name()) {
                return Err(ConfigError::DuplicateValidation {
                    field: field.name().to_string(),
                    phase,
                    validation: rule.name().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Distinct typed ids must never render to the same name inside one
/// namespace, otherwise a string-keyed runtime would silently merge them.
fn check_collisions(config: &FormConfig) -> Result<(), ConfigError> {
    let mut actions = Namespace::new("action");
    let mut guards = Namespace::new("guard");
    let mut events = Namespace::new("event");

    events.claim(EventType::Submit.name(), "SUBMIT")?;
    actions.claim(ActionId::SetAsyncErrors.name(), "the async-error action")?;
    if config.policy() == SubmitPolicy::BlockOnFieldErrors {
        guards.claim(GuardId::SubmitAllowed.name(), "the submit gate")?;
    }

    for field in config.field_configs() {
        let name = field.name().to_string();
        let owner = format!("field `{name}`");

        events.claim(EventType::set(name.clone()).name(), &owner)?;
        actions.claim(ActionId::SetValue { field: name.clone() }.name(), &owner)?;
        actions.claim(ActionId::ClearError { field: name.clone() }.name(), &owner)?;
        actions.claim(ActionId::SetAsyncError { field: name.clone() }.name(), &owner)?;
        guards.claim(GuardId::HasAsyncError { field: name.clone() }.name(), &owner)?;

        for phase in Phase::ALL {
            for rule in field.validations(phase) {
                let owner = format!("validation `{}` of field `{name}` ({phase})", rule.name());
                let validation = rule.name().to_string();
                actions.claim(
                    ActionId::SetValidationError {
                        field: name.clone(),
                        phase,
                        validation: validation.clone(),
                    }
                    .name(),
                    &owner,
                )?;
                guards.claim(
                    GuardId::Validation {
                        field: name.clone(),
                        phase,
                        validation,
                    }
                    .name(),
                    &owner,
                )?;
            }
        }
    }
    Ok(())
}

struct Namespace {
    kind: &'static str,
    owners: HashMap<String, String>,
}

impl Namespace {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            owners: HashMap::new(),
        }
    }

    fn claim(&mut self, name: String, owner: &str) -> Result<(), ConfigError> {
        if let Some(first) = self.owners.get(&name) {
            return Err(ConfigError::NameCollision {
                kind: self.kind,
                name,
                first: first.clone(),
                second: owner.to_string(),
            });
        }
        self.owners.insert(name, owner.to_string());
        Ok(())
    }
}

/// An ASCII letter followed by ASCII letters, digits or `_`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
