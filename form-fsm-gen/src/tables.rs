//! Action and guard tables.
//!
//! Actions never touch the context: each returns a [`ContextPatch`] that
//! replaces the slice it owns, and the runtime applies it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use form_fsm_core::{ActionId, ContextPatch, Event, FormContext, GuardId, Phase};
use serde_json::Value;

use crate::config::{
    FieldConfig, FormConfig, Predicate, PrepareAsyncErrors, SubmitPolicy, SubmitService,
};
use crate::error::ConfigError;

/// A context-patch function.
pub type Action = Arc<dyn Fn(&FormContext, &Event) -> ContextPatch + Send + Sync>;

/// A guard predicate.
pub type Guard = Predicate;

/// Behaviour referenced by name from a [`MachineDescription`](crate::MachineDescription).
#[derive(Clone)]
pub struct MachineOptions {
    pub actions: BTreeMap<ActionId, Action>,
    pub guards: BTreeMap<GuardId, Guard>,
    pub submit: SubmitService,
}

impl MachineOptions {
    pub fn action(&self, id: &ActionId) -> Option<&Action> {
        self.actions.get(id)
    }

    pub fn guard(&self, id: &GuardId) -> Option<&Guard> {
        self.guards.get(id)
    }

    pub fn action_names(&self) -> Vec<String> {
        self.actions.keys().map(ActionId::name).collect()
    }

    pub fn guard_names(&self) -> Vec<String> {
        self.guards.keys().map(GuardId::name).collect()
    }
}

impl fmt::Debug for MachineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineOptions")
            .field("actions", &self.action_names())
            .field("guards", &self.guard_names())
            .finish_non_exhaustive()
    }
}

/// Builds both tables for every field of `config`.
///
/// Registering the same id twice is an error rather than a silent overwrite.
pub fn build_tables(
    config: &FormConfig,
    submit: SubmitService,
) -> Result<MachineOptions, ConfigError> {
    let mut tables = TableBuilder::default();

    for field in config.field_configs() {
        field_actions(&mut tables, field)?;
        field_guards(&mut tables, field)?;
    }

    tables.action(
        ActionId::SetAsyncErrors,
        set_async_errors(config.async_error_mapper().cloned()),
    )?;

    if config.policy() == SubmitPolicy::BlockOnFieldErrors {
        let submit_checks: Vec<Predicate> = config
            .field_configs()
            .iter()
            .flat_map(|field| field.validations(Phase::OnSubmit))
            .map(|rule| rule.predicate().clone())
            .collect();
        tables.guard(
            GuardId::SubmitAllowed,
            Arc::new(move |ctx: &FormContext, event: &Event| {
                !submit_checks.iter().any(|check| check(ctx, event))
            }),
        )?;
    }

    Ok(MachineOptions {
        actions: tables.actions,
        guards: tables.guards,
        submit,
    })
}

fn field_actions(tables: &mut TableBuilder, field: &FieldConfig) -> Result<(), ConfigError> {
    let name = field.name().to_string();

    let owner = name.clone();
    tables.action(
        ActionId::SetValue { field: name.clone() },
        Arc::new(move |ctx: &FormContext, event: &Event| {
            let current = slice(ctx, &owner);
            let value = event.value_for(&owner).unwrap_or(&current.value).to_string();
            ContextPatch::Field {
                name: owner.clone(),
                state: current.with_value(value),
            }
        }),
    )?;

    tables.action(ActionId::ClearError { field: name.clone() }, set_error(&name, |_| None))?;

    let owner = name.clone();
    tables.action(
        ActionId::SetAsyncError { field: name.clone() },
        set_error(&name, move |ctx| ctx.async_errors().get(&owner).cloned()),
    )?;

    for phase in Phase::ALL {
        for rule in field.validations(phase) {
            let message = rule
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Error in {name} -> {}", rule.name()));
            tables.action(
                ActionId::SetValidationError {
                    field: name.clone(),
                    phase,
                    validation: rule.name().to_string(),
                },
                set_error(&name, move |_| Some(message.clone())),
            )?;
        }
    }
    Ok(())
}

fn field_guards(tables: &mut TableBuilder, field: &FieldConfig) -> Result<(), ConfigError> {
    let name = field.name().to_string();

    for phase in Phase::ALL {
        for rule in field.validations(phase) {
            tables.guard(
                GuardId::Validation {
                    field: name.clone(),
                    phase,
                    validation: rule.name().to_string(),
                },
                rule.predicate().clone(),
            )?;
        }
    }

    let owner = name.clone();
    tables.guard(
        GuardId::HasAsyncError { field: name },
        Arc::new(move |ctx: &FormContext, _: &Event| ctx.async_error(&owner).is_some()),
    )
}

/// An action replacing the field's error with `error(ctx)`, keeping its value.
fn set_error<F>(field: &str, error: F) -> Action
where
    F: Fn(&FormContext) -> Option<String> + Send + Sync + 'static,
{
    let field = field.to_string();
    Arc::new(move |ctx: &FormContext, _: &Event| ContextPatch::Field {
        name: field.clone(),
        state: slice(ctx, &field).with_error(error(ctx)),
    })
}

fn set_async_errors(prepare: Option<PrepareAsyncErrors>) -> Action {
    Arc::new(move |ctx: &FormContext, event: &Event| {
        let errors = match &prepare {
            Some(prepare) => prepare(ctx, event),
            None => default_async_errors(event),
        };
        ContextPatch::AsyncErrors(errors)
    })
}

/// Reads `data.errors` of a settled submit, keeping string members only.
pub fn default_async_errors(event: &Event) -> BTreeMap<String, String> {
    event
        .data()
        .and_then(|data| data.get("errors"))
        .and_then(Value::as_object)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|(field, message)| {
                    message.as_str().map(|message| (field.clone(), message.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn slice(ctx: &FormContext, field: &str) -> form_fsm_core::FieldState {
    ctx.field(field).cloned().unwrap_or_default()
}

#[derive(Default)]
struct TableBuilder {
    actions: BTreeMap<ActionId, Action>,
    guards: BTreeMap<GuardId, Guard>,
}

impl TableBuilder {
    fn action(&mut self, id: ActionId, action: Action) -> Result<(), ConfigError> {
        if self.actions.contains_key(&id) {
            return Err(ConfigError::DuplicateIdentifier {
                kind: "action",
                name: id.name(),
            });
        }
        self.actions.insert(id, action);
        Ok(())
    }

    fn guard(&mut self, id: GuardId, guard: Guard) -> Result<(), ConfigError> {
        if self.guards.contains_key(&id) {
            return Err(ConfigError::DuplicateIdentifier {
                kind: "guard",
                name: id.name(),
            });
        }
        self.guards.insert(id, guard);
        Ok(())
    }
}
