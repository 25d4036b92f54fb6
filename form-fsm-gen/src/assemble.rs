//! Top-level machine assembly.
//!
//! ```text
//! <form>
//! ├── draft    parallel, one region per field
//! ├── submit   invokes the submit operation
//! └── success  final
//! ```

use form_fsm_core::{ActionId, EventType, FormContext, GuardId, StatePath};

use crate::api::{FormApi, build_api};
use crate::checks;
use crate::config::{FormConfig, SubmitPolicy};
use crate::error::{ConfigError, GenerateError};
use crate::field::{VALIDATE_ASYNC, build_region};
use crate::ir::{InvokeDef, MachineDescription, StateNode, TransitionDef};
use crate::tables::{MachineOptions, build_tables};
use crate::verify::verify;

pub const DRAFT: &str = "draft";
pub const SUBMIT_STATE: &str = "submit";
pub const SUCCESS: &str = "success";

/// Name under which the submit operation is invoked.
pub const SUBMIT_SERVICE: &str = "submit";

/// Everything generated from one [`FormConfig`].
#[derive(Debug, Clone)]
pub struct FormMachine {
    pub description: MachineDescription,
    pub options: MachineOptions,
    pub api: FormApi,
}

impl FormMachine {
    pub fn id(&self) -> &str {
        self.description.id()
    }

    /// The description as a JSON document.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.description)
    }
}

/// Generates the machine, its tables and its dispatch helpers.
///
/// The config is fully checked before anything is built. The result is
/// verified afterwards: every target, action and guard it references must
/// resolve.
pub fn create_form_machine(config: &FormConfig) -> Result<FormMachine, GenerateError> {
    checks::check(config)?;

    let description = assemble(config)?;
    let submit = config
        .submit_service()
        .cloned()
        .ok_or_else(|| ConfigError::MissingSubmit(config.form_name().to_string()))?;
    let options = build_tables(config, submit)?;
    let api = build_api(config);

    verify(&description, &options)?;

    if config.is_debug() {
        match serde_json::to_string_pretty(&description) {
            Ok(json) => tracing::info!(form = description.id(), "generated machine:\n{json}"),
            Err(err) => {
                tracing::warn!(form = description.id(), error = %err, "could not render machine")
            }
        }
        tracing::info!(
            form = description.id(),
            actions = ?options.action_names(),
            guards = ?options.guard_names(),
            "generated tables"
        );
    }

    Ok(FormMachine {
        description,
        options,
        api,
    })
}

fn assemble(config: &FormConfig) -> Result<MachineDescription, ConfigError> {
    let draft_path = StatePath::root().child(DRAFT);
    let submit_path = StatePath::root().child(SUBMIT_STATE);
    let success_path = StatePath::root().child(SUCCESS);

    let regions = config
        .field_configs()
        .iter()
        .enumerate()
        .map(|(index, field)| build_region(field, index, &draft_path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut leave_draft = TransitionDef::to(submit_path);
    if config.policy() == SubmitPolicy::BlockOnFieldErrors {
        leave_draft = leave_draft.guarded(GuardId::SubmitAllowed);
    }
    let draft = StateNode::parallel(DRAFT, regions)
        .with_id(DRAFT)
        .on(EventType::Submit, vec![leave_draft]);

    let revalidate = config
        .field_configs()
        .iter()
        .map(|field| draft_path.child(field.name()).child(VALIDATE_ASYNC))
        .collect();
    let submit = StateNode::atomic(SUBMIT_STATE)
        .with_id(SUBMIT_STATE)
        .invoke(InvokeDef {
            src: SUBMIT_SERVICE.to_string(),
            on_done: TransitionDef::to(success_path),
            on_error: TransitionDef::to_all(revalidate).action(ActionId::SetAsyncErrors),
        });

    let success = StateNode::final_state(SUCCESS).with_id(SUCCESS);

    let root = StateNode::compound_with_initial(
        config.form_name(),
        Some(DRAFT.to_string()),
        vec![draft, submit, success],
    )
    .with_id(config.form_name());

    Ok(MachineDescription {
        root,
        context: FormContext::new(config.field_configs().iter().map(|f| f.name())),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::{FieldConfig, ValidationRule};

    fn config() -> FormConfig {
        FormConfig::new("signup")
            .field(FieldConfig::new("email").on_input(ValidationRule::new("empty", |ctx, _| {
                ctx.value("email").is_empty()
            })))
            .field(FieldConfig::new("password"))
            .submit(|_, _| async { Ok::<_, serde_json::Value>(json!({})) })
    }

    #[test]
    fn top_level_states() {
        let machine = create_form_machine(&config()).unwrap();
        let root = &machine.description.root;
        let keys: Vec<_> = root.states.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, [DRAFT, SUBMIT_STATE, SUCCESS]);
        assert_eq!(root.initial.as_deref(), Some(DRAFT));
        assert_eq!(machine.id(), "signup");
    }

    #[test]
    fn rejected_submit_revalidates_every_field() {
        let machine = create_form_machine(&config()).unwrap();
        let submit = machine
            .description
            .state(&StatePath::parse("submit"))
            .and_then(|s| s.invoke.as_ref())
            .unwrap();
        let targets: Vec<_> = submit.on_error.targets.iter().map(StatePath::target).collect();
        assert_eq!(
            targets,
            ["#draft.email.validate_async", "#draft.password.validate_async"]
        );
        assert_eq!(submit.on_error.actions, [ActionId::SetAsyncErrors]);
    }

    #[test]
    fn blocking_policy_guards_leaving_draft() {
        let independent = create_form_machine(&config()).unwrap();
        let draft = independent.description.state(&StatePath::parse("draft")).unwrap();
        assert!(draft.on[&EventType::Submit][0].guard.is_none());

        let blocking =
            create_form_machine(&config().submit_policy(SubmitPolicy::BlockOnFieldErrors)).unwrap();
        let draft = blocking.description.state(&StatePath::parse("draft")).unwrap();
        assert_eq!(draft.on[&EventType::Submit][0].guard, Some(GuardId::SubmitAllowed));
    }
}
