//! Per-field state region.
//!
//! ```text
//! <field>
//! ├── valid
//! ├── invalid
//! │   ├── input   one child per onInput validation
//! │   ├── submit  one child per onSubmit validation
//! │   └── async
//! ├── validate        transient, entered on every value change
//! └── validate_async  transient, entered after a rejected submit
//! ```

use form_fsm_core::{ActionId, EventType, GuardId, Phase, StatePath};

use crate::checks::check_field_name;
use crate::config::FieldConfig;
use crate::error::ConfigError;
use crate::ir::{StateNode, TransitionDef};

pub const VALID: &str = "valid";
pub const INVALID: &str = "invalid";
pub const ASYNC: &str = "async";
pub const VALIDATE: &str = "validate";
pub const VALIDATE_ASYNC: &str = "validate_async";

/// Builds the region of one field, rooted at `parent.<field>`.
///
/// `index` is the field's position in the form and only used for error
/// reporting.
pub fn build_region(
    field: &FieldConfig,
    index: usize,
    parent: &StatePath,
) -> Result<StateNode, ConfigError> {
    check_field_name(field, index)?;

    let name = field.name();
    let region = parent.child(name);
    tracing::debug!(field = name, region = %region, "building field region");

    let invalid = StateNode::compound_with_initial(
        INVALID,
        Some(Phase::OnInput.region().to_string()),
        vec![
            failure_states(field, Phase::OnInput),
            failure_states(field, Phase::OnSubmit),
            StateNode::atomic(ASYNC),
        ],
    );

    let states = vec![
        StateNode::atomic(VALID),
        invalid,
        StateNode::atomic(VALIDATE).always(validate_transitions(field, &region)),
        StateNode::atomic(VALIDATE_ASYNC).always(validate_async_transitions(name, &region)),
    ];

    Ok(
        StateNode::compound_with_initial(name, Some(VALID.to_string()), states)
            .on(
                EventType::set(name),
                vec![
                    TransitionDef::to(region.child(VALIDATE)).action(ActionId::SetValue {
                        field: name.to_string(),
                    }),
                ],
            )
            .on(
                EventType::Submit,
                failure_transitions(field, Phase::OnSubmit, &region),
            ),
    )
}

/// `invalid.<phase region>`: one plain child per validation, declaration order.
fn failure_states(field: &FieldConfig, phase: Phase) -> StateNode {
    let children = field
        .validations(phase)
        .iter()
        .map(|rule| StateNode::atomic(rule.name()))
        .collect();
    StateNode::compound(phase.region(), children)
}

/// One guarded transition per validation, in declaration order, so the
/// first failing validation wins.
fn failure_transitions(
    field: &FieldConfig,
    phase: Phase,
    region: &StatePath,
) -> Vec<TransitionDef> {
    let name = field.name();
    field
        .validations(phase)
        .iter()
        .map(|rule| {
            let target = region
                .child(INVALID)
                .child(phase.region())
                .child(rule.name());
            TransitionDef::to(target)
                .guarded(GuardId::Validation {
                    field: name.to_string(),
                    phase,
                    validation: rule.name().to_string(),
                })
                .action(ActionId::SetValidationError {
                    field: name.to_string(),
                    phase,
                    validation: rule.name().to_string(),
                })
        })
        .collect()
}

fn validate_transitions(field: &FieldConfig, region: &StatePath) -> Vec<TransitionDef> {
    let mut transitions = failure_transitions(field, Phase::OnInput, region);
    transitions.push(clear_transition(field.name(), region));
    transitions
}

fn validate_async_transitions(name: &str, region: &StatePath) -> Vec<TransitionDef> {
    vec![
        TransitionDef::to(region.child(INVALID).child(ASYNC))
            .guarded(GuardId::HasAsyncError {
                field: name.to_string(),
            })
            .action(ActionId::SetAsyncError {
                field: name.to_string(),
            }),
        clear_transition(name, region),
    ]
}

fn clear_transition(name: &str, region: &StatePath) -> TransitionDef {
    TransitionDef::to(region.child(VALID)).action(ActionId::ClearError {
        field: name.to_string(),
    })
}
