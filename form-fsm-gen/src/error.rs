//! Generation errors.

use form_fsm_core::{ActionId, GuardId, Phase, StatePath};

/// The form description violates a construction-time contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("form `{0}` declares no fields")]
    NoFields(String),

    #[error("field #{index} must have a name")]
    MissingFieldName { index: usize },

    #[error(
        "`{name}` is not a valid identifier \
         (expected an ASCII letter followed by letters, digits or `_`)"
    )]
    InvalidName { name: String },

    #[error("field name `{0}` is reserved")]
    ReservedName(String),

    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),

    #[error("validation #{index} of field `{field}` ({phase}) must have a name")]
    MissingValidationName {
        field: String,
        phase: Phase,
        index: usize,
    },

    #[error("validation `{validation}` is declared more than once for field `{field}` ({phase})")]
    DuplicateValidation {
        field: String,
        phase: Phase,
        validation: String,
    },

    #[error("generated {kind} name `{name}` is produced by both {first} and {second}")]
    NameCollision {
        kind: &'static str,
        name: String,
        first: String,
        second: String,
    },

    #[error("{kind} `{name}` was registered twice")]
    DuplicateIdentifier { kind: &'static str, name: String },

    #[error("form `{0}` has no submit operation")]
    MissingSubmit(String),
}

/// Generation failed.
///
/// Everything except [`GenerateError::Config`] is a defect of the generator
/// itself: the assembled description and its tables disagree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("transition declared in `{from}` targets undeclared state `{target}`")]
    UnresolvedTarget { from: StatePath, target: StatePath },

    #[error("action `{0}` is referenced but has no table entry")]
    UnresolvedAction(ActionId),

    #[error("guard `{0}` is referenced but has no table entry")]
    UnresolvedGuard(GuardId),

    #[error("transient transitions form a cycle through `{0}`")]
    TransientCycle(StatePath),
}
