//! Generator for parallel form-validation state machines.
//!
//! [`create_form_machine`] turns a [`FormConfig`] into a
//! [`MachineDescription`], the [`MachineOptions`] its names resolve against,
//! and a [`FormApi`] for dispatching events.

pub mod api;
mod assemble;
mod checks;
pub mod config;
mod error;
mod field;
pub mod ir;
pub mod tables;
mod verify;

pub use api::{Dispatch, DispatchError, FieldApi, FormApi, InputSource, SubmitSource, build_api};
pub use assemble::{DRAFT, FormMachine, SUBMIT_SERVICE, SUBMIT_STATE, SUCCESS, create_form_machine};
pub use checks::is_identifier;
pub use config::{
    FieldConfig, FormConfig, Predicate, PrepareAsyncErrors, SubmitFuture, SubmitPolicy,
    SubmitService, ValidationRule,
};
pub use error::{ConfigError, GenerateError};
pub use field::{ASYNC, INVALID, VALID, VALIDATE, VALIDATE_ASYNC, build_region};
pub use ir::{InvokeDef, MachineDescription, StateKind, StateNode, TransitionDef};
pub use tables::{Action, Guard, MachineOptions, build_tables, default_async_errors};
