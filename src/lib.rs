//! # form-fsm
//!
//! Generates parallel form-validation state machines from declarative field
//! configs, together with their action and guard tables and a small dispatch
//! API, and runs them on Tokio.
//!
//! Every field gets its own region in a parallel `draft` state. Submitting
//! moves the form to `submit`, which invokes the configured operation; a
//! resolved submit ends in the final `success` state, a rejected one sends
//! every field back through its async validation.
//!
//! ## Example
//!
//! ```rust
//! use form_fsm::{
//!     Event, FieldConfig, FormConfig, Interpreter, ValidationRule, create_form_machine,
//! };
//!
//! let config = FormConfig::new("signup")
//!     .field(FieldConfig::new("email").on_input(
//!         ValidationRule::new("isNotEmail", |ctx, _| !ctx.value("email").contains('@'))
//!             .with_message("It is not an email"),
//!     ))
//!     .submit(|_, _| async { Ok::<_, serde_json::Value>(serde_json::json!({ "ok": true })) });
//!
//! let machine = create_form_machine(&config).unwrap();
//! let mut form = Interpreter::new(&machine).unwrap();
//!
//! form.send(&Event::input("email", "nope")).unwrap();
//! assert!(form.matches("draft.email.invalid.input.isNotEmail"));
//! assert_eq!(form.context().error("email"), Some("It is not an email"));
//! ```

mod runtime;
mod task;

#[doc(inline)]
pub use crate::runtime::{
    FormSnapshot, Interpreter, MAX_TRANSIENT_STEPS, Outcome, RuntimeError, ServiceRequest,
};
#[doc(inline)]
pub use crate::task::{FormHandle, FormTask, RunnerOptions, spawn};
#[doc(inline)]
pub use form_fsm_core::*;
#[doc(inline)]
pub use form_fsm_gen::*;
