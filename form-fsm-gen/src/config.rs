//! Declarative form description consumed by the generator.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use form_fsm_core::{Event, FormContext, Phase};
use serde_json::Value;

/// A pure predicate over the current context and the triggering event.
pub type Predicate = Arc<dyn Fn(&FormContext, &Event) -> bool + Send + Sync>;

/// Future returned by the submit operation: `Ok` resolves the form, `Err`
/// carries the rejection payload.
pub type SubmitFuture = Pin<Box<dyn Future<Output = Result<Value, Value>> + Send>>;

/// The asynchronous submit operation.
pub type SubmitService = Arc<dyn Fn(FormContext, Event) -> SubmitFuture + Send + Sync>;

/// Maps a rejected submit to per-field messages.
pub type PrepareAsyncErrors =
    Arc<dyn Fn(&FormContext, &Event) -> BTreeMap<String, String> + Send + Sync>;

/// One named validation of a field.
#[derive(Clone)]
pub struct ValidationRule {
    name: String,
    predicate: Predicate,
    message: Option<String>,
}

impl ValidationRule {
    /// The predicate returns `true` when the validation *fails*.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&FormContext, &Event) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// One field of the form and its validations, split by phase.
#[derive(Debug, Clone, Default)]
pub struct FieldConfig {
    name: String,
    on_input: Vec<ValidationRule>,
    on_submit: Vec<ValidationRule>,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a validation checked whenever the value changes. Declaration
    /// order is evaluation order.
    pub fn on_input(mut self, rule: ValidationRule) -> Self {
        self.on_input.push(rule);
        self
    }

    /// Adds a validation checked when the form is submitted.
    pub fn on_submit(mut self, rule: ValidationRule) -> Self {
        self.on_submit.push(rule);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn validations(&self, phase: Phase) -> &[ValidationRule] {
        match phase {
            Phase::OnInput => &self.on_input,
            Phase::OnSubmit => &self.on_submit,
        }
    }
}

/// How a field-level `SUBMIT` failure affects the form-level `SUBMIT`.
///
/// A statechart runtime that stops at the first enabled transition across
/// the whole configuration never lets the form leave `draft` while a field
/// rejects the submit; [`SubmitPolicy::BlockOnFieldErrors`] reproduces that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitPolicy {
    /// Field and form react independently: the form leaves `draft` even
    /// when some field's onSubmit validation failed.
    #[default]
    Independent,
    /// The form-level transition is guarded: it only fires when no onSubmit
    /// validation of any field fails.
    BlockOnFieldErrors,
}

/// Complete description of a form.
#[derive(Clone)]
pub struct FormConfig {
    form_name: String,
    fields: Vec<FieldConfig>,
    submit: Option<SubmitService>,
    prepare_async_errors: Option<PrepareAsyncErrors>,
    submit_policy: SubmitPolicy,
    debug: bool,
}

impl FormConfig {
    pub fn new(form_name: impl Into<String>) -> Self {
        Self {
            form_name: form_name.into(),
            fields: Vec::new(),
            submit: None,
            prepare_async_errors: None,
            submit_policy: SubmitPolicy::default(),
            debug: false,
        }
    }

    pub fn field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldConfig>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Sets the operation invoked once the form enters its `submit` state.
    pub fn submit<F, Fut>(mut self, submit: F) -> Self
    where
        F: Fn(FormContext, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        self.submit = Some(Arc::new(move |ctx, event| {
            Box::pin(submit(ctx, event)) as SubmitFuture
        }));
        self
    }

    /// Overrides the default extraction of async errors, which reads the
    /// `errors` object of the rejection payload.
    pub fn prepare_async_errors<F>(mut self, prepare: F) -> Self
    where
        F: Fn(&FormContext, &Event) -> BTreeMap<String, String> + Send + Sync + 'static,
    {
        self.prepare_async_errors = Some(Arc::new(prepare));
        self
    }

    pub fn submit_policy(mut self, policy: SubmitPolicy) -> Self {
        self.submit_policy = policy;
        self
    }

    /// Logs the generated machine when set.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    pub fn field_configs(&self) -> &[FieldConfig] {
        &self.fields
    }

    pub fn submit_service(&self) -> Option<&SubmitService> {
        self.submit.as_ref()
    }

    pub fn async_error_mapper(&self) -> Option<&PrepareAsyncErrors> {
        self.prepare_async_errors.as_ref()
    }

    pub fn policy(&self) -> SubmitPolicy {
        self.submit_policy
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }
}

impl fmt::Debug for FormConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormConfig")
            .field("form_name", &self.form_name)
            .field("fields", &self.fields)
            .field("submit", &self.submit.is_some())
            .field("prepare_async_errors", &self.prepare_async_errors.is_some())
            .field("submit_policy", &self.submit_policy)
            .field("debug", &self.debug)
            .finish()
    }
}
