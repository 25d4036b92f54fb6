//! Event-dispatch helpers handed to calling code.
//!
//! UI code drives a form only through these helpers, so every dispatched
//! event type is one the generated machine declares.

use form_fsm_core::{Event, EventType};

use crate::config::FormConfig;

/// Something that accepts events for a running form machine.
pub trait Dispatch {
    fn dispatch(&self, event: Event) -> Result<(), DispatchError>;
}

impl<F> Dispatch for F
where
    F: Fn(Event),
{
    fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        self(event);
        Ok(())
    }
}

/// The event could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("form machine is no longer running")]
    Closed,
    #[error("form machine event queue is full")]
    Full,
}

/// The raw notification of an input change.
pub trait InputSource {
    fn target_value(&self) -> String;
}

impl InputSource for str {
    fn target_value(&self) -> String {
        self.to_string()
    }
}

impl InputSource for String {
    fn target_value(&self) -> String {
        self.clone()
    }
}

/// The raw notification of a submit request.
pub trait SubmitSource {
    /// Suppresses whatever the host would do by default with the request.
    fn prevent_default(&mut self);
}

impl SubmitSource for () {
    fn prevent_default(&mut self) {}
}

/// Dispatch helper for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldApi {
    field: String,
    event_type: EventType,
}

impl FieldApi {
    fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            event_type: EventType::set(field),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// The `SET_<FIELD>` type of the events this helper dispatches.
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Dispatches the new raw value of the field.
    pub fn on_input<D, I>(&self, dispatch: &D, raw: &I) -> Result<(), DispatchError>
    where
        D: Dispatch + ?Sized,
        I: InputSource + ?Sized,
    {
        dispatch.dispatch(Event::input(self.field.clone(), raw.target_value()))
    }
}

/// Dispatch helpers for a whole form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormApi {
    fields: Vec<FieldApi>,
}

impl FormApi {
    pub fn field(&self, name: &str) -> Option<&FieldApi> {
        self.fields.iter().find(|api| api.field == name)
    }

    pub fn fields(&self) -> &[FieldApi] {
        &self.fields
    }

    /// Suppresses the raw request's default behaviour and dispatches `SUBMIT`.
    pub fn submit<D, S>(&self, dispatch: &D, raw: &mut S) -> Result<(), DispatchError>
    where
        D: Dispatch + ?Sized,
        S: SubmitSource + ?Sized,
    {
        raw.prevent_default();
        dispatch.dispatch(Event::Submit)
    }
}

/// Derives one helper per field plus the submit helper.
pub fn build_api(config: &FormConfig) -> FormApi {
    FormApi {
        fields: config
            .field_configs()
            .iter()
            .map(|field| FieldApi::new(field.name()))
            .collect(),
    }
}
