//! Events consumed by a form machine.

use serde_json::Value;

use crate::ident::EventType;

/// An event delivered to a form machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// New raw value for a field; its type is `SET_<FIELD_NAME_WORDS>`.
    Input { field: String, value: String },
    /// Form submission.
    Submit,
    /// The invoked submit operation resolved with this payload.
    SubmitDone(Value),
    /// The invoked submit operation rejected with this payload.
    SubmitError(Value),
}

impl Event {
    pub fn input(field: impl Into<String>, value: impl Into<String>) -> Self {
        Event::Input {
            field: field.into(),
            value: value.into(),
        }
    }

    /// The transition key this event matches, or `None` for service results.
    pub fn event_type(&self) -> Option<EventType> {
        match self {
            Event::Input { field, .. } => Some(EventType::set(field.clone())),
            Event::Submit => Some(EventType::Submit),
            Event::SubmitDone(_) | Event::SubmitError(_) => None,
        }
    }

    /// The value this event carries for `field`.
    pub fn value_for(&self, field: &str) -> Option<&str> {
        match self {
            Event::Input { field: name, value } if name == field => Some(value),
            _ => None,
        }
    }

    /// Payload of a settled submit.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Event::SubmitDone(data) | Event::SubmitError(data) => Some(data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn input_events_are_typed_by_field() {
        let event = Event::input("repeatPassword", "secret");
        assert_eq!(event.event_type().unwrap().to_string(), "SET_REPEAT_PASSWORD");
        assert_eq!(event.value_for("repeatPassword"), Some("secret"));
        assert_eq!(event.value_for("password"), None);
    }

    #[test]
    fn service_results_carry_data_but_no_type() {
        let event = Event::SubmitError(json!({ "errors": {} }));
        assert!(event.event_type().is_none());
        assert_eq!(event.data(), Some(&json!({ "errors": {} })));
        assert!(Event::Submit.data().is_none());
    }
}
