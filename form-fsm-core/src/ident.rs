//! Identifier derivation.
//!
//! The state builder and the action/guard table builder never spell an
//! identifier themselves: they construct one of the typed ids below and let
//! its `Display` impl render the canonical name. Both passes therefore agree
//! on every action, guard, event and state name by construction.

use std::fmt;

use serde::{Serialize, Serializer};

/// Joins word fragments in camelCase.
///
/// The first fragment is kept as is; every following fragment gets its first
/// letter upper-cased. Callers must pass at least one word.
pub fn join_camel<S: AsRef<str>>(words: &[S]) -> String {
    debug_assert!(!words.is_empty(), "join_camel needs at least one word");

    let mut out = String::new();
    for (index, word) in words.iter().enumerate() {
        let word = word.as_ref();
        if index == 0 {
            out.push_str(word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Splits a camelCase name at every lowercase-to-uppercase boundary.
///
/// `repeatPassword` becomes `["repeat", "Password"]`. A name without a
/// boundary comes back as a single fragment.
pub fn split_camel(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in name.chars() {
        if prev_lower && ch.is_ascii_uppercase() {
            words.push(std::mem::take(&mut current));
        }
        current.push(ch);
        prev_lower = ch.is_ascii_lowercase();
    }
    words.push(current);
    words
}

/// Builds an event/transition name: `["set", "repeat", "Password"]` -> `SET_REPEAT_PASSWORD`.
pub fn transition_name<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|word| word.as_ref().to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Builds an action name: `set` followed by the camel-joined words.
pub fn action_name<S: AsRef<str>>(words: &[S]) -> String {
    prefixed("set", words)
}

/// Builds a guard name: `is` followed by the camel-joined words.
pub fn guard_name<S: AsRef<str>>(words: &[S]) -> String {
    prefixed("is", words)
}

fn prefixed<S: AsRef<str>>(prefix: &str, words: &[S]) -> String {
    let mut all = Vec::with_capacity(words.len() + 1);
    all.push(prefix);
    all.extend(words.iter().map(AsRef::as_ref));
    join_camel(&all)
}

/// When a validation is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Checked every time the field value changes.
    OnInput,
    /// Checked when the form is submitted.
    OnSubmit,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::OnInput, Phase::OnSubmit];

    /// The word used for this phase inside generated identifiers.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::OnInput => "onInput",
            Phase::OnSubmit => "onSubmit",
        }
    }

    /// Name of the `invalid` child region holding this phase's failure states.
    pub fn region(self) -> &'static str {
        match self {
            Phase::OnInput => "input",
            Phase::OnSubmit => "submit",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the cross-field action that replaces the async-error map.
pub const SET_ASYNC_ERRORS: &str = "setAsyncErrors";

/// Context key of the async-error map. No field may use it.
pub const ASYNC_ERRORS_KEY: &str = "asyncErrors";

/// Identifier of every action the generator can emit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionId {
    /// Stores the value carried by a `SET_<FIELD>` event.
    SetValue { field: String },
    /// Resets the field error to `None`.
    ClearError { field: String },
    /// Stores the message of one failed validation.
    SetValidationError {
        field: String,
        phase: Phase,
        validation: String,
    },
    /// Copies the field's entry of the async-error map into its error.
    SetAsyncError { field: String },
    /// Replaces the async-error map from a rejected submit.
    SetAsyncErrors,
}

impl ActionId {
    /// The field whose slice of the context this action replaces, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ActionId::SetValue { field }
            | ActionId::ClearError { field }
            | ActionId::SetValidationError { field, .. }
            | ActionId::SetAsyncError { field } => Some(field),
            ActionId::SetAsyncErrors => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            ActionId::SetValue { field } => action_name(&[field.as_str()]),
            ActionId::ClearError { field } => join_camel(&["clear", field.as_str(), "error"]),
            ActionId::SetValidationError {
                field,
                phase,
                validation,
            } => action_name(&[field.as_str(), phase.as_str(), validation.as_str(), "error"]),
            ActionId::SetAsyncError { field } => action_name(&[field.as_str(), "error"]),
            ActionId::SetAsyncErrors => SET_ASYNC_ERRORS.to_string(),
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for ActionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

/// Identifier of every guard the generator can emit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GuardId {
    /// The configured predicate of one validation.
    Validation {
        field: String,
        phase: Phase,
        validation: String,
    },
    /// Holds when the async-error map has a non-empty message for the field.
    HasAsyncError { field: String },
    /// Holds when no onSubmit predicate of any field holds.
    SubmitAllowed,
}

impl GuardId {
    pub fn name(&self) -> String {
        match self {
            GuardId::Validation {
                field,
                phase,
                validation,
            } => guard_name(&[field.as_str(), phase.as_str(), validation.as_str()]),
            GuardId::HasAsyncError { field } => guard_name(&[field.as_str(), "async", "error"]),
            GuardId::SubmitAllowed => guard_name(&["submit", "allowed"]),
        }
    }
}

impl fmt::Display for GuardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for GuardId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

/// Type of an externally dispatched event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventType {
    /// `SET_<FIELD_NAME_WORDS>`: a new raw value for one field.
    Set { field: String },
    /// `SUBMIT`.
    Submit,
}

impl EventType {
    pub fn set(field: impl Into<String>) -> Self {
        EventType::Set {
            field: field.into(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            EventType::Set { field } => {
                let mut words = vec!["SET".to_string()];
                words.extend(split_camel(field));
                transition_name(&words)
            }
            EventType::Submit => "SUBMIT".to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

/// Absolute path of a state below the machine root.
///
/// Rendered as an id reference, `#draft.email.validate`: every top-level
/// state carries its own key as its id, so the first segment doubles as the
/// id to resolve from.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatePath(Vec<String>);

impl StatePath {
    /// The machine root itself.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parses `draft.email.valid` or `#draft.email.valid`.
    pub fn parse(path: &str) -> Self {
        let path = path.strip_prefix('#').unwrap_or(path);
        if path.is_empty() {
            return Self::root();
        }
        Self::new(path.split('.'))
    }

    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.into());
        Self(segments)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True when `self` is `other` or one of its ancestors.
    pub fn contains(&self, other: &StatePath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Longest shared prefix of two paths.
    pub fn common_prefix(&self, other: &StatePath) -> StatePath {
        let shared = self
            .0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.clone())
            .collect();
        StatePath(shared)
    }

    /// Reference form used in transition targets.
    pub fn target(&self) -> String {
        format!("#{}", self.0.join("."))
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl Serialize for StatePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.target())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn join_camel_upper_cases_following_words() {
        assert_eq!(join_camel(&["set", "email"]), "setEmail");
        assert_eq!(join_camel(&["clear", "repeatPassword", "error"]), "clearRepeatPasswordError");
        assert_eq!(join_camel(&["single"]), "single");
    }

    #[test]
    fn split_camel_recovers_word_boundaries() {
        assert_eq!(split_camel("repeatPassword"), vec!["repeat", "Password"]);
        assert_eq!(split_camel("email"), vec!["email"]);
        assert_eq!(split_camel("aBC"), vec!["a", "BC"]);
        assert_eq!(split_camel("xAyB"), vec!["x", "Ay", "B"]);
    }

    #[test]
    fn transition_names_are_upper_snake_case() {
        assert_eq!(transition_name(&["SET", "repeat", "Password"]), "SET_REPEAT_PASSWORD");
        assert_eq!(EventType::set("repeatPassword").to_string(), "SET_REPEAT_PASSWORD");
        assert_eq!(EventType::Submit.to_string(), "SUBMIT");
    }

    #[test]
    fn action_and_guard_names_follow_convention() {
        let field = "email".to_string();
        assert_eq!(ActionId::SetValue { field: field.clone() }.to_string(), "setEmail");
        assert_eq!(ActionId::ClearError { field: field.clone() }.to_string(), "clearEmailError");
        assert_eq!(ActionId::SetAsyncError { field: field.clone() }.to_string(), "setEmailError");
        assert_eq!(
            ActionId::SetValidationError {
                field: field.clone(),
                phase: Phase::OnInput,
                validation: "isNotEmail".into(),
            }
            .to_string(),
            "setEmailOnInputIsNotEmailError"
        );
        assert_eq!(
            GuardId::Validation {
                field: field.clone(),
                phase: Phase::OnSubmit,
                validation: "empty".into(),
            }
            .to_string(),
            "isEmailOnSubmitEmpty"
        );
        assert_eq!(GuardId::HasAsyncError { field }.to_string(), "isEmailAsyncError");
        assert_eq!(ActionId::SetAsyncErrors.to_string(), "setAsyncErrors");
    }

    #[test]
    fn state_paths_render_as_id_references() {
        let path = StatePath::root().child("draft").child("email").child("validate_async");
        assert_eq!(path.target(), "#draft.email.validate_async");
        assert_eq!(StatePath::parse("#draft.email.validate_async"), path);
        assert_eq!(
            StatePath::parse("draft.email"),
            path.parent().and_then(|p| p.parent()).unwrap()
        );
        assert!(StatePath::parse("draft").contains(&path));
        assert!(!path.contains(&StatePath::parse("draft")));
        assert_eq!(
            path.common_prefix(&StatePath::parse("draft.password.valid")),
            StatePath::parse("draft")
        );
    }

    proptest! {
        #[test]
        fn split_then_join_restores_camel_case(
            words in proptest::collection::vec("[a-z]{1,6}", 1..5),
        ) {
            let name = join_camel(&words);
            let split = split_camel(&name);
            prop_assert_eq!(split.len(), words.len());
            prop_assert_eq!(split.concat(), name);
        }

        #[test]
        fn identifiers_are_deterministic(
            field in "[a-z][a-zA-Z0-9]{0,8}",
            validation in "[a-z][a-zA-Z0-9]{0,8}",
        ) {
            for phase in Phase::ALL {
                let action = ActionId::SetValidationError {
                    field: field.clone(),
                    phase,
                    validation: validation.clone(),
                };
                let guard = GuardId::Validation {
                    field: field.clone(),
                    phase,
                    validation: validation.clone(),
                };
                prop_assert!(action.name().starts_with("set"));
                prop_assert!(guard.name().starts_with("is"));
                prop_assert_eq!(action.name(), action.clone().to_string());
                prop_assert_eq!(guard.name(), guard.clone().to_string());
            }
        }
    }
}
