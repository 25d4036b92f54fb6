//! The form's working state.

use std::collections::BTreeMap;

use serde::Serialize;

/// Value and current error of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldState {
    pub value: String,
    pub error: Option<String>,
}

impl FieldState {
    /// A copy with `value` replaced and the error kept.
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            error: self.error.clone(),
        }
    }

    /// A copy with `error` replaced and the value kept.
    pub fn with_error(&self, error: Option<String>) -> Self {
        Self {
            value: self.value.clone(),
            error,
        }
    }
}

/// Working state of a form machine.
///
/// Holds exactly one [`FieldState`] per declared field plus the map of
/// errors reported by the last rejected submit. Serializes to
/// `{ "<field>": { "value", "error" }, ..., "asyncErrors": { ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormContext {
    #[serde(flatten)]
    fields: BTreeMap<String, FieldState>,
    #[serde(rename = "asyncErrors")]
    async_errors: BTreeMap<String, String>,
}

impl FormContext {
    /// Seeds an empty value and no error for every field.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|name| (name.into(), FieldState::default()))
                .collect(),
            async_errors: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.get(name)
    }

    /// Current value of a field, or `""` for an undeclared one.
    pub fn value(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", |f| f.value.as_str())
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|f| f.error.as_deref())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldState)> {
        self.fields.iter().map(|(name, state)| (name.as_str(), state))
    }

    pub fn async_errors(&self) -> &BTreeMap<String, String> {
        &self.async_errors
    }

    /// The non-empty async error reported for `name`, if any.
    pub fn async_error(&self, name: &str) -> Option<&str> {
        self.async_errors
            .get(name)
            .map(String::as_str)
            .filter(|message| !message.is_empty())
    }

    /// Applies one action result.
    ///
    /// A field patch fully replaces that field's slice; an async-error patch
    /// fully replaces the map. Patches for undeclared fields are rejected so
    /// the one-entry-per-field invariant holds.
    pub fn apply(&mut self, patch: ContextPatch) -> Result<(), UnknownField> {
        match patch {
            ContextPatch::Field { name, state } => match self.fields.get_mut(&name) {
                Some(slot) => {
                    *slot = state;
                    Ok(())
                }
                None => Err(UnknownField(name)),
            },
            ContextPatch::AsyncErrors(errors) => {
                self.async_errors = errors;
                Ok(())
            }
        }
    }
}

/// Replacement for the part of the context an action owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextPatch {
    Field { name: String, state: FieldState },
    AsyncErrors(BTreeMap<String, String>),
}

/// A patch addressed a field the context does not declare.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("context has no field `{0}`")]
pub struct UnknownField(pub String);
