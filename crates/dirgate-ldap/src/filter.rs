//! Search filter templates.
//!
//! Filters arrive from configuration as templates with a single `{username}`
//! placeholder, e.g. `(uid={username})` or `(memberUid={username})`.
//! Substituted values are escaped per RFC 4515 so a login name can never
//! alter the filter structure.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use dirgate_core::error::Error as CoreError;

/// Placeholder replaced with the escaped username when rendering.
pub const USERNAME_PLACEHOLDER: &str = "{username}";

/// Errors raised while constructing a filter template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterTemplateError {
    /// The template contains no `{username}` placeholder.
    #[error("filter template `{0}` is missing the {{username}} placeholder")]
    MissingPlaceholder(String),
    /// The template contains the placeholder more than once.
    #[error("filter template `{0}` must contain the {{username}} placeholder exactly once")]
    RepeatedPlaceholder(String),
}

impl From<FilterTemplateError> for CoreError {
    fn from(err: FilterTemplateError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

/// A search filter template holding exactly one username substitution point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilterTemplate {
    template: String,
}

impl FilterTemplate {
    /// Creates a template, enforcing the single-placeholder invariant.
    ///
    /// # Errors
    ///
    /// Returns [`FilterTemplateError`] unless the template contains the
    /// `{username}` placeholder exactly once.
    pub fn new(template: impl Into<String>) -> std::result::Result<Self, FilterTemplateError> {
        let template = template.into();
        match template.matches(USERNAME_PLACEHOLDER).count() {
            0 => Err(FilterTemplateError::MissingPlaceholder(template)),
            1 => Ok(Self { template }),
            _ => Err(FilterTemplateError::RepeatedPlaceholder(template)),
        }
    }

    /// Borrows the raw template string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Renders the filter for a username, escaping filter metacharacters.
    #[must_use]
    pub fn render(&self, username: &str) -> String {
        self.template
            .replace(USERNAME_PLACEHOLDER, &escape_filter_value(username))
    }
}

impl fmt::Display for FilterTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

impl TryFrom<String> for FilterTemplate {
    type Error = FilterTemplateError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FilterTemplate> for String {
    fn from(value: FilterTemplate) -> Self {
        value.template
    }
}

/// Escapes the RFC 4515 filter metacharacters in a value.
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_single_placeholder() {
        let template = FilterTemplate::new("(uid={username})").unwrap();
        assert_eq!(template.as_str(), "(uid={username})");
        assert_eq!(template.render("jdoe"), "(uid=jdoe)");
    }

    #[test]
    fn rejects_missing_placeholder() {
        let err = FilterTemplate::new("(uid=jdoe)").unwrap_err();
        assert!(matches!(err, FilterTemplateError::MissingPlaceholder(_)));
    }

    #[test]
    fn rejects_repeated_placeholder() {
        let err = FilterTemplate::new("(|(uid={username})(cn={username}))").unwrap_err();
        assert!(matches!(err, FilterTemplateError::RepeatedPlaceholder(_)));
    }

    #[test]
    fn render_escapes_metacharacters() {
        let template = FilterTemplate::new("(uid={username})").unwrap();
        assert_eq!(
            template.render("ad*min)(uid=*"),
            "(uid=ad\\2amin\\29\\28uid=\\2a)"
        );
    }

    #[test]
    fn escape_handles_backslash_and_nul() {
        assert_eq!(escape_filter_value("a\\b"), "a\\5cb");
        assert_eq!(escape_filter_value("a\0b"), "a\\00b");
        assert_eq!(escape_filter_value("plain"), "plain");
    }

    #[test]
    fn deserialization_enforces_invariant() {
        let template: FilterTemplate = serde_json::from_str(r#""(memberUid={username})""#).unwrap();
        assert_eq!(template.as_str(), "(memberUid={username})");

        let err = serde_json::from_str::<FilterTemplate>(r#""(memberUid=jdoe)""#).unwrap_err();
        assert!(err.to_string().contains("placeholder"));
    }
}
