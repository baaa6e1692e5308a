//! Distinguished name handling for directory entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use dirgate_core::error::Error as CoreError;

/// Errors raised while parsing a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component was not an `attribute=value` pair.
    #[error("malformed distinguished name component: {0}")]
    Malformed(String),
    /// The distinguished name ended in the middle of an escape sequence.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DnError> for CoreError {
    fn from(err: DnError) -> Self {
        CoreError::InvalidRequest(err.to_string())
    }
}

/// A single `attribute=value` pair within a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
    attribute: String,
    value: String,
}

impl Rdn {
    /// Attribute portion (e.g. `cn`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Value portion, unescaped.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if this component carries the attribute (case-insensitive).
    #[must_use]
    pub fn matches_attribute(&self, attribute: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(attribute)
    }
}

/// Strongly-typed distinguished name wrapper.
///
/// Keeps a canonical string representation while giving access to the
/// individual components. Parsing is strict so malformed DNs surface early
/// instead of being passed to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DistinguishedName {
    raw: String,
    components: Vec<Rdn>,
}

impl DistinguishedName {
    /// Parses a distinguished name from a string.
    ///
    /// # Errors
    ///
    /// Returns [`DnError`] if the input is empty or contains a component
    /// without an `attribute=value` shape.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DnError> {
        let input = input.as_ref().trim();
        if input.is_empty() {
            return Err(DnError::Empty);
        }

        let mut components = Vec::new();
        for part in split_unescaped(input, ',')? {
            components.push(parse_component(&part)?);
        }

        Ok(Self {
            raw: components_to_string(&components),
            components,
        })
    }

    /// Borrows the canonical distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the components in order, most-specific first.
    #[must_use]
    pub fn components(&self) -> &[Rdn] {
        &self.components
    }

    /// Looks up the value of the first component matching `attribute`
    /// (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|rdn| rdn.matches_attribute(attribute))
            .map(Rdn::value)
    }

    /// The leading (most-specific) component, e.g. `uid=jdoe`.
    #[must_use]
    pub fn leading(&self) -> &Rdn {
        // parse() rejects empty DNs, so at least one component exists.
        &self.components[0]
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DnError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DistinguishedName {
    type Error = DnError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DistinguishedName> for String {
    fn from(value: DistinguishedName) -> Self {
        value.raw
    }
}

/// Splits on the delimiter, honoring backslash escapes. Escape sequences are
/// kept intact for the later per-component parse.
fn split_unescaped(input: &str, delimiter: char) -> std::result::Result<Vec<String>, DnError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push('\\');
            current.push(ch);
            escape = false;
        } else if ch == '\\' {
            escape = true;
        } else if ch == delimiter {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }

    if escape {
        return Err(DnError::UnterminatedEscape);
    }

    parts.push(current.trim().to_string());
    if parts.iter().any(String::is_empty) {
        return Err(DnError::Malformed(input.to_string()));
    }
    Ok(parts)
}

fn parse_component(component: &str) -> std::result::Result<Rdn, DnError> {
    let mut escape = false;
    let mut split_at = None;

    for (i, ch) in component.char_indices() {
        if escape {
            escape = false;
        } else if ch == '\\' {
            escape = true;
        } else if ch == '=' {
            split_at = Some(i);
            break;
        }
    }

    let at = split_at.ok_or_else(|| DnError::Malformed(component.to_string()))?;
    let attribute = component[..at].trim();
    let value = unescape(component[at + 1..].trim())?;

    if attribute.is_empty() || value.is_empty() {
        return Err(DnError::Malformed(component.to_string()));
    }

    Ok(Rdn {
        attribute: attribute.to_string(),
        value,
    })
}

fn unescape(value: &str) -> std::result::Result<String, DnError> {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            result.push(chars.next().ok_or(DnError::UnterminatedEscape)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (idx, ch) in value.chars().enumerate() {
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (idx == 0 && (ch == ' ' || ch == '#'))
            || (idx == last && ch == ' ');
        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

fn components_to_string(components: &[Rdn]) -> String {
    components
        .iter()
        .map(|rdn| format!("{}={}", rdn.attribute(), escape_value(rdn.value())))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_dn() {
        let dn = DistinguishedName::parse("cn=John Doe,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("cn"), Some("John Doe"));
        assert_eq!(dn.get("ou"), Some("People"));
        assert_eq!(dn.get("dc"), Some("example"));
        assert_eq!(dn.to_string(), "cn=John Doe,ou=People,dc=example,dc=com");
    }

    #[test]
    fn parse_dn_with_escaped_comma() {
        let dn = DistinguishedName::parse("cn=Smith\\, John,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("cn"), Some("Smith, John"));
        assert!(dn.as_str().starts_with("cn=Smith\\, John,ou=People"));
    }

    #[test]
    fn leading_component() {
        let dn = DistinguishedName::parse("uid=jdoe,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.leading().attribute(), "uid");
        assert_eq!(dn.leading().value(), "jdoe");
    }

    #[test]
    fn attribute_lookup_is_case_insensitive() {
        let dn = DistinguishedName::parse("CN=admins,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("cn"), Some("admins"));
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(DistinguishedName::parse("  "), Err(DnError::Empty));
    }

    #[test]
    fn rejects_trailing_delimiter() {
        let err = DistinguishedName::parse("cn=John,").unwrap_err();
        assert!(matches!(err, DnError::Malformed(_)));
    }

    #[test]
    fn rejects_component_without_value() {
        let err = DistinguishedName::parse("cn=,dc=example").unwrap_err();
        assert!(matches!(err, DnError::Malformed(_)));
    }

    #[test]
    fn rejects_unterminated_escape() {
        let err = DistinguishedName::parse("cn=John\\").unwrap_err();
        assert_eq!(err, DnError::UnterminatedEscape);
    }

    #[test]
    fn from_str_round_trip() {
        let dn: DistinguishedName = "ou=Groups,dc=example,dc=com".parse().unwrap();
        assert_eq!(String::from(dn), "ou=Groups,dc=example,dc=com");
    }
}
