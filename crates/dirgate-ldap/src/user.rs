//! Resolved user entry representation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::dn::DistinguishedName;

/// Key under which the resolved DN appears in the flattened attribute map.
pub const DN_ATTRIBUTE: &str = "dn";

/// A user entry resolved during authentication.
///
/// Carries the entry's distinguished name plus the first value of each
/// configured attribute present on the entry. Produced transiently per
/// authentication call; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    dn: DistinguishedName,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

impl UserRecord {
    pub(crate) fn new(dn: DistinguishedName, attributes: HashMap<String, String>) -> Self {
        Self { dn, attributes }
    }

    /// Distinguished name the user was resolved to.
    #[must_use]
    pub fn dn(&self) -> &DistinguishedName {
        &self.dn
    }

    /// First value of the attribute, when the entry carried one.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute).map(String::as_str)
    }

    /// The resolved attributes, without the DN.
    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Flattens the record into a single attribute map that always includes
    /// the DN under the `dn` key.
    ///
    /// This is the shape callers log when diagnosing authentication
    /// failures.
    #[must_use]
    pub fn attribute_map(&self) -> HashMap<String, String> {
        let mut map = self.attributes.clone();
        map.insert(DN_ATTRIBUTE.to_string(), self.dn.to_string());
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> UserRecord {
        let dn = DistinguishedName::parse("uid=jdoe,ou=People,dc=example,dc=com").unwrap();
        let mut attributes = HashMap::new();
        attributes.insert("mail".to_string(), "jdoe@example.com".to_string());
        UserRecord::new(dn, attributes)
    }

    #[test]
    fn accessors() {
        let record = sample_record();
        assert_eq!(record.dn().as_str(), "uid=jdoe,ou=People,dc=example,dc=com");
        assert_eq!(record.get("mail"), Some("jdoe@example.com"));
        assert_eq!(record.get("givenName"), None);
    }

    #[test]
    fn attribute_map_always_includes_dn() {
        let map = sample_record().attribute_map();
        assert_eq!(
            map.get(DN_ATTRIBUTE).map(String::as_str),
            Some("uid=jdoe,ou=People,dc=example,dc=com")
        );
        assert_eq!(map.get("mail").map(String::as_str), Some("jdoe@example.com"));
    }

    #[test]
    fn serializes_with_dn_and_attributes() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["dn"], "uid=jdoe,ou=People,dc=example,dc=com");
        assert_eq!(json["attributes"]["mail"], "jdoe@example.com");
    }
}
