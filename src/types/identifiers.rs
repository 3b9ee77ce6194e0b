use crate::d1_string_type;

d1_string_type!(
    /// A persistent identifier (PID) or series identifier of an object.
    ///
    /// DataONE places almost no restrictions on identifiers. They commonly
    /// contain `:`, `/` and even spaces, so they must always be
    /// percent-encoded as a single path segment when placed in a URL.
    Identifier
);

d1_string_type!(
    /// The identifier of a node in the network, e.g. `urn:node:KNB`.
    NodeReference
);

d1_string_type!(
    /// A principal: an X.509 distinguished name, an ORCID, a group or one of
    /// the symbolic subjects such as `public`.
    Subject
);

d1_string_type!(
    /// The identifier of an object format, e.g. `text/csv` or
    /// `eml://ecoinformatics.org/eml-2.1.1`.
    ObjectFormatIdentifier
);

/// Symbolic subject standing for every caller, authenticated or not.
pub const PUBLIC_SUBJECT: &str = "public";

/// Symbolic subject standing for every authenticated caller.
pub const AUTHENTICATED_USER_SUBJECT: &str = "authenticatedUser";

impl Subject {
    pub fn public() -> Self {
        Subject::new(PUBLIC_SUBJECT)
    }

    pub fn is_public(&self) -> bool {
        self.as_str() == PUBLIC_SUBJECT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_from_str() {
        let pid: Identifier = "doi:10.5063/F1TQ5ZVS".parse().unwrap();
        assert_eq!(pid.as_str(), "doi:10.5063/F1TQ5ZVS");
    }

    #[test]
    fn test_public_subject() {
        assert!(Subject::public().is_public());
        assert!(!Subject::from("CN=Jane Doe,O=Example,C=US,DC=cilogon,DC=org").is_public());
    }

    #[test]
    fn test_distinct_types_compare_by_value() {
        let a = NodeReference::from("urn:node:KNB");
        let b = NodeReference::from("urn:node:KNB".to_string());
        assert_eq!(a, b);
    }
}
