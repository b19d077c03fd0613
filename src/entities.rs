//! The five predefined XML entities (XML 1.0 §4.6).
//!
//! Numeric character references are handled directly by the scanner; this
//! table only covers the named entities every XML processor must recognize
//! without a DTD.

/// Returns the replacement text for one of the five predefined entities, or
/// `None` if `name` is not one of them.
pub fn predefined_entity(name: &str) -> Option<&'static str> {
    match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recognizes_all_five() {
        assert_eq!(predefined_entity("amp"), Some("&"));
        assert_eq!(predefined_entity("lt"), Some("<"));
        assert_eq!(predefined_entity("gt"), Some(">"));
        assert_eq!(predefined_entity("apos"), Some("'"));
        assert_eq!(predefined_entity("quot"), Some("\""));
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(predefined_entity("nbsp"), None);
        assert_eq!(predefined_entity(""), None);
    }
}
