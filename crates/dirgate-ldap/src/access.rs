//! Group allow-list evaluation.

/// Returns true when any of the user's groups appears in the allow-list.
///
/// Scans the user's groups in order, then the allow-list in order, and
/// returns on the first exact-equality match. Either side empty yields
/// false. Stateless, safe for unlimited concurrent calls.
#[must_use]
pub fn member_of_any<G, A>(groups: &[G], allowed: &[A]) -> bool
where
    G: AsRef<str>,
    A: AsRef<str>,
{
    groups
        .iter()
        .any(|group| allowed.iter().any(|candidate| group.as_ref() == candidate.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_sets_do_not_match() {
        assert!(!member_of_any(&["sales"], &["admin", "eng"]));
        assert!(!member_of_any(&["a", "b", "c"], &["d", "e"]));
    }

    #[test]
    fn shared_element_matches_regardless_of_order() {
        assert!(member_of_any(&["eng", "ops"], &["admin", "eng"]));
        assert!(member_of_any(&["ops", "eng"], &["eng", "admin"]));
        assert!(member_of_any(&["eng"], &["eng"]));
    }

    #[test]
    fn empty_inputs_never_match() {
        let none: [&str; 0] = [];
        assert!(!member_of_any(&none, &["eng"]));
        assert!(!member_of_any(&["eng"], &none));
        assert!(!member_of_any(&none, &none));
    }

    #[test]
    fn comparison_is_exact() {
        assert!(!member_of_any(&["Eng"], &["eng"]));
        assert!(!member_of_any(&["eng "], &["eng"]));
    }
}
