use std::path::PathBuf;

use dynpages::{Base, RenderError, Resolver, ServerConfig};
use proptest::prelude::*;

// Resolution is lexical, so the root does not need to exist for the
// containment property to be exercised.
fn resolver() -> Resolver {
    Resolver::new(PathBuf::from("/srv/webroot"), &ServerConfig::default())
}

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-z][a-z0-9]{0,7}".prop_map(|s| s),
        2 => Just("..".to_string()),
        1 => Just(".".to_string()),
    ]
}

proptest! {
    /// For any reference built from plain names and traversal segments,
    /// resolution either denies or yields a descendant of the root.
    #[test]
    fn resolution_never_escapes_root(segments in prop::collection::vec(segment(), 1..12)) {
        let reference = segments.join("/");
        match resolver().resolve(&reference, Base::Root) {
            Ok(path) => prop_assert!(path.starts_with("/srv/webroot")),
            Err(RenderError::ResolutionDenied(_)) => {}
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Any reference with more `..` segments than names up front must be
    /// denied outright.
    #[test]
    fn leading_traversal_is_denied(extra in 1usize..6, name in "[a-z]{1,8}") {
        let reference = format!("{}{name}", "../".repeat(extra));
        prop_assert!(matches!(
            resolver().resolve(&reference, Base::Root),
            Err(RenderError::ResolutionDenied(_))
        ));
    }

    /// Hidden and underscore-prefixed segments are permanently unservable
    /// wherever they appear.
    #[test]
    fn hidden_segments_are_denied(
        prefix in prop_oneof![Just('.'), Just('_')],
        name in "[a-z]{1,8}",
        tail in "[a-z]{1,8}",
    ) {
        let reference = format!("{prefix}{name}/{tail}");
        prop_assert!(resolver().resolve(&reference, Base::Root).is_err());
    }
}
