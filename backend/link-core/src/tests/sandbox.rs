// Unit tests for the path sandbox. Pure logic, no filesystem access;
// listing behavior is covered by the router tests.

use crate::sandbox::PathResolver;

use std::path::Path;

fn resolver() -> PathResolver {
    PathResolver::new("/srv/game")
}

#[test]
fn given_relative_payload_when_resolved_then_lands_inside_root() {
    let resolver = resolver();

    let resolved = resolver.resolve("maps/overworld");

    assert_eq!(resolved, Path::new("/srv/game/maps/overworld"));
    assert!(resolver.is_contained(&resolved));
}

/// **VALUE**: The round-trip the panel depends on: `to_relative` followed
/// by re-joining must reconstruct the resolved path exactly, or listing
/// entries would point at files that cannot be fetched back.
#[test]
fn given_contained_path_when_relativized_then_rejoining_reconstructs_it() {
    let resolver = resolver();

    let resolved = resolver.resolve("maps/overworld/region");
    let relative = resolver.to_relative(&resolved).expect("contained");

    assert_eq!(relative, "maps/overworld/region");
    assert_eq!(resolver.resolve(&relative), resolved);
}

#[test]
fn given_parent_escape_when_resolved_then_not_contained() {
    let resolver = resolver();

    let resolved = resolver.resolve("../../etc");

    assert_eq!(resolved, Path::new("/etc"));
    assert!(!resolver.is_contained(&resolved));
    assert!(resolver.to_relative(&resolved).is_none());
}

#[test]
fn given_interior_dotdot_when_resolved_then_folds_before_containment() {
    let resolver = resolver();

    // Stays inside: the `..` folds onto `maps` before any check runs.
    let inside = resolver.resolve("maps/../plugins");
    assert_eq!(inside, Path::new("/srv/game/plugins"));
    assert!(resolver.is_contained(&inside));

    // Climbs out through the root and back into a sibling: rejected.
    let outside = resolver.resolve("../game-evil/secrets");
    assert!(!resolver.is_contained(&outside));
}

#[test]
fn given_absolute_payload_when_resolved_then_replaces_root_and_is_rejected() {
    let resolver = resolver();

    let resolved = resolver.resolve("/etc/passwd");

    assert_eq!(resolved, Path::new("/etc/passwd"));
    assert!(!resolver.is_contained(&resolved));
}

/// **VALUE**: Containment is a prefix of path *components*, not of
/// characters. A string-prefix check would let `/srv/game-evil` pass for
/// `/srv/game`.
#[test]
fn given_sibling_with_shared_prefix_when_checked_then_not_contained() {
    let resolver = resolver();

    assert!(!resolver.is_contained(Path::new("/srv/game-evil/world")));
    assert!(!resolver.is_contained(Path::new("/srv/gamer")));
    assert!(resolver.is_contained(Path::new("/srv/game/world")));
}

#[test]
fn given_root_itself_when_checked_then_contained_with_empty_relative() {
    let resolver = resolver();

    assert!(resolver.is_contained(Path::new("/srv/game")));
    assert_eq!(
        resolver.to_relative(Path::new("/srv/game")).as_deref(),
        Some("")
    );
}

#[test]
fn given_curdir_segments_when_resolved_then_dropped() {
    let resolver = resolver();

    let resolved = resolver.resolve("./maps/./overworld");

    assert_eq!(resolved, Path::new("/srv/game/maps/overworld"));
}

#[test]
fn given_dotdot_beyond_filesystem_root_when_normalized_then_stops_at_top() {
    let resolver = PathResolver::new("/srv");

    let resolved = resolver.resolve("../../../../etc");

    assert_eq!(resolved, Path::new("/etc"));
    assert!(!resolver.is_contained(&resolved));
}
