//! Name-path resolution over the linked tree.
//!
//! Names are not unique inside a folder, so every intermediate segment may
//! match several folders. Resolution carries the whole set of matches
//! forward and unions the results, behaving like a glob over ambiguous tiers.

use grid_types::InventoryId;

use crate::state::InventoryState;

/// Separator used by [`split_path`].
pub const PATH_SEPARATOR: char = '/';

/// Resolve `segments` starting at the root. An empty path yields the root.
pub(crate) fn resolve<S: AsRef<str>>(state: &InventoryState, segments: &[S]) -> Vec<InventoryId> {
    let root = state.root();
    let Some((last, intermediate)) = segments.split_last() else {
        return if state.contains(&root) { vec![root] } else { Vec::new() };
    };

    let mut frontier = vec![root];
    for segment in intermediate {
        let segment = segment.as_ref();
        frontier = frontier
            .iter()
            .flat_map(|folder| state.children(folder))
            .copied()
            .filter(|child| {
                state
                    .get(child)
                    .is_some_and(|node| node.is_folder() && node.name() == segment)
            })
            .collect();
        if frontier.is_empty() {
            return Vec::new();
        }
    }

    let last = last.as_ref();
    frontier
        .iter()
        .flat_map(|folder| state.children(folder))
        .copied()
        .filter(|child| state.get(child).is_some_and(|node| node.name() == last))
        .collect()
}

/// Split a `/`-separated path into segments, ignoring empty segments.
/// `""` and `"/"` both produce the empty path.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Origin;
    use grid_types::{FolderRecord, InventoryRecord, ItemRecord};

    fn tree() -> (InventoryState, InventoryId, Vec<InventoryId>) {
        let owner = InventoryId::random();
        let root = InventoryId::random();
        let mut state = InventoryState::new(owner, root);
        let folder = |id, parent, name: &str| -> InventoryRecord {
            FolderRecord::new(id).with_parent(parent).with_owner(owner).with_name(name).into()
        };
        let item = |id, parent, name: &str| -> InventoryRecord {
            ItemRecord::new(id).with_parent(parent).with_owner(owner).with_name(name).into()
        };

        let ids: Vec<InventoryId> = (0..6).map(|_| InventoryId::random()).collect();
        let records = [
            folder(root, InventoryId::nil(), "My Inventory"),
            folder(ids[0], root, "Objects"),
            folder(ids[1], ids[0], "Trees"),
            folder(ids[2], ids[0], "Trees"),
            item(ids[3], ids[1], "Maple"),
            item(ids[4], ids[2], "Maple"),
            item(ids[5], ids[0], "Trees"),
        ];
        for record in records {
            state.admit(record, Origin::Local);
        }
        (state, root, ids)
    }

    #[test]
    fn empty_path_is_root() {
        let (state, root, _) = tree();
        let empty: [&str; 0] = [];
        assert_eq!(resolve(&state, &empty), vec![root]);
    }

    #[test]
    fn intermediate_segments_only_match_folders() {
        let (state, _, ids) = tree();
        let found = resolve(&state, &["Objects", "Trees", "Maple"]);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&ids[3]));
        assert!(found.contains(&ids[4]));
    }

    #[test]
    fn final_segment_matches_items_and_folders() {
        let (state, _, ids) = tree();
        let found = resolve(&state, &["Objects", "Trees"]);
        assert_eq!(found, vec![ids[1], ids[2], ids[5]]);
    }

    #[test]
    fn missing_segment_yields_nothing() {
        let (state, _, _) = tree();
        assert!(resolve(&state, &["Objects", "Shrubs", "Maple"]).is_empty());
        assert!(resolve(&state, &["Nothing"]).is_empty());
    }

    #[test]
    fn names_are_case_sensitive() {
        let (state, _, _) = tree();
        assert!(resolve(&state, &["objects"]).is_empty());
    }

    #[test]
    fn split_ignores_empty_segments() {
        assert!(split_path("").is_empty());
        assert!(split_path("/").is_empty());
        assert_eq!(split_path("/Objects//Trees/"), vec!["Objects", "Trees"]);
    }
}
