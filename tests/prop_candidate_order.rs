// Property: candidate lists are non-empty, strictly ordered by priority,
// free of duplicates, and a pure function of the classified path. For
// compressed-only keys the first candidate always expects compression; a
// key already ending in `.gz` yields exactly one candidate, served as stored.

use proptest::prelude::*;
use tilegate::key_resolver::is_compressed_only;
use tilegate::{ClassifiedPath, KeyResolver, PathKind};

fn any_key() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-zA-Z0-9_-]{1,8}", 0..4),
        "[a-zA-Z0-9_-]{1,10}",
        prop::sample::select(vec![
            "", ".prbm", ".json", ".png", ".html", ".js", ".gz", ".prbm.gz", ".PRBM",
        ]),
    )
        .prop_map(|(dirs, stem, ext)| {
            let mut key = dirs.join("/");
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(&stem);
            key.push_str(ext);
            key
        })
}

fn compressed_only_key() -> impl Strategy<Value = String> {
    (
        "[a-z0-9_-]{1,8}",
        prop::sample::select(vec!["x1/z-3.prbm", "settings.json", "textures.json"]),
    )
        .prop_map(|(dir, file)| format!("{}/{}", dir, file))
}

fn any_kind() -> impl Strategy<Value = PathKind> {
    prop::sample::select(vec![PathKind::Tile, PathKind::Generic])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_candidates_are_deterministic(key in any_key(), kind in any_kind()) {
        let classified = ClassifiedPath::new(kind, key);
        let first = KeyResolver::new().resolve(&classified);
        let second = KeyResolver::new().resolve(&classified.clone());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_candidates_ordered_and_distinct(key in any_key(), kind in any_kind()) {
        let candidates = KeyResolver::new().resolve(&ClassifiedPath::new(kind, key.clone()));

        prop_assert!(!candidates.is_empty());
        for (index, candidate) in candidates.iter().enumerate() {
            prop_assert_eq!(candidate.priority as usize, index);
            // Every candidate represents the same logical resource
            prop_assert_eq!(candidate.logical_key(), key.as_str());
        }
        if candidates.len() == 2 {
            prop_assert_ne!(&candidates[0].key, &candidates[1].key);
            prop_assert_ne!(candidates[0].expect_compressed, candidates[1].expect_compressed);
        }
    }

    #[test]
    fn prop_compressed_only_probes_gzip_first(key in compressed_only_key(), kind in any_kind()) {
        prop_assert!(is_compressed_only(&key));
        let candidates = KeyResolver::new().resolve(&ClassifiedPath::new(kind, key.clone()));

        prop_assert_eq!(candidates.len(), 2);
        prop_assert!(candidates[0].expect_compressed);
        prop_assert_eq!(&candidates[0].key, &format!("{}.gz", key));
        prop_assert!(!candidates[1].expect_compressed);
        prop_assert_eq!(&candidates[1].key, &key);
    }

    #[test]
    fn prop_gz_suffix_never_doubled(key in any_key(), kind in any_kind()) {
        let key = format!("{}.gz", key.trim_end_matches(".gz"));
        let candidates = KeyResolver::new().resolve(&ClassifiedPath::new(kind, key.clone()));

        prop_assert_eq!(candidates.len(), 1);
        prop_assert_eq!(&candidates[0].key, &key);
        prop_assert!(!candidates[0].expect_compressed);
        prop_assert!(candidates.iter().all(|c| !c.key.ends_with(".gz.gz")));
    }
}
