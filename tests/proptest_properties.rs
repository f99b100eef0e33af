// Property tests: the round-trip law and patch size bounds.

use jumpdiff::{apply_bytes, diff_bytes, DiffOptions};
use proptest::prelude::*;

fn diff(source: &[u8], dest: &[u8], opts: &DiffOptions) -> Vec<u8> {
    diff_bytes(source, dest, opts).expect("diff failed")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_diff_apply_roundtrip(
        source in proptest::collection::vec(any::<u8>(), 0..2048),
        dest in proptest::collection::vec(any::<u8>(), 0..2048),
    ) {
        let patch = diff(&source, &dest, &DiffOptions::default());
        let rebuilt = apply_bytes(&source, &patch).unwrap();
        prop_assert_eq!(rebuilt, dest);
    }

    #[test]
    fn prop_roundtrip_without_out_of_buffer_compares(
        source in proptest::collection::vec(any::<u8>(), 0..2048),
        dest in proptest::collection::vec(any::<u8>(), 0..2048),
    ) {
        let opts = DiffOptions::default().lazy();
        let patch = diff(&source, &dest, &opts);
        let rebuilt = apply_bytes(&source, &patch).unwrap();
        prop_assert_eq!(rebuilt, dest);
    }

    #[test]
    fn prop_mutated_copy_roundtrips(
        base in proptest::collection::vec(any::<u8>(), 256..8192),
        flips in proptest::collection::vec((any::<prop::sample::Index>(), any::<u8>()), 0..16),
    ) {
        let mut dest = base.clone();
        for (idx, val) in &flips {
            let i = idx.index(dest.len());
            dest[i] ^= *val;
        }
        let patch = diff(&base, &dest, &DiffOptions::default());
        let rebuilt = apply_bytes(&base, &patch).unwrap();
        prop_assert_eq!(rebuilt, dest);
    }

    #[test]
    fn prop_identical_inputs_compress_to_overhead(
        data in proptest::collection::vec(any::<u8>(), 16..8192),
    ) {
        let patch = diff(&data, &data, &DiffOptions::default());
        // One EQL record plus terminator.
        prop_assert!(patch.len() <= 7, "patch {} bytes", patch.len());
    }

    #[test]
    fn prop_patch_growth_is_bounded(
        source in proptest::collection::vec(any::<u8>(), 0..2048),
        dest in proptest::collection::vec(any::<u8>(), 0..2048),
    ) {
        // Worst case alternates one-byte EQL records with one-byte MOD
        // records, costing a few control bytes per data byte.
        let patch = diff(&source, &dest, &DiffOptions::default());
        prop_assert!(patch.len() <= 4 * dest.len() + 64);
    }
}
