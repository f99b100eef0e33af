// End-to-end diff/apply round-trips over a matrix of data shapes and
// engine options.

use jumpdiff::{apply_bytes, diff_bytes, DiffOptions, ScanMode};

fn noise(len: usize, mut seed: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        out.push((seed >> 24) as u8);
    }
    out
}

fn roundtrip_with(source: &[u8], dest: &[u8], opts: &DiffOptions) -> Vec<u8> {
    let patch = diff_bytes(source, dest, opts).expect("diff failed");
    let rebuilt = apply_bytes(source, &patch).expect("apply failed");
    assert_eq!(
        rebuilt,
        dest,
        "mismatch: source={} dest={} patch={}",
        source.len(),
        dest.len(),
        patch.len()
    );
    patch
}

fn roundtrip(source: &[u8], dest: &[u8]) -> Vec<u8> {
    roundtrip_with(source, dest, &DiffOptions::default())
}

fn option_matrix() -> Vec<DiffOptions> {
    vec![
        DiffOptions::default(),
        DiffOptions::default().better(),
        DiffOptions::default().lazy(),
        DiffOptions::default().lazier(),
        DiffOptions {
            scan: ScanMode::Incremental,
            ..Default::default()
        },
        DiffOptions {
            scan: ScanMode::Off,
            ..Default::default()
        },
        DiffOptions {
            backtrack: false,
            ..Default::default()
        },
        DiffOptions {
            match_max: 13,
            match_min: 1,
            ..Default::default()
        },
        DiffOptions {
            buf_src: 64 * 1024,
            buf_dst: 64 * 1024,
            block_size: 4096,
            ahead_max: 8 * 1024,
            ..Default::default()
        },
    ]
}

#[test]
fn matrix_small_edit() {
    let source = noise(48 * 1024, 100);
    let mut dest = source.clone();
    dest[20_000] ^= 0x42;
    for opts in option_matrix() {
        roundtrip_with(&source, &dest, &opts);
    }
}

#[test]
fn matrix_insert_delete_mix() {
    let source = noise(64 * 1024, 101);
    let mut dest = Vec::new();
    dest.extend_from_slice(&source[..10_000]);
    dest.extend_from_slice(b"wedge");
    dest.extend_from_slice(&source[10_000..30_000]);
    dest.extend_from_slice(&source[34_000..]);
    for opts in option_matrix() {
        roundtrip_with(&source, &dest, &opts);
    }
}

#[test]
fn matrix_block_swap() {
    let a = noise(24 * 1024, 102);
    let b = noise(24 * 1024, 103);
    let source: Vec<u8> = [a.clone(), b.clone()].concat();
    let dest: Vec<u8> = [b, a].concat();
    for opts in option_matrix() {
        roundtrip_with(&source, &dest, &opts);
    }
}

#[test]
fn matrix_degenerate_runs() {
    // Long zero runs stress the equal-tail hashing and gliding matches.
    let mut source = vec![0u8; 20_000];
    source.extend_from_slice(&noise(4000, 104));
    source.extend_from_slice(&vec![0xFFu8; 10_000]);
    let mut dest = vec![0u8; 18_500];
    dest.extend_from_slice(&noise(4000, 104));
    dest.extend_from_slice(&vec![0xFFu8; 11_000]);
    for opts in option_matrix() {
        roundtrip_with(&source, &dest, &opts);
    }
}

#[test]
fn tiny_inputs() {
    let cases: &[(&[u8], &[u8])] = &[
        (b"", b""),
        (b"", b"x"),
        (b"x", b""),
        (b"x", b"x"),
        (b"x", b"y"),
        (b"ABCDEF", b"ABZZEF"),
        (b"HELLO", b"XHELLO"),
        (b"ABABABAB", b"AB"),
        (b"AB", b"ABABABAB"),
        (b"aaaaaaaaaaaaaaaa", b"aaaaaaaa"),
    ];
    for (s, d) in cases {
        roundtrip(s, d);
    }
}

#[test]
fn grown_and_shrunk_tails() {
    let source = noise(32 * 1024, 105);
    // Grown tail.
    let mut grown = source.clone();
    grown.extend_from_slice(&noise(5000, 106));
    roundtrip(&source, &grown);
    // Shrunk tail.
    let shrunk = source[..20_000].to_vec();
    let patch = roundtrip(&source, &shrunk);
    // One EQL, the closing DEL of the unread tail, one terminator.
    assert!(patch.len() <= 16, "patch too large: {}", patch.len());
}

#[test]
fn stripped_prefix_uses_delete() {
    let source = noise(32 * 1024, 107);
    let dest = source[8192..].to_vec();
    let patch = roundtrip(&source, &dest);
    assert!(patch.len() <= 16, "patch too large: {}", patch.len());
    // Leading DEL: the first record must be ESC DEL.
    assert_eq!(patch[0], 0xA7);
    assert_eq!(patch[1], 0xA4);
}

#[test]
fn self_similar_source() {
    // A repeated page with small per-copy variations.
    let page = noise(4096, 108);
    let mut source = Vec::new();
    for i in 0..16u8 {
        let mut p = page.clone();
        p[7] = i;
        source.extend_from_slice(&p);
    }
    let mut dest = source.clone();
    dest[30_000] ^= 1;
    dest[40_000] ^= 1;
    roundtrip(&source, &dest);
}

#[test]
fn overloaded_index_still_roundtrips() {
    // A 1 MiB index budget over close to a MiB of data overloads the
    // table and grows the reliability range; correctness must hold.
    let source = noise(900 * 1024, 109);
    let mut dest = source.clone();
    for i in (0..dest.len()).step_by(100_000) {
        dest[i] = dest[i].wrapping_add(7);
    }
    let opts = DiffOptions {
        index_mb: 1,
        ..Default::default()
    };
    let patch = roundtrip_with(&source, &dest, &opts);
    assert!(patch.len() < dest.len() / 2);
}

#[test]
fn patch_of_similar_data_stays_small() {
    let source = noise(128 * 1024, 110);
    let mut dest = source.clone();
    dest[65_000] ^= 0xFF;
    let patch = roundtrip(&source, &dest);
    assert!(
        patch.len() < 300,
        "one-byte edit cost {} patch bytes",
        patch.len()
    );
}
