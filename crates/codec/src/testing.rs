//! Shared fixtures for codec tests

use marksync_core::{timestamp, Forest, Node};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic forest with nested folders, `size` nodes in total
pub fn random_forest(seed: u64, size: usize) -> Forest {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut forest = Forest::default();
    let base = 1_600_000_000_000_000i64;

    for i in 0..size {
        let added = base + rng.gen_range(0..10_000_000_000i64);
        let modified = added + rng.gen_range(0..1_000_000_000i64);
        let dates = (
            timestamp::truncate_micros(chrono::DateTime::from_timestamp_micros(added).unwrap_or_default()),
            timestamp::truncate_micros(chrono::DateTime::from_timestamp_micros(modified).unwrap_or_default()),
        );
        let node = if rng.gen_bool(0.2) {
            Node::folder(format!("Folder {i}"))
        } else {
            Node::url(format!("Page {i} ✓"), format!("https://site{i}.example/path/{i}?q={i}"))
        }
        .with_dates(dates.0, dates.1);

        let root = if rng.gen_bool(0.5) {
            &mut forest.bookmark_bar
        } else {
            &mut forest.other
        };
        place(root, node, &mut rng, 0);
    }
    forest.renumber();
    forest
}

/// Drop `node` somewhere in `level`, descending into folders at random
fn place(level: &mut Vec<Node>, node: Node, rng: &mut ChaCha8Rng, depth: usize) {
    let folders: Vec<usize> = level
        .iter()
        .enumerate()
        .filter(|(_, n)| n.is_folder())
        .map(|(i, _)| i)
        .collect();
    if !folders.is_empty() && depth < 6 && rng.gen_bool(0.6) {
        let pick = folders[rng.gen_range(0..folders.len())];
        place(&mut level[pick].children, node, rng, depth + 1);
    } else {
        level.push(node);
    }
}

/// Compare content (kind, title, url, timestamps, order) ignoring ids
pub fn assert_same_shape(expected: &Forest, actual: &Forest) {
    fn compare(path: &str, a: &[Node], b: &[Node]) {
        assert_eq!(a.len(), b.len(), "child count differs under {path}");
        for (x, y) in a.iter().zip(b) {
            let here = format!("{path}/{}", x.title);
            assert_eq!(x.kind, y.kind, "kind differs at {here}");
            assert_eq!(x.title, y.title, "title differs at {here}");
            assert_eq!(x.url, y.url, "url differs at {here}");
            assert_eq!(x.date_added, y.date_added, "date_added differs at {here}");
            assert_eq!(x.date_modified, y.date_modified, "date_modified differs at {here}");
            compare(&here, &x.children, &y.children);
        }
    }
    compare("bookmark_bar", &expected.bookmark_bar, &actual.bookmark_bar);
    compare("other", &expected.other, &actual.other);
}
