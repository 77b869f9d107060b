//! Property tests for the indentation tracker: doubling the
//! indentation unit must produce the same level structure, and
//! compilation must be deterministic.

use althtml::indent;
use althtml::scanner;
use proptest::prelude::*;

/// Build a small nested source of `depth` levels using `unit` spaces
/// per level, one tag per level.
fn nested_source(unit: usize, depth: usize) -> String {
    let mut out = String::new();
    for level in 0..depth {
        if level > 0 {
            out.push('\n');
        }
        out.push_str(&" ".repeat(unit * level));
        out.push_str(&format!("tag{}", level));
    }
    out
}

proptest! {
    #[test]
    fn doubling_the_unit_preserves_levels(unit in 1usize..6, depth in 1usize..8) {
        let narrow = nested_source(unit, depth);
        let wide = nested_source(unit * 2, depth);

        let narrow_levels: Vec<usize> = indent::track(&scanner::scan(&narrow))
            .unwrap()
            .into_iter()
            .map(|l| l.level)
            .collect();
        let wide_levels: Vec<usize> = indent::track(&scanner::scan(&wide))
            .unwrap()
            .into_iter()
            .map(|l| l.level)
            .collect();

        prop_assert_eq!(narrow_levels, wide_levels);
    }

    #[test]
    fn compilation_is_deterministic_across_runs(unit in 1usize..4, depth in 1usize..5) {
        let source = nested_source(unit, depth);
        let a = althtml::compile(&source, "x.ah");
        let b = althtml::compile(&source, "x.ah");
        prop_assert_eq!(a, b);
    }
}
