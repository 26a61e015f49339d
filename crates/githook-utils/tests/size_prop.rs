//! Property tests for size formatting.

use githook_utils::format_size;
use proptest::prelude::*;

fn unit_rank(s: &str) -> u8 {
    if s.ends_with(" GB") {
        3
    } else if s.ends_with(" MB") {
        2
    } else if s.ends_with(" KB") {
        1
    } else {
        0
    }
}

proptest! {
    #[test]
    fn below_one_kilobyte_is_exact(n in 0u64..1024) {
        prop_assert_eq!(format_size(n), format!("{} B", n));
    }

    #[test]
    fn unit_never_shrinks_as_size_grows(a in any::<u64>(), b in any::<u64>()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(unit_rank(&format_size(lo)) <= unit_rank(&format_size(hi)));
    }

    #[test]
    fn scaled_values_have_two_decimals(n in 1024u64..u64::MAX) {
        let s = format_size(n);
        let number = s.split(' ').next().unwrap();
        let decimals = number.split('.').nth(1).unwrap();
        prop_assert_eq!(decimals.len(), 2);
    }
}
