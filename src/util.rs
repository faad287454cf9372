//! Small collection helpers used by suites.

use std::collections::HashMap;
use std::hash::Hash;

pub fn contains<T: PartialEq>(items: &[T], item: &T) -> bool {
    items.iter().any(|i| i == item)
}

/// Same elements with the same multiplicities, in any order.
pub fn same_elements<T: Eq + Hash>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut counts: HashMap<&T, isize> = HashMap::new();
    for item in a {
        *counts.entry(item).or_default() += 1;
    }
    for item in b {
        *counts.entry(item).or_default() -= 1;
    }
    counts.values().all(|c| *c == 0)
}

/// Remove the first occurrence of `item`; false if it was absent.
pub fn remove_first<T: PartialEq>(items: &mut Vec<T>, item: &T) -> bool {
    match items.iter().position(|i| i == item) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}
