//! Collision-free names within a scope.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Placeholder used when an empty name is requested.
///
/// An empty name is reserved by the model API to mean "the current system".
pub const EMPTY_NAME_PLACEHOLDER: &str = "noName";

/// A set of names that are already taken.
pub trait NameScope {
    fn contains_name(&self, name: &str) -> bool;
}

impl NameScope for HashSet<String> {
    fn contains_name(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl NameScope for BTreeSet<String> {
    fn contains_name(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl<V> NameScope for HashMap<String, V> {
    fn contains_name(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl<V> NameScope for BTreeMap<String, V> {
    fn contains_name(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl NameScope for [&str] {
    fn contains_name(&self, name: &str) -> bool {
        self.iter().any(|n| *n == name)
    }
}

impl NameScope for Vec<String> {
    fn contains_name(&self, name: &str) -> bool {
        self.iter().any(|n| n == name)
    }
}

/// Replace every character that is not an ASCII letter, digit or `_` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Produce a name based on `name` that is not present in `scope`.
///
/// The name is sanitized first (see [`sanitize_name`]). While the candidate
/// is taken, an existing `_<digit>...` suffix is stripped
/// and `_1`, `_2`, ... is appended. Only a digit directly after the last
/// underscore marks a suffix, so `"X_"` becomes `"X__1"`.
pub fn find_unique_name<S: NameScope + ?Sized>(scope: &S, name: &str) -> String {
    let mut candidate = if name.is_empty() {
        EMPTY_NAME_PLACEHOLDER.to_string()
    } else {
        sanitize_name(name)
    };

    let mut counter: usize = 1;
    while scope.contains_name(&candidate) {
        strip_numeric_suffix(&mut candidate);
        candidate.push('_');
        candidate.push_str(&counter.to_string());
        counter += 1;
    }
    candidate
}

fn strip_numeric_suffix(name: &mut String) {
    if let Some(pos) = name.rfind('_') {
        let starts_with_digit = name[pos + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());
        if starts_with_digit {
            name.truncate(pos);
        }
    }
}
