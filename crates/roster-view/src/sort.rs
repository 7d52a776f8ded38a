use std::cmp::Reverse;

use roster_types::{SortDirection, SortKey, SortPolicy, SortToggles, User};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Collation key approximating a locale-aware comparison: base letters
/// first (accents and case ignored), then accents, then the raw text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct NameKey {
    primary: String,
    secondary: String,
    raw: String,
}

impl NameKey {
    fn new(name: &str) -> Self {
        let decomposed: String = name.nfd().collect::<String>().to_lowercase();
        let primary = decomposed.chars().filter(|c| !is_combining_mark(*c)).collect();
        Self {
            primary,
            secondary: decomposed,
            raw: name.to_string(),
        }
    }
}

/// Sorts in place according to `policy`. Every pass is stable.
pub fn sort_users(users: &mut [&User], toggles: &SortToggles, policy: SortPolicy) {
    match policy {
        SortPolicy::Precedence => {
            let (key, direction) = toggles.active_key();
            sort_pass(users, key, direction);
        }
        SortPolicy::Combined => {
            // Lowest priority first so later passes dominate.
            sort_pass(users, SortKey::Name, toggles.name);
            if toggles.age.is_desc() {
                sort_pass(users, SortKey::Age, SortDirection::Desc);
            }
            if toggles.creation.is_desc() {
                sort_pass(users, SortKey::Creation, SortDirection::Desc);
            }
        }
    }
}

fn sort_pass(users: &mut [&User], key: SortKey, direction: SortDirection) {
    match (key, direction) {
        (SortKey::Creation, SortDirection::Asc) => users.sort_by_key(|u| u.created_at),
        (SortKey::Creation, SortDirection::Desc) => users.sort_by_key(|u| Reverse(u.created_at)),
        (SortKey::Age, SortDirection::Asc) => users.sort_by_key(|u| u.age),
        (SortKey::Age, SortDirection::Desc) => users.sort_by_key(|u| Reverse(u.age)),
        (SortKey::Name, SortDirection::Asc) => users.sort_by_cached_key(|u| NameKey::new(&u.name)),
        (SortKey::Name, SortDirection::Desc) => {
            users.sort_by_cached_key(|u| Reverse(NameKey::new(&u.name)))
        }
    }
}
