use roster_types::User;

/// Case-insensitive substring match against name, email and age.
/// `needle` must already be lowercased; an empty needle matches everything.
pub fn matches_search(user: &User, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    contains_folded(&user.name, needle)
        || contains_folded(&user.email, needle)
        || user.age.to_string().contains(needle)
}

fn contains_folded(field: &str, needle: &str) -> bool {
    !field.is_empty() && field.to_lowercase().contains(needle)
}
