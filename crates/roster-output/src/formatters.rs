use roster_types::*;
use serde::Serialize;

pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

pub fn format_view(outcome: &ViewOutcome, params: &ViewParams, name_width: usize) -> String {
    let mut lines = vec![format!(
        "Results: {} / Total users: {}",
        outcome.filtered_count, outcome.total_count
    )];

    if !params.search_term.is_empty() {
        lines.push(format!("Search: \"{}\"", params.search_term));
    }

    if outcome.page_items.is_empty() {
        lines.push(String::new());
        lines.push("No users".to_string());
    } else {
        lines.push(String::new());
        for user in &outcome.page_items {
            lines.push(format_user_line(user, name_width));
        }
    }

    lines.push(String::new());
    lines.push(format_page_footer(outcome, params));
    lines.join("\n")
}

pub fn format_user_line(user: &User, name_width: usize) -> String {
    format!(
        "  #{:<4} {} - {} - {} years",
        user.id,
        truncate_name(&user.name, name_width),
        user.email,
        user.age
    )
}

fn format_page_footer(outcome: &ViewOutcome, params: &ViewParams) -> String {
    if outcome.total_pages == 0 {
        return format!("Page 0 of 0 ({} per page)", params.page_size);
    }
    let mut footer = format!(
        "Page {} of {} ({} per page)",
        params.current_page, outcome.total_pages, params.page_size
    );
    if params.current_page == 0 || params.current_page > outcome.total_pages {
        footer.push_str(" [out of range]");
    }
    footer
}

/// Long names are cut to `width` characters with a trailing ellipsis.
pub fn truncate_name(name: &str, width: usize) -> String {
    if width == 0 || name.chars().count() <= width {
        return name.to_string();
    }
    let head: String = name.chars().take(width).collect();
    format!("{}...", head)
}

pub fn format_sort(toggles: &SortToggles, policy: SortPolicy) -> String {
    let name = match toggles.name {
        SortDirection::Asc => "name A-Z",
        SortDirection::Desc => "name Z-A",
    };
    let age = match toggles.age {
        SortDirection::Asc => "age low-high",
        SortDirection::Desc => "age high-low",
    };
    let creation = match toggles.creation {
        SortDirection::Asc => "creation default",
        SortDirection::Desc => "newest first",
    };

    match policy {
        SortPolicy::Precedence => {
            let active = match toggles.active_key().0 {
                SortKey::Creation => creation,
                SortKey::Age => age,
                SortKey::Name => name,
            };
            format!("Sort: {} (toggles: {}, {}, {})", active, creation, age, name)
        }
        SortPolicy::Combined => format!("Sort: {}, {}, {}", creation, age, name),
    }
}

pub fn format_user(user: &User) -> String {
    [
        format!("#{} {}", user.id, user.name),
        format!("  email:   {}", user.email),
        format!("  age:     {}", user.age),
        format!("  created: {}", user.created_at.to_rfc3339()),
    ]
    .join("\n")
}

pub fn format_stats(stats: &StoreStats) -> String {
    format!(
        "Store: {}\n  {} / {} ({} records)",
        stats.path,
        format_size(stats.current_bytes),
        format_size(stats.max_bytes),
        stats.records
    )
}

pub fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_size(size: u64) -> String {
    if size < 1024 {
        format!("{}B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1}KB", size as f64 / 1024.0)
    } else {
        format!("{:.1}MB", size as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn user(id: u64, name: &str) -> User {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        User::from_new(id, NewUser::new(name, "x@mail.com", 30), created_at)
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Ana", 10), "Ana");
        assert_eq!(truncate_name("Maximiliano", 10), "Maximilian...");
        assert_eq!(truncate_name("Ñañañañañaña", 4), "Ñaña...");
        assert_eq!(truncate_name("Maximiliano", 0), "Maximiliano");
    }

    #[test]
    fn test_format_view_lists_page() {
        let outcome = ViewOutcome {
            filtered_count: 2,
            total_count: 5,
            page_items: vec![user(1, "Ana"), user(4, "Bartholomew Jr")],
            total_pages: 1,
        };
        let params = ViewParams::with_page_size(10);

        let text = format_view(&outcome, &params, 10);
        assert!(text.starts_with("Results: 2 / Total users: 5"));
        assert!(text.contains("Ana - x@mail.com - 30 years"));
        assert!(text.contains("Bartholome... - x@mail.com"));
        assert!(text.ends_with("Page 1 of 1 (10 per page)"));
    }

    #[test]
    fn test_format_view_marks_out_of_range() {
        let outcome = ViewOutcome {
            filtered_count: 3,
            total_count: 3,
            page_items: vec![],
            total_pages: 1,
        };
        let mut params = ViewParams::default();
        params.current_page = 2;

        let text = format_view(&outcome, &params, 10);
        assert!(text.contains("No users"));
        assert!(text.ends_with("[out of range]"));
    }

    #[test]
    fn test_format_sort_names_active_key() {
        let mut toggles = SortToggles::default();
        assert!(format_sort(&toggles, SortPolicy::Precedence).starts_with("Sort: name A-Z"));

        toggles.toggle_age();
        toggles.toggle_creation();
        assert!(format_sort(&toggles, SortPolicy::Precedence).starts_with("Sort: newest first"));
        assert_eq!(
            format_sort(&toggles, SortPolicy::Combined),
            "Sort: newest first, age high-low, name A-Z"
        );
    }
}
