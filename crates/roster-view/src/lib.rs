//! Filter, sort and paginate a snapshot of user records.
//!
//! Everything here is a pure function of its inputs. The record slice is only
//! borrowed; the page items in the outcome are clones.

mod filter;
mod paginate;
mod sort;

pub use filter::matches_search;
pub use paginate::{page_range, total_pages};
pub use sort::sort_users;

use fastrace::trace;
use roster_types::{SortPolicy, User, ViewOutcome, ViewParams};

#[trace]
pub fn derive_view(records: &[User], params: &ViewParams, policy: SortPolicy) -> ViewOutcome {
    let needle = params.search_term.to_lowercase();
    let mut matched: Vec<&User> = records
        .iter()
        .filter(|user| matches_search(user, &needle))
        .collect();

    sort_users(&mut matched, &params.sort, policy);

    let filtered_count = matched.len();
    let range = page_range(filtered_count, params.current_page, params.page_size);

    ViewOutcome {
        filtered_count,
        total_count: records.len(),
        page_items: matched[range].iter().map(|user| (*user).clone()).collect(),
        total_pages: total_pages(filtered_count, params.page_size),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use roster_types::{NewUser, SortToggles};

    use super::*;

    fn t(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs)
    }

    fn user(id: u64, name: &str, email: &str, age: u32, created_secs: i64) -> User {
        User::from_new(id, NewUser::new(name, email, age), t(created_secs))
    }

    fn ana_beto_carla() -> Vec<User> {
        vec![
            user(1, "Ana", "ana@mail.com", 25, 1),
            user(2, "Beto", "beto@mail.com", 30, 2),
            user(3, "Carla", "carla@mail.com", 20, 3),
        ]
    }

    fn names(outcome: &ViewOutcome) -> Vec<&str> {
        outcome.page_items.iter().map(|u| u.name.as_str()).collect()
    }

    fn params(page_size: usize) -> ViewParams {
        ViewParams::with_page_size(page_size)
    }

    fn numbered(count: usize) -> Vec<User> {
        (0..count)
            .map(|i| user(i as u64 + 1, &format!("User{:02}", i), "u@mail.com", 40, i as i64))
            .collect()
    }

    #[test]
    fn test_default_view_sorts_by_name() {
        let mut records = ana_beto_carla();
        records.reverse();

        let outcome = derive_view(&records, &params(10), SortPolicy::Precedence);
        assert_eq!(names(&outcome), vec!["Ana", "Beto", "Carla"]);
        assert_eq!(outcome.filtered_count, 3);
        assert_eq!(outcome.total_count, 3);
        assert_eq!(outcome.total_pages, 1);
    }

    #[test]
    fn test_age_desc_scenario() {
        let records = ana_beto_carla();
        let mut p = params(10);
        p.sort.toggle_age();

        let outcome = derive_view(&records, &p, SortPolicy::Precedence);
        assert_eq!(names(&outcome), vec!["Beto", "Ana", "Carla"]);
    }

    #[test]
    fn test_search_by_age() {
        let records = ana_beto_carla();
        let mut p = params(10);
        p.search_term = "20".to_string();

        let outcome = derive_view(&records, &p, SortPolicy::Precedence);
        assert_eq!(names(&outcome), vec!["Carla"]);
        assert_eq!(outcome.filtered_count, 1);
        assert_eq!(outcome.total_count, 3);
    }

    #[test]
    fn test_search_is_case_insensitive_over_name_and_email() {
        let records = vec![
            user(1, "Ana", "ana@mail.com", 25, 1),
            user(2, "Beto", "BETO@Work.org", 30, 2),
            user(3, "Carla", "carla@mail.com", 20, 3),
        ];
        let mut p = params(10);

        p.search_term = "WORK".to_string();
        assert_eq!(names(&derive_view(&records, &p, SortPolicy::Precedence)), vec!["Beto"]);

        p.search_term = "aRl".to_string();
        assert_eq!(names(&derive_view(&records, &p, SortPolicy::Precedence)), vec!["Carla"]);

        p.search_term = "mail".to_string();
        assert_eq!(
            names(&derive_view(&records, &p, SortPolicy::Precedence)),
            vec!["Ana", "Carla"]
        );
    }

    #[test]
    fn test_filter_matches_exactly_the_containing_records() {
        let records = vec![
            user(1, "Ana", "ana@mail.com", 25, 1),
            user(2, "", "", 0, 2),
            user(3, "Diego", "d@x.io", 52, 3),
            user(4, "Elena", "elena@mail.com", 125, 4),
        ];
        let terms = ["", "a", "5", "25", "mail", "x.io", "zzz", "0"];
        for term in terms {
            let mut p = params(100);
            p.search_term = term.to_string();
            let outcome = derive_view(&records, &p, SortPolicy::Precedence);

            let mut got: Vec<u64> = outcome.page_items.iter().map(|u| u.id).collect();
            got.sort();
            let expected: Vec<u64> = records
                .iter()
                .filter(|u| {
                    term.is_empty()
                        || u.name.to_lowercase().contains(term)
                        || u.email.to_lowercase().contains(term)
                        || u.age.to_string().contains(term)
                })
                .map(|u| u.id)
                .collect();
            assert_eq!(got, expected, "term {:?}", term);
        }
    }

    #[test]
    fn test_empty_search_matches_blank_records() {
        let records = vec![user(1, "", "", 0, 1)];
        let outcome = derive_view(&records, &params(5), SortPolicy::Precedence);
        assert_eq!(outcome.filtered_count, 1);
    }

    #[test]
    fn test_creation_desc_beats_age_desc() {
        let records = vec![
            user(1, "Ana", "ana@mail.com", 25, 1),
            user(2, "Beto", "beto@mail.com", 30, 2),
            user(3, "Carla", "carla@mail.com", 20, 3),
            user(4, "Dani", "dani@mail.com", 99, 0),
        ];
        let mut p = params(10);
        p.sort.toggle_creation();
        p.sort.toggle_age();

        let outcome = derive_view(&records, &p, SortPolicy::Precedence);
        assert_eq!(names(&outcome), vec!["Carla", "Beto", "Ana", "Dani"]);
    }

    #[test]
    fn test_name_desc_only_when_others_default() {
        let records = ana_beto_carla();
        let mut p = params(10);
        p.sort.toggle_name();
        assert_eq!(
            names(&derive_view(&records, &p, SortPolicy::Precedence)),
            vec!["Carla", "Beto", "Ana"]
        );

        p.sort.toggle_age();
        assert_eq!(
            names(&derive_view(&records, &p, SortPolicy::Precedence)),
            vec!["Beto", "Ana", "Carla"]
        );
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let records = vec![
            user(5, "Same", "a@mail.com", 30, 1),
            user(2, "Same", "b@mail.com", 30, 1),
            user(9, "Same", "c@mail.com", 30, 1),
        ];
        let mut p = params(10);
        for toggles in [
            SortToggles::default(),
            SortToggles {
                age: roster_types::SortDirection::Desc,
                ..SortToggles::default()
            },
            SortToggles {
                creation: roster_types::SortDirection::Desc,
                ..SortToggles::default()
            },
        ] {
            p.sort = toggles;
            let outcome = derive_view(&records, &p, SortPolicy::Precedence);
            let ids: Vec<u64> = outcome.page_items.iter().map(|u| u.id).collect();
            assert_eq!(ids, vec![5, 2, 9]);
        }
    }

    #[test]
    fn test_combined_policy_breaks_ties_with_lower_keys() {
        let records = vec![
            user(1, "Carla", "c@mail.com", 30, 1),
            user(2, "Ana", "a@mail.com", 20, 1),
            user(3, "Beto", "b@mail.com", 30, 1),
            user(4, "Dani", "d@mail.com", 20, 2),
        ];
        let mut p = params(10);
        p.sort.toggle_age();

        let outcome = derive_view(&records, &p, SortPolicy::Combined);
        assert_eq!(names(&outcome), vec!["Beto", "Carla", "Ana", "Dani"]);

        p.sort.toggle_creation();
        let outcome = derive_view(&records, &p, SortPolicy::Combined);
        assert_eq!(names(&outcome), vec!["Dani", "Beto", "Carla", "Ana"]);
    }

    #[test]
    fn test_empty_set_has_no_pages() {
        for page in [0, 1, 2, 50] {
            let mut p = params(5);
            p.current_page = page;
            let outcome = derive_view(&[], &p, SortPolicy::Precedence);
            assert_eq!(outcome.total_pages, 0);
            assert!(outcome.page_items.is_empty());
            assert_eq!(outcome.filtered_count, 0);
        }
    }

    #[test]
    fn test_twelve_records_in_pages_of_five() {
        let records = numbered(12);
        let mut p = params(5);

        p.current_page = 1;
        let first = derive_view(&records, &p, SortPolicy::Precedence);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.page_items.len(), 5);
        assert_eq!(first.page_items[0].name, "User00");

        p.current_page = 3;
        let last = derive_view(&records, &p, SortPolicy::Precedence);
        assert_eq!(names(&last), vec!["User10", "User11"]);
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let records = numbered(12);
        let mut p = params(5);
        p.current_page = 4;

        let outcome = derive_view(&records, &p, SortPolicy::Precedence);
        assert!(outcome.page_items.is_empty());
        assert_eq!(outcome.total_pages, 3);
        assert_eq!(outcome.filtered_count, 12);
    }

    #[test]
    fn test_input_is_left_untouched() {
        let records = ana_beto_carla();
        let before = records.clone();
        let mut p = params(2);
        p.sort.toggle_creation();

        let first = derive_view(&records, &p, SortPolicy::Precedence);
        let second = derive_view(&records, &p, SortPolicy::Precedence);

        assert_eq!(records, before);
        assert_eq!(first, second);
    }
}
