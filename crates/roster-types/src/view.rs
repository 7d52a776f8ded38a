use serde::{Deserialize, Serialize};

use crate::{User, DEFAULT_PAGE_SIZE};

// ============================================================================
// Sorting
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn is_desc(self) -> bool {
        self == SortDirection::Desc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Creation,
    Age,
    Name,
}

/// Three independent sort toggles. Which of them actually orders the view
/// is decided by the [`SortPolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortToggles {
    #[serde(default)]
    pub creation: SortDirection,
    #[serde(default)]
    pub age: SortDirection,
    #[serde(default)]
    pub name: SortDirection,
}

impl SortToggles {
    pub fn toggle_creation(&mut self) {
        self.creation = self.creation.toggled();
    }

    pub fn toggle_age(&mut self) {
        self.age = self.age.toggled();
    }

    pub fn toggle_name(&mut self) {
        self.name = self.name.toggled();
    }

    /// The single criterion honoured under [`SortPolicy::Precedence`]:
    /// creation beats age beats name, and name is the fallback.
    pub fn active_key(&self) -> (SortKey, SortDirection) {
        if self.creation.is_desc() {
            (SortKey::Creation, SortDirection::Desc)
        } else if self.age.is_desc() {
            (SortKey::Age, SortDirection::Desc)
        } else {
            (SortKey::Name, self.name)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortPolicy {
    /// Exactly one toggle orders the view, chosen by fixed priority.
    #[default]
    Precedence,
    /// Every non-default toggle applies, highest priority dominating.
    Combined,
}

// ============================================================================
// View parameters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewParams {
    #[serde(default)]
    pub search_term: String,
    #[serde(default)]
    pub sort: SortToggles,
    #[serde(default = "default_current_page")]
    pub current_page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_current_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            sort: SortToggles::default(),
            current_page: default_current_page(),
            page_size: default_page_size(),
        }
    }
}

impl ViewParams {
    pub fn with_page_size(page_size: usize) -> Self {
        let mut params = Self::default();
        params.set_page_size(page_size);
        params
    }

    /// Changing the page size always returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.current_page = 1;
    }

    /// Pulls `current_page` back into `[1, total_pages]`. Returns true if it
    /// moved.
    pub fn clamp_page(&mut self, total_pages: usize) -> bool {
        let clamped = self.current_page.clamp(1, total_pages.max(1));
        let moved = clamped != self.current_page;
        self.current_page = clamped;
        moved
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.current_page = self.current_page.saturating_add(1).min(total_pages.max(1));
    }

    pub fn prev_page(&mut self) {
        self.current_page = self.current_page.saturating_sub(1).max(1);
    }
}

// ============================================================================
// View outcome
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOutcome {
    pub filtered_count: usize,
    pub total_count: usize,
    pub page_items: Vec<User>,
    pub total_pages: usize,
}
