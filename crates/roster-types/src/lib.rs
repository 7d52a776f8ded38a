use serde::{Deserialize, Serialize};

mod user;
mod validation;
mod view;

pub use user::*;
pub use validation::*;
pub use view::*;

pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const PAGE_SIZE_CHOICES: [usize; 4] = [5, 10, 15, 20];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub path: String,
    pub records: u64,
    pub current_bytes: u64,
    pub max_bytes: u64,
}
