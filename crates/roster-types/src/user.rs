use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted user record. The `id` and `created_at` are assigned by the
/// record store; everything else is whatever the caller handed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub age: u32,
    pub created_at: DateTime<Utc>,
}

/// A user that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub age: u32,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: u32) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            age,
        }
    }
}

impl User {
    pub fn from_new(id: u64, user: NewUser, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: user.name,
            email: user.email,
            age: user.age,
            created_at,
        }
    }

    /// Replaces the editable fields, keeping identity and creation time.
    pub fn with_fields(self, fields: NewUser) -> Self {
        Self {
            name: fields.name,
            email: fields.email,
            age: fields.age,
            ..self
        }
    }

    pub fn fields(&self) -> NewUser {
        NewUser::new(self.name.clone(), self.email.clone(), self.age)
    }
}
