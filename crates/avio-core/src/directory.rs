//! User directory port.
//!
//! The directory is an external, independently-consistent store; the core
//! only issues opaque reads/writes against it. Segments (countries) are
//! always resolved on demand, never cached, so a broadcast sees the
//! directory's state at launch time.

use async_trait::async_trait;

use crate::{
    domain::{UserId, UserRecord},
    Result,
};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>>;

    /// Case-insensitive exact match on the handle, without the `@` sigil.
    async fn get_user_by_handle(&self, handle: &str) -> Result<Option<UserRecord>>;

    async fn list_all(&self) -> Result<Vec<UserRecord>>;

    /// Distinct registration countries, excluding `Unknown`.
    async fn list_countries(&self) -> Result<Vec<String>>;

    /// Ids of all users registered in `country`, in store order.
    async fn list_by_country(&self, country: &str) -> Result<Vec<UserId>>;

    /// Insert unless the id already exists. Returns whether a row was added.
    async fn insert_if_absent(&self, record: &UserRecord) -> Result<bool>;
}

/// How an operator-supplied recipient identifier resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    Found(UserRecord),
    /// Not found, non-positive, or unparseable. No send may be attempted.
    NotFound,
}

/// Resolve `<id>` or `@handle` against the directory.
pub async fn resolve_recipient(directory: &dyn UserDirectory, identifier: &str) -> Result<Resolved> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Ok(Resolved::NotFound);
    }

    if let Some(handle) = identifier.strip_prefix('@') {
        return Ok(match directory.get_user_by_handle(handle).await? {
            Some(user) => Resolved::Found(user),
            None => Resolved::NotFound,
        });
    }

    let Ok(id) = identifier.parse::<i64>() else {
        return Ok(Resolved::NotFound);
    };
    if id <= 0 {
        return Ok(Resolved::NotFound);
    }

    Ok(match directory.get_user(UserId(id)).await? {
        Some(user) => Resolved::Found(user),
        None => Resolved::NotFound,
    })
}

/// Insertion-ordered in-memory directory, for tests and DB-less runs.
pub struct MemoryDirectory {
    users: tokio::sync::Mutex<Vec<UserRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: tokio::sync::Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_handle(&self, handle: &str) -> Result<Option<UserRecord>> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .find(|u| {
                u.username
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(handle))
            })
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<UserRecord>> {
        Ok(self.users.lock().await.clone())
    }

    async fn list_countries(&self) -> Result<Vec<String>> {
        let users = self.users.lock().await;
        let mut out: Vec<String> = Vec::new();
        for u in users.iter() {
            if u.country != UserRecord::UNKNOWN_COUNTRY && !out.contains(&u.country) {
                out.push(u.country.clone());
            }
        }
        Ok(out)
    }

    async fn list_by_country(&self, country: &str) -> Result<Vec<UserId>> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .filter(|u| u.country == country)
            .map(|u| u.id)
            .collect())
    }

    async fn insert_if_absent(&self, record: &UserRecord) -> Result<bool> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.id == record.id) {
            return Ok(false);
        }
        users.push(record.clone());
        Ok(true)
    }
}
