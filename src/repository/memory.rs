//! In-process user store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{NewUser, Paginator, RepositoryError, RepositoryResult, User, UserRepository};

#[derive(Debug, Default)]
struct Store {
    users: BTreeMap<i64, User>,
    next_id: i64,
}

/// [`UserRepository`] kept in process memory.
///
/// Ids are assigned from 1 upwards and never reused. Email uniqueness is
/// checked under the same write lock that inserts, so two concurrent creates
/// with the same email cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    store: RwLock<Store>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|user| user.email.eq_ignore_ascii_case(email) && Some(user.id) != except)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let mut store = self.store.write();
        if store.email_taken(&user.email, None) {
            return Err(RepositoryError::EmailExists(user.email));
        }

        store.next_id += 1;
        let now = Utc::now();
        let created = User {
            id: store.next_id,
            name: user.name,
            email: user.email,
            created_at: now,
            updated_at: now,
        };
        store.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> RepositoryResult<User> {
        self.store
            .read()
            .users
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update(&self, id: i64, user: NewUser) -> RepositoryResult<User> {
        let mut store = self.store.write();
        if !store.users.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if store.email_taken(&user.email, Some(id)) {
            return Err(RepositoryError::EmailExists(user.email));
        }

        let existing = store
            .users
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        existing.name = user.name;
        existing.email = user.email;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        self.store
            .write()
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, page: u32, per_page: u32) -> RepositoryResult<(Vec<User>, Paginator)> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let offset = (page as usize - 1).saturating_mul(per_page as usize);

        let store = self.store.read();
        let users = store
            .users
            .values()
            .skip(offset)
            .take(per_page as usize)
            .cloned()
            .collect();

        Ok((
            users,
            Paginator {
                page,
                per_page,
                total: store.users.len() as u64,
            },
        ))
    }
}
