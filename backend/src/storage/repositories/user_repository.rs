use anyhow::{Context, Result};
use log::warn;
use shared::UserAccount;
use std::sync::Arc;

use crate::storage::document::Document;
use crate::storage::traits::{DocumentQuery, DocumentStore, Filter};

const EMAIL: &str = "email";
const PASSWORD_HASH: &str = "passwordHash";
const PASSWORD_SALT: &str = "passwordSalt";
const CREATED_AT: &str = "createdAt";

/// A local account together with its salted credential
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUser {
    pub account: UserAccount,
    pub password_hash: String,
    pub password_salt: String,
}

impl StoredUser {
    fn to_document(&self) -> Document {
        let mut document = Document::new(self.account.id.clone());
        document
            .set(EMAIL, self.account.email.as_str())
            .set(PASSWORD_HASH, self.password_hash.as_str())
            .set(PASSWORD_SALT, self.password_salt.as_str())
            .set(CREATED_AT, self.account.created_at);
        document
    }

    fn from_document(document: &Document) -> Option<Self> {
        let (Some(email), Some(password_hash), Some(password_salt), Some(created_at)) = (
            document.get_string(EMAIL),
            document.get_string(PASSWORD_HASH),
            document.get_string(PASSWORD_SALT),
            document.get_timestamp(CREATED_AT),
        ) else {
            warn!("Dropping user {}: missing required fields", document.id);
            return None;
        };
        Some(Self {
            account: UserAccount {
                id: document.id.clone(),
                email,
                created_at,
            },
            password_hash,
            password_salt,
        })
    }
}

/// Typed access to the `users` collection
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
}

impl UserRepository {
    pub const COLLECTION: &'static str = "users";

    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn store_user(&self, user: &StoredUser) -> Result<()> {
        self.store
            .put(Self::COLLECTION, &user.to_document())
            .await
            .with_context(|| format!("Failed to store user {}", user.account.id))
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<StoredUser>> {
        let document = self.store.get(Self::COLLECTION, user_id).await?;
        Ok(document.as_ref().and_then(StoredUser::from_document))
    }

    /// Exact match; callers normalize the address first
    pub async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        let query = DocumentQuery::new().filter(Filter::equals(EMAIL, email)).limit(1);
        let documents = self.store.query(Self::COLLECTION, &query).await?;
        Ok(documents.iter().find_map(StoredUser::from_document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::RepositoryTestHelper;
    use chrono::Utc;

    #[tokio::test]
    async fn test_store_and_find_by_email() {
        let helper = RepositoryTestHelper::new().unwrap();
        let user = StoredUser {
            account: UserAccount {
                id: "u1".to_string(),
                email: "ada@example.com".to_string(),
                created_at: Utc::now(),
            },
            password_hash: "abcd".to_string(),
            password_salt: "1234".to_string(),
        };
        helper.user_repo.store_user(&user).await.unwrap();

        assert_eq!(helper.user_repo.find_by_email("ada@example.com").await.unwrap(), Some(user.clone()));
        assert_eq!(helper.user_repo.get_user("u1").await.unwrap(), Some(user));
        assert!(helper.user_repo.find_by_email("grace@example.com").await.unwrap().is_none());
    }
}
