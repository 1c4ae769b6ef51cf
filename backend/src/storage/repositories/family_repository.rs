use anyhow::{Context, Result};
use shared::Family;
use std::sync::Arc;

use crate::storage::mappers::family_mapper::{BABY_IDS, INVITE_CODE, MEMBER_IDS};
use crate::storage::mappers::FamilyMapper;
use crate::storage::traits::{DocumentQuery, DocumentStore, Filter};

/// Typed access to the `families` collection
#[derive(Clone)]
pub struct FamilyRepository {
    store: Arc<dyn DocumentStore>,
}

impl FamilyRepository {
    pub const COLLECTION: &'static str = "families";

    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn store_family(&self, family: &Family) -> Result<()> {
        self.store
            .put(Self::COLLECTION, &FamilyMapper::to_document(family))
            .await
            .with_context(|| format!("Failed to store family {}", family.id))
    }

    pub async fn get_family(&self, family_id: &str) -> Result<Option<Family>> {
        let document = self.store.get(Self::COLLECTION, family_id).await?;
        Ok(document.as_ref().and_then(FamilyMapper::from_document))
    }

    pub async fn find_by_invite_code(&self, invite_code: &str) -> Result<Option<Family>> {
        let query = DocumentQuery::new()
            .filter(Filter::equals(INVITE_CODE, invite_code))
            .limit(1);
        let documents = self.store.query(Self::COLLECTION, &query).await?;
        Ok(documents.iter().find_map(FamilyMapper::from_document))
    }

    pub async fn list_families_for_member(&self, user_id: &str) -> Result<Vec<Family>> {
        let query = DocumentQuery::new()
            .filter(Filter::array_contains(MEMBER_IDS, user_id))
            .order_by("name", false);
        let documents = self.store.query(Self::COLLECTION, &query).await?;
        Ok(documents.iter().filter_map(FamilyMapper::from_document).collect())
    }

    pub async fn list_families_with_baby(&self, baby_id: &str) -> Result<Vec<Family>> {
        let query = DocumentQuery::new().filter(Filter::array_contains(BABY_IDS, baby_id));
        let documents = self.store.query(Self::COLLECTION, &query).await?;
        Ok(documents.iter().filter_map(FamilyMapper::from_document).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::test_utils::RepositoryTestHelper;
    use chrono::Utc;
    use shared::{Family, FamilySettings};

    fn family(id: &str, name: &str, code: &str, members: &[&str], babies: &[&str]) -> Family {
        let now = Utc::now();
        Family {
            id: id.to_string(),
            name: name.to_string(),
            invite_code: code.to_string(),
            admin_ids: members.iter().take(1).map(|m| m.to_string()).collect(),
            member_ids: members.iter().map(|m| m.to_string()).collect(),
            baby_ids: babies.iter().map(|b| b.to_string()).collect(),
            settings: FamilySettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_find_by_invite_code() {
        let helper = RepositoryTestHelper::new().unwrap();
        let repo = &helper.family_repo;
        repo.store_family(&family("f1", "Lovelace", "AAAAAA", &["u1"], &[])).await.unwrap();
        repo.store_family(&family("f2", "Hopper", "BBBBBB", &["u2"], &[])).await.unwrap();

        let found = repo.find_by_invite_code("BBBBBB").await.unwrap().unwrap();
        assert_eq!(found.id, "f2");
        assert!(repo.find_by_invite_code("CCCCCC").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_membership_and_baby_lookups() {
        let helper = RepositoryTestHelper::new().unwrap();
        let repo = &helper.family_repo;
        repo.store_family(&family("f1", "Zed", "AAAAAA", &["u1", "u2"], &["b1"])).await.unwrap();
        repo.store_family(&family("f2", "Abe", "BBBBBB", &["u1"], &["b1", "b2"])).await.unwrap();

        let names: Vec<String> = repo
            .list_families_for_member("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["Abe", "Zed"]);
        assert_eq!(repo.list_families_for_member("u2").await.unwrap().len(), 1);
        assert_eq!(repo.list_families_with_baby("b1").await.unwrap().len(), 2);
        assert_eq!(repo.list_families_with_baby("b2").await.unwrap().len(), 1);
    }
}
