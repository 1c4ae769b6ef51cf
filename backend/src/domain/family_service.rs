//! Family groups and the baby access they grant.
//!
//! Joining a family makes the new member a parent of every family baby;
//! leaving or being removed revokes that again unless the user still reaches
//! the baby another way. Membership changes are serialized and written as one
//! batch so a family and its babies never disagree.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{info, warn};
use shared::{Baby, DrugType, Family, FamilySettings};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::errors::DomainError;
use crate::storage::mappers::{BabyMapper, FamilyMapper};
use crate::storage::{BabyRepository, DocumentStore, FamilyRepository, WriteBatch};

const MAX_NAME_LENGTH: usize = 100;

#[derive(Clone)]
pub struct FamilyService {
    store: Arc<dyn DocumentStore>,
    family_repository: FamilyRepository,
    baby_repository: BabyRepository,
    membership_lock: Arc<Mutex<()>>,
}

impl FamilyService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            family_repository: FamilyRepository::new(store.clone()),
            baby_repository: BabyRepository::new(store.clone()),
            store,
            membership_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a family with the creator as its first admin and member
    pub async fn create_family(&self, user_id: &str, name: &str, now: DateTime<Utc>) -> Result<Family> {
        let name = Self::validate_name(name)?;
        let family = Family {
            id: Family::generate_id(),
            name,
            invite_code: self.unused_invite_code(None).await?,
            admin_ids: vec![user_id.to_string()],
            member_ids: vec![user_id.to_string()],
            baby_ids: Vec::new(),
            settings: FamilySettings::default(),
            created_at: now,
            updated_at: now,
        };
        self.family_repository.store_family(&family).await?;
        info!("Created family {} ({})", family.name, family.id);
        Ok(family)
    }

    pub async fn get_family(&self, user_id: &str, family_id: &str) -> Result<Family> {
        let family = self.load_family(family_id).await?;
        if !family.is_member(user_id) {
            return Err(DomainError::permission_denied("not a member of this family").into());
        }
        Ok(family)
    }

    pub async fn list_families(&self, user_id: &str) -> Result<Vec<Family>> {
        self.family_repository.list_families_for_member(user_id).await
    }

    /// Join by invite code; the user becomes a parent of every family baby
    pub async fn join_family(&self, user_id: &str, invite_code: &str, now: DateTime<Utc>) -> Result<Family> {
        let code = invite_code.trim().to_uppercase();
        if !Family::is_valid_invite_code(&code) {
            return Err(DomainError::invalid_input("invite codes are 6 letters or digits").into());
        }

        let _guard = self.membership_lock.lock().await;
        let mut family = self
            .family_repository
            .find_by_invite_code(&code)
            .await?
            .ok_or_else(|| DomainError::not_found("Family for invite code"))?;
        if family.is_member(user_id) {
            return Ok(family);
        }

        family.member_ids.push(user_id.to_string());
        family.touch(now);

        let mut batch = WriteBatch::new();
        batch.put(FamilyRepository::COLLECTION, FamilyMapper::to_document(&family));
        for mut baby in self.family_babies(&family).await? {
            if baby.add_parent(user_id) {
                baby.updated_at = now;
                batch.put(BabyRepository::COLLECTION, BabyMapper::to_document(&baby));
            }
        }
        self.store.commit(batch).await?;

        info!("User {} joined family {}", user_id, family.id);
        Ok(family)
    }

    /// Leave a family. The last admin has to hand over first.
    pub async fn leave_family(&self, user_id: &str, family_id: &str, now: DateTime<Utc>) -> Result<()> {
        let _guard = self.membership_lock.lock().await;
        let family = self.get_family(user_id, family_id).await?;
        if family.is_admin(user_id) && family.admin_ids.len() == 1 {
            return Err(DomainError::invalid_input("the last admin cannot leave the family").into());
        }
        self.remove_from_family(family, user_id, now).await?;
        info!("User {} left family {}", user_id, family_id);
        Ok(())
    }

    pub async fn remove_member(
        &self,
        admin_id: &str,
        family_id: &str,
        member_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Family> {
        let _guard = self.membership_lock.lock().await;
        let family = self.load_admin_family(admin_id, family_id).await?;
        if member_id == admin_id {
            return Err(DomainError::invalid_input("use leave to remove yourself").into());
        }
        if !family.is_member(member_id) {
            return Err(DomainError::not_found(format!("Member {}", member_id)).into());
        }
        let family = self.remove_from_family(family, member_id, now).await?;
        info!("Admin {} removed {} from family {}", admin_id, member_id, family_id);
        Ok(family)
    }

    pub async fn regenerate_invite_code(&self, admin_id: &str, family_id: &str, now: DateTime<Utc>) -> Result<Family> {
        let family = self.load_admin_family(admin_id, family_id).await?;
        let mut renewed = family.with_new_invite_code(now);
        if self.family_repository.find_by_invite_code(&renewed.invite_code).await?.is_some() {
            renewed.invite_code = self.unused_invite_code(Some(&family.invite_code)).await?;
        }
        self.family_repository.store_family(&renewed).await?;
        info!("Regenerated invite code of family {}", family_id);
        Ok(renewed)
    }

    /// Share one of the user's babies with the family
    pub async fn add_baby(&self, user_id: &str, family_id: &str, baby_id: &str, now: DateTime<Utc>) -> Result<Family> {
        let _guard = self.membership_lock.lock().await;
        let mut family = self.get_family(user_id, family_id).await?;
        let mut baby = self
            .baby_repository
            .get_baby(baby_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Baby {}", baby_id)))?;
        if !baby.is_parent(user_id) {
            return Err(DomainError::permission_denied("only parents can share a baby").into());
        }
        if family.has_baby(baby_id) {
            return Ok(family);
        }

        family.baby_ids.push(baby_id.to_string());
        family.touch(now);
        for member in &family.member_ids {
            baby.add_parent(member);
        }
        baby.updated_at = now;

        let mut batch = WriteBatch::new();
        batch
            .put(FamilyRepository::COLLECTION, FamilyMapper::to_document(&family))
            .put(BabyRepository::COLLECTION, BabyMapper::to_document(&baby));
        self.store.commit(batch).await?;
        info!("Baby {} added to family {}", baby_id, family_id);
        Ok(family)
    }

    /// Stop sharing a baby; members keep access only through other routes
    pub async fn remove_baby(&self, admin_id: &str, family_id: &str, baby_id: &str, now: DateTime<Utc>) -> Result<Family> {
        let _guard = self.membership_lock.lock().await;
        let mut family = self.load_admin_family(admin_id, family_id).await?;
        if !family.has_baby(baby_id) {
            return Err(DomainError::not_found(format!("Baby {} in family", baby_id)).into());
        }
        family.baby_ids.retain(|id| id != baby_id);
        family.touch(now);

        let mut batch = WriteBatch::new();
        batch.put(FamilyRepository::COLLECTION, FamilyMapper::to_document(&family));
        if let Some(mut baby) = self.baby_repository.get_baby(baby_id).await? {
            let mut changed = false;
            for member in &family.member_ids {
                changed |= self.revoke_parent(&mut baby, member, &family.id).await?;
            }
            if changed {
                baby.updated_at = now;
                batch.put(BabyRepository::COLLECTION, BabyMapper::to_document(&baby));
            }
        } else {
            warn!("Family {} referenced missing baby {}", family_id, baby_id);
        }
        self.store.commit(batch).await?;
        Ok(family)
    }

    pub async fn update_settings(
        &self,
        admin_id: &str,
        family_id: &str,
        settings: FamilySettings,
        now: DateTime<Utc>,
    ) -> Result<Family> {
        let mut family = self.load_admin_family(admin_id, family_id).await?;
        let mut custom = Vec::new();
        for name in settings.custom_drug_types {
            let name = Self::validate_drug_name(&name, &custom)?;
            custom.push(name);
        }
        family.settings = FamilySettings {
            share_photos: settings.share_photos,
            members_can_edit_events: settings.members_can_edit_events,
            custom_drug_types: custom,
        };
        family.touch(now);
        self.family_repository.store_family(&family).await?;
        Ok(family)
    }

    /// Offer a new drug name to every member of the family
    pub async fn add_custom_drug_type(&self, user_id: &str, family_id: &str, name: &str, now: DateTime<Utc>) -> Result<Family> {
        let mut family = self.get_family(user_id, family_id).await?;
        let name = Self::validate_drug_name(name, &family.settings.custom_drug_types)?;
        family.settings.custom_drug_types.push(name);
        family.touch(now);
        self.family_repository.store_family(&family).await?;
        Ok(family)
    }

    /// Built-in drug types followed by the custom names of every family the user is in
    pub async fn drug_types_for(&self, user_id: &str) -> Result<Vec<DrugType>> {
        let mut drug_types = DrugType::BUILT_IN.to_vec();
        for family in self.list_families(user_id).await? {
            for name in family.settings.custom_drug_types {
                let drug_type = DrugType::custom(name);
                if !drug_types.contains(&drug_type) {
                    drug_types.push(drug_type);
                }
            }
        }
        Ok(drug_types)
    }

    async fn remove_from_family(&self, mut family: Family, user_id: &str, now: DateTime<Utc>) -> Result<Family> {
        family.member_ids.retain(|id| id != user_id);
        family.admin_ids.retain(|id| id != user_id);
        family.touch(now);

        let mut batch = WriteBatch::new();
        batch.put(FamilyRepository::COLLECTION, FamilyMapper::to_document(&family));
        for mut baby in self.family_babies(&family).await? {
            if self.revoke_parent(&mut baby, user_id, &family.id).await? {
                baby.updated_at = now;
                batch.put(BabyRepository::COLLECTION, BabyMapper::to_document(&baby));
            }
        }
        self.store.commit(batch).await?;
        Ok(family)
    }

    /// Drop `user_id` from the baby's parents unless they created the baby or
    /// share it through a family other than `family_id`
    async fn revoke_parent(&self, baby: &mut Baby, user_id: &str, family_id: &str) -> Result<bool> {
        if baby.parent_ids.first().map(String::as_str) == Some(user_id) || !baby.is_parent(user_id) {
            return Ok(false);
        }
        let shared_elsewhere = self
            .family_repository
            .list_families_with_baby(&baby.id)
            .await?
            .iter()
            .any(|other| other.id != family_id && other.is_member(user_id));
        if shared_elsewhere {
            return Ok(false);
        }
        baby.parent_ids.retain(|id| id != user_id);
        Ok(true)
    }

    async fn family_babies(&self, family: &Family) -> Result<Vec<Baby>> {
        let mut babies = Vec::new();
        for baby_id in &family.baby_ids {
            match self.baby_repository.get_baby(baby_id).await? {
                Some(baby) => babies.push(baby),
                None => warn!("Family {} referenced missing baby {}", family.id, baby_id),
            }
        }
        Ok(babies)
    }

    async fn load_family(&self, family_id: &str) -> Result<Family> {
        self.family_repository
            .get_family(family_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Family {}", family_id)).into())
    }

    async fn load_admin_family(&self, admin_id: &str, family_id: &str) -> Result<Family> {
        let family = self.load_family(family_id).await?;
        if !family.is_admin(admin_id) {
            return Err(DomainError::permission_denied("only family admins can do this").into());
        }
        Ok(family)
    }

    async fn unused_invite_code(&self, previous: Option<&str>) -> Result<String> {
        loop {
            let code = Family::generate_invite_code();
            if Some(code.as_str()) == previous {
                continue;
            }
            if self.family_repository.find_by_invite_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
    }

    fn validate_name(name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            return Err(DomainError::invalid_input("family name must be 1 to 100 characters").into());
        }
        Ok(name.to_string())
    }

    fn validate_drug_name(name: &str, existing: &[String]) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid_input("drug name cannot be empty").into());
        }
        if DrugType::is_built_in_name(name) || existing.iter().any(|other| other.eq_ignore_ascii_case(name)) {
            return Err(DomainError::invalid_input(format!("drug type {} already exists", name)).into());
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::RepositoryTestHelper;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap()
    }

    async fn setup() -> (RepositoryTestHelper, FamilyService) {
        let helper = RepositoryTestHelper::new().unwrap();
        let service = FamilyService::new(helper.store.clone());
        let mut baby = Baby::new(
            "baby-1".to_string(),
            "Ada".to_string(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            now(),
        );
        baby.add_parent("alice");
        helper.baby_repo.store_baby(&baby).await.unwrap();
        (helper, service)
    }

    fn error_of(result: Result<impl std::fmt::Debug>) -> DomainError {
        result
            .unwrap_err()
            .downcast_ref::<DomainError>()
            .cloned()
            .expect("expected a DomainError")
    }

    #[tokio::test]
    async fn test_create_family() {
        let (_helper, service) = setup().await;
        let family = service.create_family("alice", " Lovelace ", now()).await.unwrap();
        assert_eq!(family.name, "Lovelace");
        assert!(family.is_admin("alice"));
        assert!(family.is_member("alice"));
        assert!(Family::is_valid_invite_code(&family.invite_code));
        assert!(matches!(error_of(service.create_family("alice", "  ", now()).await), DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_join_propagates_parent_ids() {
        let (helper, service) = setup().await;
        let family = service.create_family("alice", "Lovelace", now()).await.unwrap();
        service.add_baby("alice", &family.id, "baby-1", now()).await.unwrap();

        let code = family.invite_code.to_lowercase();
        let joined = service.join_family("bob", &code, now() + Duration::minutes(1)).await.unwrap();
        assert!(joined.is_member("bob"));
        assert!(!joined.is_admin("bob"));

        let baby = helper.baby_repo.get_baby("baby-1").await.unwrap().unwrap();
        assert_eq!(baby.parent_ids, vec!["alice", "bob"]);

        // Joining twice changes nothing
        let again = service.join_family("bob", &code, now() + Duration::minutes(2)).await.unwrap();
        assert_eq!(again, joined);

        assert!(matches!(error_of(service.join_family("bob", "ZZZZZZ", now()).await), DomainError::NotFound(_)));
        assert!(matches!(error_of(service.join_family("bob", "bad", now()).await), DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_leave_revokes_access_but_keeps_creator() {
        let (helper, service) = setup().await;
        let family = service.create_family("alice", "Lovelace", now()).await.unwrap();
        service.add_baby("alice", &family.id, "baby-1", now()).await.unwrap();
        service.join_family("bob", &family.invite_code, now()).await.unwrap();

        // Last admin may not leave
        assert!(matches!(
            error_of(service.leave_family("alice", &family.id, now()).await),
            DomainError::InvalidInput(_)
        ));

        service.leave_family("bob", &family.id, now()).await.unwrap();
        let family = helper.family_repo.get_family(&family.id).await.unwrap().unwrap();
        assert!(!family.is_member("bob"));
        let baby = helper.baby_repo.get_baby("baby-1").await.unwrap().unwrap();
        assert_eq!(baby.parent_ids, vec!["alice"]);
    }

    #[tokio::test]
    async fn test_access_shared_through_another_family_survives() {
        let (helper, service) = setup().await;
        let first = service.create_family("alice", "First", now()).await.unwrap();
        let second = service.create_family("alice", "Second", now()).await.unwrap();
        service.add_baby("alice", &first.id, "baby-1", now()).await.unwrap();
        service.add_baby("alice", &second.id, "baby-1", now()).await.unwrap();
        service.join_family("bob", &first.invite_code, now()).await.unwrap();
        service.join_family("bob", &second.invite_code, now()).await.unwrap();

        service.remove_member("alice", &first.id, "bob", now()).await.unwrap();
        let baby = helper.baby_repo.get_baby("baby-1").await.unwrap().unwrap();
        assert!(baby.is_parent("bob"));

        service.remove_baby("alice", &second.id, "baby-1", now()).await.unwrap();
        let baby = helper.baby_repo.get_baby("baby-1").await.unwrap().unwrap();
        assert!(!baby.is_parent("bob"));
        assert!(baby.is_parent("alice"));
    }

    #[tokio::test]
    async fn test_admin_only_operations() {
        let (_helper, service) = setup().await;
        let family = service.create_family("alice", "Lovelace", now()).await.unwrap();
        service.join_family("bob", &family.invite_code, now()).await.unwrap();

        assert!(matches!(
            error_of(service.regenerate_invite_code("bob", &family.id, now()).await),
            DomainError::PermissionDenied(_)
        ));
        assert!(matches!(
            error_of(service.remove_member("bob", &family.id, "alice", now()).await),
            DomainError::PermissionDenied(_)
        ));

        let renewed = service.regenerate_invite_code("alice", &family.id, now()).await.unwrap();
        assert_ne!(renewed.invite_code, family.invite_code);
        assert!(renewed.updated_at > family.updated_at);
        assert!(matches!(
            error_of(service.join_family("carol", &family.invite_code, now()).await),
            DomainError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_custom_drug_types() {
        let (_helper, service) = setup().await;
        let family = service.create_family("alice", "Lovelace", now()).await.unwrap();

        let family = service
            .add_custom_drug_type("alice", &family.id, " Simethicone ", now())
            .await
            .unwrap();
        assert_eq!(family.settings.custom_drug_types, vec!["Simethicone"]);
        assert!(service.add_custom_drug_type("alice", &family.id, "simethicone", now()).await.is_err());
        assert!(service.add_custom_drug_type("alice", &family.id, "paracetamol", now()).await.is_err());

        let drug_types = service.drug_types_for("alice").await.unwrap();
        assert_eq!(drug_types.len(), DrugType::BUILT_IN.len() + 1);
        assert_eq!(drug_types.last(), Some(&DrugType::Custom("Simethicone".to_string())));
    }

    #[tokio::test]
    async fn test_update_settings() {
        let (_helper, service) = setup().await;
        let family = service.create_family("alice", "Lovelace", now()).await.unwrap();
        let settings = FamilySettings {
            share_photos: false,
            members_can_edit_events: false,
            custom_drug_types: vec!["Gripe water".to_string()],
        };
        let updated = service.update_settings("alice", &family.id, settings.clone(), now()).await.unwrap();
        assert_eq!(updated.settings, settings);
    }
}
