use log::warn;
use shared::{Family, FamilySettings};

use crate::storage::document::Document;

pub const INVITE_CODE: &str = "inviteCode";
pub const MEMBER_IDS: &str = "memberIds";
pub const BABY_IDS: &str = "babyIds";
const ID: &str = "id";
const NAME: &str = "name";
const ADMIN_IDS: &str = "adminIds";
const SHARE_PHOTOS: &str = "settingsSharePhotos";
const MEMBERS_CAN_EDIT_EVENTS: &str = "settingsMembersCanEditEvents";
const CUSTOM_DRUG_TYPES: &str = "settingsCustomDrugTypes";
const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

/// Mapper converting between families and stored documents
pub struct FamilyMapper;

impl FamilyMapper {
    pub fn to_document(family: &Family) -> Document {
        let mut document = Document::new(family.id.clone());
        document
            .set(ID, family.id.as_str())
            .set(NAME, family.name.as_str())
            .set(INVITE_CODE, family.invite_code.as_str())
            .set(ADMIN_IDS, family.admin_ids.clone())
            .set(MEMBER_IDS, family.member_ids.clone())
            .set(BABY_IDS, family.baby_ids.clone())
            .set(SHARE_PHOTOS, family.settings.share_photos)
            .set(MEMBERS_CAN_EDIT_EVENTS, family.settings.members_can_edit_events)
            .set(CUSTOM_DRUG_TYPES, family.settings.custom_drug_types.clone())
            .set(CREATED_AT, family.created_at)
            .set(UPDATED_AT, family.updated_at);
        document
    }

    pub fn from_document(document: &Document) -> Option<Family> {
        let (Some(name), Some(invite_code), Some(created_at), Some(updated_at)) = (
            document.get_string(NAME),
            document.get_string(INVITE_CODE),
            document.get_timestamp(CREATED_AT),
            document.get_timestamp(UPDATED_AT),
        ) else {
            warn!("Dropping family {}: missing required fields", document.id);
            return None;
        };
        let defaults = FamilySettings::default();

        Some(Family {
            id: document.id.clone(),
            name,
            invite_code,
            admin_ids: document.get_string_list(ADMIN_IDS),
            member_ids: document.get_string_list(MEMBER_IDS),
            baby_ids: document.get_string_list(BABY_IDS),
            settings: FamilySettings {
                share_photos: document.get_bool(SHARE_PHOTOS).unwrap_or(defaults.share_photos),
                members_can_edit_events: document
                    .get_bool(MEMBERS_CAN_EDIT_EVENTS)
                    .unwrap_or(defaults.members_can_edit_events),
                custom_drug_types: document.get_string_list(CUSTOM_DRUG_TYPES),
            },
            created_at,
            updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_round_trip() {
        let now = Utc::now();
        let family = Family {
            id: "family-1".to_string(),
            name: "Lovelace".to_string(),
            invite_code: "K3X9QA".to_string(),
            admin_ids: vec!["user-1".to_string()],
            member_ids: vec!["user-1".to_string(), "user-2".to_string()],
            baby_ids: vec!["baby-1".to_string()],
            settings: FamilySettings {
                share_photos: false,
                members_can_edit_events: true,
                custom_drug_types: vec!["Simethicone".to_string()],
            },
            created_at: now,
            updated_at: now,
        };
        let document = FamilyMapper::to_document(&family);
        assert_eq!(FamilyMapper::from_document(&document), Some(family));
    }

    #[test]
    fn test_missing_settings_take_defaults() {
        let now = Utc::now();
        let mut document = Document::new("family-1");
        document
            .set(NAME, "Lovelace")
            .set(INVITE_CODE, "K3X9QA")
            .set(CREATED_AT, now)
            .set(UPDATED_AT, now);
        let family = FamilyMapper::from_document(&document).unwrap();
        assert_eq!(family.settings, FamilySettings::default());
        assert!(family.member_ids.is_empty());
    }
}
