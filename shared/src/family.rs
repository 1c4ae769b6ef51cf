use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const INVITE_CODE_LENGTH: usize = 6;
const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Family-wide defaults applied to every member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilySettings {
    /// Whether photos attached to events are visible to every member
    pub share_photos: bool,
    pub members_can_edit_events: bool,
    /// Drug names offered next to the built-in drug types
    pub custom_drug_types: Vec<String>,
}

impl Default for FamilySettings {
    fn default() -> Self {
        Self {
            share_photos: true,
            members_can_edit_events: true,
            custom_drug_types: Vec::new(),
        }
    }
}

/// A sharing group of users with joint access to one or more babies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: String,
    pub name: String,
    pub invite_code: String,
    pub admin_ids: Vec<String>,
    pub member_ids: Vec<String>,
    pub baby_ids: Vec<String>,
    pub settings: FamilySettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Family {
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Random code of upper-case letters and digits
    pub fn generate_invite_code() -> String {
        let mut rng = rand::thread_rng();
        (0..INVITE_CODE_LENGTH)
            .map(|_| INVITE_CODE_ALPHABET[rng.gen_range(0..INVITE_CODE_ALPHABET.len())] as char)
            .collect()
    }

    pub fn is_valid_invite_code(code: &str) -> bool {
        code.len() == INVITE_CODE_LENGTH
            && code.bytes().all(|b| INVITE_CODE_ALPHABET.contains(&b))
    }

    /// Copy of this family with a fresh invite code.
    ///
    /// `updated_at` is strictly greater than before even when `now` has not
    /// advanced past the previous update.
    pub fn with_new_invite_code(&self, now: DateTime<Utc>) -> Self {
        let mut invite_code = Self::generate_invite_code();
        while invite_code == self.invite_code {
            invite_code = Self::generate_invite_code();
        }
        Self {
            invite_code,
            updated_at: Self::next_update_time(self.updated_at, now),
            ..self.clone()
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Self::next_update_time(self.updated_at, now);
    }

    fn next_update_time(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        if now > previous {
            now
        } else {
            previous + Duration::milliseconds(1)
        }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.iter().any(|id| id == user_id)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == user_id)
    }

    pub fn has_baby(&self, baby_id: &str) -> bool {
        self.baby_ids.iter().any(|id| id == baby_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(updated_at: DateTime<Utc>) -> Family {
        Family {
            id: "family-1".to_string(),
            name: "The Lovelaces".to_string(),
            invite_code: "ABC123".to_string(),
            admin_ids: vec!["user-1".to_string()],
            member_ids: vec!["user-1".to_string(), "user-2".to_string()],
            baby_ids: Vec::new(),
            settings: FamilySettings::default(),
            created_at: updated_at,
            updated_at,
        }
    }

    #[test]
    fn test_generate_invite_code_shape() {
        for _ in 0..100 {
            let code = Family::generate_invite_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            assert!(Family::is_valid_invite_code(&code));
        }
    }

    #[test]
    fn test_with_new_invite_code_bumps_updated_at() {
        let now = Utc::now();
        let original = family(now);

        // Clock has not moved
        let renewed = original.with_new_invite_code(now);
        assert!(renewed.updated_at > original.updated_at);
        assert_ne!(renewed.invite_code, original.invite_code);
        assert!(Family::is_valid_invite_code(&renewed.invite_code));

        // Clock went backwards
        let renewed_again = renewed.with_new_invite_code(now - Duration::hours(1));
        assert!(renewed_again.updated_at > renewed.updated_at);

        // Clock moved forward
        let later = now + Duration::minutes(5);
        assert_eq!(renewed_again.with_new_invite_code(later).updated_at, later);
    }

    #[test]
    fn test_membership_checks() {
        let family = family(Utc::now());
        assert!(family.is_admin("user-1"));
        assert!(!family.is_admin("user-2"));
        assert!(family.is_member("user-2"));
        assert!(!family.is_member("user-3"));
    }

    #[test]
    fn test_invite_code_validation() {
        assert!(Family::is_valid_invite_code("Z9Z9Z9"));
        assert!(!Family::is_valid_invite_code("abc123"));
        assert!(!Family::is_valid_invite_code("ABC12"));
        assert!(!Family::is_valid_invite_code("ABC-12"));
    }
}
