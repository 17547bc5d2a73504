// src/models/team_request.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::OwnerCheck;

/// One prospective teammate, embedded in a request. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub tech_field: Vec<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub planguage: Vec<String>,
    /// Whether the requester already knows this person.
    #[serde(default)]
    pub already_know: Option<bool>,
}

/// A stored team formation request, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRequest {
    pub id: String,
    pub user_personal_phone: Option<String>,
    pub user_name: String,
    pub user_gender: Option<String>,
    pub user_abstract: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    pub owner_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of POST and PUT. Client-supplied `id` and timestamps are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeamRequestPayload {
    #[serde(default)]
    pub user_personal_phone: Option<String>,
    pub user_name: String,
    #[serde(default)]
    pub user_gender: Option<String>,
    #[serde(default)]
    pub user_abstract: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(alias = "ownerFingerprint")]
    pub owner_fingerprint: String,
}

/// Body of DELETE.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteRequestPayload {
    #[serde(alias = "ownerFingerprint")]
    pub owner_fingerprint: String,
}

impl TeamRequest {
    /// Builds a fresh record from a payload. Both timestamps are set to `now`.
    pub fn from_payload(id: String, payload: TeamRequestPayload, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_personal_phone: payload.user_personal_phone,
            user_name: payload.user_name,
            user_gender: payload.user_gender,
            user_abstract: payload.user_abstract,
            members: payload.members,
            owner_fingerprint: payload.owner_fingerprint,
            created_at: now,
            updated_at: now,
        }
    }

    /// Exact, case-sensitive fingerprint comparison.
    pub fn is_owned_by(&self, fingerprint: &str) -> bool {
        self.owner_fingerprint == fingerprint
    }

    /// Applies a full-replacement update. `id` and `created_at` are kept,
    /// `updated_at` always moves forward.
    ///
    /// With [`OwnerCheck::Payload`] the payload's fingerprint is written back
    /// along with every other field. With [`OwnerCheck::Stored`] the stored
    /// fingerprint is left untouched.
    pub fn overwrite(&mut self, payload: TeamRequestPayload, check: OwnerCheck) {
        self.user_personal_phone = payload.user_personal_phone;
        self.user_name = payload.user_name;
        self.user_gender = payload.user_gender;
        self.user_abstract = payload.user_abstract;
        self.members = payload.members;
        if check == OwnerCheck::Payload {
            self.owner_fingerprint = payload.owner_fingerprint;
        }
        self.updated_at = next_updated_at(self.updated_at);
    }
}

/// Current time truncated to the millisecond precision MongoDB stores.
pub fn now_millis() -> DateTime<Utc> {
    truncate_millis(Utc::now())
}

pub fn truncate_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

/// Next `updated_at` value, strictly after `previous` even when two saves
/// land in the same millisecond or the stored clock is ahead of ours.
pub fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_millis();
    let floor = previous + Duration::milliseconds(1);
    if now < floor {
        floor
    } else {
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(name: &str, fingerprint: &str) -> TeamRequestPayload {
        TeamRequestPayload {
            user_personal_phone: Some("010-1234-5678".to_string()),
            user_name: name.to_string(),
            user_gender: None,
            user_abstract: Some("looking for a backend dev".to_string()),
            members: vec![Member {
                tech_field: vec!["web".to_string()],
                planguage: vec!["rust".to_string()],
                ..Member::default()
            }],
            owner_fingerprint: fingerprint.to_string(),
        }
    }

    #[test]
    fn payload_accepts_camel_case_fingerprint() {
        let parsed: TeamRequestPayload = serde_json::from_value(json!({
            "user_name": "Alice",
            "ownerFingerprint": "f1"
        }))
        .unwrap();

        assert_eq!(parsed.owner_fingerprint, "f1");
        assert!(parsed.members.is_empty());
        assert!(parsed.user_personal_phone.is_none());
    }

    #[test]
    fn payload_requires_user_name_and_fingerprint() {
        assert!(serde_json::from_value::<TeamRequestPayload>(json!({ "owner_fingerprint": "f1" })).is_err());
        assert!(serde_json::from_value::<TeamRequestPayload>(json!({ "user_name": "Alice" })).is_err());
    }

    #[test]
    fn member_defaults_to_empty() {
        let member: Member = serde_json::from_value(json!({})).unwrap();
        assert_eq!(member, Member::default());
    }

    #[test]
    fn overwrite_keeps_identity_and_creation_time() {
        let created = now_millis();
        let mut request = TeamRequest::from_payload("abc".to_string(), payload("Alice", "f1"), created);

        request.overwrite(payload("Bob", "f1"), OwnerCheck::Payload);

        assert_eq!(request.id, "abc");
        assert_eq!(request.user_name, "Bob");
        assert_eq!(request.created_at, created);
        assert!(request.updated_at > created);
    }

    #[test]
    fn overwrite_fingerprint_follows_owner_check() {
        let now = now_millis();
        let mut legacy = TeamRequest::from_payload("a".to_string(), payload("Alice", "f1"), now);
        let mut strict = legacy.clone();

        legacy.overwrite(payload("Alice", "f2"), OwnerCheck::Payload);
        strict.overwrite(payload("Alice", "f2"), OwnerCheck::Stored);

        assert_eq!(legacy.owner_fingerprint, "f2");
        assert_eq!(strict.owner_fingerprint, "f1");
    }

    #[test]
    fn updated_at_advances_past_future_timestamps() {
        let ahead = now_millis() + Duration::seconds(30);
        assert_eq!(next_updated_at(ahead), ahead + Duration::milliseconds(1));

        let behind = now_millis() - Duration::seconds(30);
        assert!(next_updated_at(behind) > behind + Duration::milliseconds(1));
    }

    #[test]
    fn truncation_drops_sub_millisecond_precision() {
        let at = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        assert_eq!(truncate_millis(at).timestamp_subsec_nanos(), 123_000_000);
    }
}
