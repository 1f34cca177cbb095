//! Trip share invitations and their lifecycle.
//!
//! A share is an invitation from a trip owner to another user, carrying a
//! permission level and an optional expiry. Permission checks only honor
//! accepted, non-expired shares; expiry is evaluated lazily against the
//! caller-supplied clock so checks stay deterministic.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharePermission {
    View,
    Edit,
    Admin,
}

impl SharePermission {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Admin => "admin",
        }
    }

    /// View < Edit < Admin; a higher level implies every lower one.
    #[must_use]
    const fn rank(self) -> u8 {
        match self {
            Self::View => 0,
            Self::Edit => 1,
            Self::Admin => 2,
        }
    }

    #[must_use]
    pub const fn allows(self, required: SharePermission) -> bool {
        self.rank() >= required.rank()
    }
}

impl TryFrom<&str> for SharePermission {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "view" => Ok(Self::View),
            "edit" => Ok(Self::Edit),
            "admin" => Ok(Self::Admin),
            other => Err(EngineError::InvalidEnumValue(format!(
                "invalid share permission: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Expired,
    Revoked,
}

impl ShareStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }

    /// Declined, Expired and Revoked accept no further transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Declined | Self::Expired | Self::Revoked)
    }
}

impl TryFrom<&str> for ShareStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            other => Err(EngineError::InvalidEnumValue(format!(
                "invalid share status: {other}"
            ))),
        }
    }
}

/// An invitation to collaborate on a trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TripShare {
    pub id: Uuid,
    pub trip_id: Uuid,
    /// Username of the trip owner who sent the invitation.
    pub owner_id: String,
    /// Username of the invited user.
    pub shared_with: String,
    pub permission: SharePermission,
    pub status: ShareStatus,
    /// Opaque token for accepting the invitation out of band.
    pub share_token: String,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version, bumped on every stored update.
    pub version: i32,
}

impl TripShare {
    pub fn invite(
        trip_id: Uuid,
        owner_id: &str,
        shared_with: &str,
        permission: SharePermission,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if owner_id == shared_with {
            return Err(EngineError::Validation(
                "cannot share a trip with its owner".to_string(),
            ));
        }
        if let Some(expiry) = expires_at
            && expiry <= now
        {
            return Err(EngineError::Validation(
                "expires_at must be in the future".to_string(),
            ));
        }
        let id = Uuid::new_v4();
        Ok(Self {
            id,
            trip_id,
            owner_id: owner_id.to_string(),
            shared_with: shared_with.to_string(),
            permission,
            status: ShareStatus::Pending,
            share_token: generate_token(),
            created_at: now,
            responded_at: None,
            expires_at,
            version: 0,
        })
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry < now)
    }

    /// A share still occupying the (trip, invitee) slot: pending or accepted
    /// and not past its expiry.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, ShareStatus::Pending | ShareStatus::Accepted)
            && !self.is_expired(now)
    }

    /// Whether this share currently grants `required` to the invitee.
    ///
    /// Only accepted, non-expired shares grant anything; a pending invitation
    /// grants nothing until accepted.
    #[must_use]
    pub fn grants(&self, required: SharePermission, now: DateTime<Utc>) -> bool {
        self.status == ShareStatus::Accepted
            && !self.is_expired(now)
            && self.permission.allows(required)
    }

    /// Pending -> Accepted (invitee action).
    pub fn accept(&mut self, now: DateTime<Utc>) -> ResultEngine<()> {
        self.respond(ShareStatus::Accepted, now)
    }

    /// Pending -> Declined (invitee action, terminal).
    pub fn decline(&mut self, now: DateTime<Utc>) -> ResultEngine<()> {
        self.respond(ShareStatus::Declined, now)
    }

    fn respond(&mut self, target: ShareStatus, now: DateTime<Utc>) -> ResultEngine<()> {
        if self.status != ShareStatus::Pending {
            return Err(EngineError::InvalidTransition(format!(
                "cannot respond to a {} share",
                self.status.as_str()
            )));
        }
        if self.is_expired(now) {
            return Err(EngineError::InvalidTransition(
                "invitation has expired".to_string(),
            ));
        }
        self.status = target;
        self.responded_at = Some(now);
        Ok(())
    }

    /// Pending|Accepted -> Revoked (owner/admin action, terminal).
    pub fn revoke(&mut self) -> ResultEngine<()> {
        if self.status.is_terminal() {
            return Err(EngineError::InvalidTransition(format!(
                "cannot revoke a {} share",
                self.status.as_str()
            )));
        }
        self.status = ShareStatus::Revoked;
        Ok(())
    }

    /// Pending -> Expired (sweep action).
    pub fn expire(&mut self) -> ResultEngine<()> {
        if self.status != ShareStatus::Pending {
            return Err(EngineError::InvalidTransition(format!(
                "cannot expire a {} share",
                self.status.as_str()
            )));
        }
        self.status = ShareStatus::Expired;
        Ok(())
    }
}

/// URL-safe opaque token; 32 random bytes, base64 without padding.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "trip_shares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub trip_id: String,
    pub owner_id: String,
    pub shared_with: String,
    pub permission: String,
    pub status: String,
    #[sea_orm(unique)]
    pub share_token: String,
    pub created_at: DateTimeUtc,
    pub responded_at: Option<DateTimeUtc>,
    pub expires_at: Option<DateTimeUtc>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trips::Entity",
        from = "Column::TripId",
        to = "super::trips::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Trips,
}

impl Related<super::trips::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TripShare> for ActiveModel {
    fn from(share: &TripShare) -> Self {
        Self {
            id: ActiveValue::Set(share.id.to_string()),
            trip_id: ActiveValue::Set(share.trip_id.to_string()),
            owner_id: ActiveValue::Set(share.owner_id.clone()),
            shared_with: ActiveValue::Set(share.shared_with.clone()),
            permission: ActiveValue::Set(share.permission.as_str().to_string()),
            status: ActiveValue::Set(share.status.as_str().to_string()),
            share_token: ActiveValue::Set(share.share_token.clone()),
            created_at: ActiveValue::Set(share.created_at),
            responded_at: ActiveValue::Set(share.responded_at),
            expires_at: ActiveValue::Set(share.expires_at),
            version: ActiveValue::Set(share.version),
        }
    }
}

impl TryFrom<Model> for TripShare {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "trip_share")?,
            trip_id: parse_uuid(&model.trip_id, "trip")?,
            owner_id: model.owner_id,
            shared_with: model.shared_with,
            permission: SharePermission::try_from(model.permission.as_str())?,
            status: ShareStatus::try_from(model.status.as_str())?,
            share_token: model.share_token,
            created_at: model.created_at,
            responded_at: model.responded_at,
            expires_at: model.expires_at,
            version: model.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn share(expires_at: Option<DateTime<Utc>>) -> TripShare {
        TripShare::invite(
            Uuid::new_v4(),
            "alice",
            "bob",
            SharePermission::Edit,
            expires_at,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn permission_ordering() {
        assert!(SharePermission::Admin.allows(SharePermission::View));
        assert!(SharePermission::Admin.allows(SharePermission::Edit));
        assert!(SharePermission::Edit.allows(SharePermission::View));
        assert!(!SharePermission::View.allows(SharePermission::Edit));
        assert!(!SharePermission::Edit.allows(SharePermission::Admin));
    }

    #[test]
    fn self_share_rejected() {
        let err = TripShare::invite(
            Uuid::new_v4(),
            "alice",
            "alice",
            SharePermission::View,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn past_expiry_rejected_at_invite() {
        let now = Utc::now();
        let err = TripShare::invite(
            Uuid::new_v4(),
            "alice",
            "bob",
            SharePermission::View,
            Some(now - Duration::hours(1)),
            now,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn pending_grants_nothing_until_accepted() {
        let now = Utc::now();
        let mut s = share(None);
        assert!(!s.grants(SharePermission::View, now));
        s.accept(now).unwrap();
        assert!(s.grants(SharePermission::View, now));
        assert!(s.grants(SharePermission::Edit, now));
        assert!(!s.grants(SharePermission::Admin, now));
        assert!(s.responded_at.is_some());
    }

    #[test]
    fn expired_share_grants_nothing() {
        let now = Utc::now();
        let mut s = share(Some(now + Duration::hours(1)));
        s.accept(now).unwrap();
        let later = now + Duration::hours(2);
        assert!(s.is_expired(later));
        assert!(!s.grants(SharePermission::View, later));
        // Stored status is untouched; expiry is evaluated lazily.
        assert_eq!(s.status, ShareStatus::Accepted);
    }

    #[test]
    fn respond_after_expiry_rejected() {
        let now = Utc::now();
        let mut s = share(Some(now + Duration::hours(1)));
        let later = now + Duration::hours(2);
        assert!(matches!(
            s.accept(later),
            Err(EngineError::InvalidTransition(_))
        ));
        assert!(matches!(
            s.decline(later),
            Err(EngineError::InvalidTransition(_))
        ));
    }

    #[test]
    fn decline_is_terminal() {
        let now = Utc::now();
        let mut s = share(None);
        s.decline(now).unwrap();
        assert!(s.accept(now).is_err());
        assert!(s.expire().is_err());
        assert!(s.revoke().is_err());
        assert!(!s.is_active(now));
    }

    #[test]
    fn revoke_from_pending_and_accepted() {
        let now = Utc::now();
        let mut pending = share(None);
        pending.revoke().unwrap();
        assert_eq!(pending.status, ShareStatus::Revoked);

        let mut accepted = share(None);
        accepted.accept(now).unwrap();
        accepted.revoke().unwrap();
        assert!(!accepted.grants(SharePermission::View, now));
    }

    #[test]
    fn expire_only_from_pending() {
        let now = Utc::now();
        let mut s = share(None);
        s.accept(now).unwrap();
        assert!(s.expire().is_err());
    }

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = share(None);
        let b = share(None);
        assert_ne!(a.share_token, b.share_token);
        assert!(a
            .share_token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
