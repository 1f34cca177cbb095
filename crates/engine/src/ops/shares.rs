use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    commands::InviteShareCmd,
    trip_shares::{self, ShareStatus, TripShare},
};

use super::{Engine, with_tx};

impl Engine {
    /// Invite a user to a trip; owner or admin share required.
    ///
    /// At most one active (pending or accepted, non-expired) share may exist
    /// per trip and invitee. Declined, revoked and expired shares do not
    /// block a new invitation.
    pub async fn invite_share(
        &self,
        cmd: InviteShareCmd,
        now: DateTime<Utc>,
    ) -> ResultEngine<TripShare> {
        with_tx!(self, |db_tx| {
            let trip = self
                .require_trip_admin(&db_tx, cmd.trip_id, &cmd.user_id, now)
                .await?;
            self.require_user_exists(&db_tx, &cmd.shared_with).await?;

            let existing = trip_shares::Entity::find()
                .filter(trip_shares::Column::TripId.eq(trip.id.to_string()))
                .filter(trip_shares::Column::SharedWith.eq(cmd.shared_with.clone()))
                .all(&db_tx)
                .await?;
            for model in existing {
                let share = TripShare::try_from(model)?;
                if share.is_active(now) {
                    return Err(EngineError::DuplicateActiveShare(format!(
                        "trip already shared with {}",
                        cmd.shared_with
                    )));
                }
            }

            let share = TripShare::invite(
                trip.id,
                &trip.user_id,
                &cmd.shared_with,
                cmd.permission,
                cmd.expires_at,
                now,
            )?;
            let model: trip_shares::ActiveModel = (&share).into();
            model.insert(&db_tx).await?;
            tracing::info!(
                trip_id = %trip.id,
                shared_with = %share.shared_with,
                permission = share.permission.as_str(),
                "share invited"
            );
            Ok(share)
        })
    }

    /// Accept or decline an invitation; only the invitee may respond.
    pub async fn respond_share(
        &self,
        share_id: Uuid,
        user_id: &str,
        accept: bool,
        now: DateTime<Utc>,
    ) -> ResultEngine<TripShare> {
        with_tx!(self, |db_tx| {
            let model = trip_shares::Entity::find_by_id(share_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("share not exists".to_string()))?;
            let mut share = TripShare::try_from(model)?;
            // Only the invitee may even see this share through here.
            if share.shared_with != user_id {
                return Err(EngineError::NotFound("share not exists".to_string()));
            }
            let expected_version = share.version;
            if accept {
                share.accept(now)?;
            } else {
                share.decline(now)?;
            }
            share.version = expected_version + 1;
            self.store_share_transition(&db_tx, &share, expected_version)
                .await?;
            tracing::info!(
                share_id = %share.id,
                status = share.status.as_str(),
                user_id = %user_id,
                "share responded"
            );
            Ok(share)
        })
    }

    /// Revoke a pending or accepted share; owner or admin share required.
    pub async fn revoke_share(
        &self,
        trip_id: Uuid,
        share_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<TripShare> {
        with_tx!(self, |db_tx| {
            self.require_trip_admin(&db_tx, trip_id, user_id, now)
                .await?;
            let model = trip_shares::Entity::find_by_id(share_id.to_string())
                .filter(trip_shares::Column::TripId.eq(trip_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("share not exists".to_string()))?;
            let mut share = TripShare::try_from(model)?;
            let expected_version = share.version;
            share.revoke()?;
            share.version = expected_version + 1;
            self.store_share_transition(&db_tx, &share, expected_version)
                .await?;
            tracing::info!(share_id = %share.id, user_id = %user_id, "share revoked");
            Ok(share)
        })
    }

    /// Transition every pending share past its expiry to `Expired` and
    /// return how many rows changed.
    ///
    /// Access checks already treat overdue shares as expired; this sweep only
    /// makes the stored status match.
    pub async fn expire_shares(&self, now: DateTime<Utc>) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            let rows = trip_shares::Entity::update_many()
                .col_expr(
                    trip_shares::Column::Status,
                    Expr::value(ShareStatus::Expired.as_str().to_string()),
                )
                .col_expr(
                    trip_shares::Column::Version,
                    Expr::col(trip_shares::Column::Version).add(1),
                )
                .filter(trip_shares::Column::Status.eq(ShareStatus::Pending.as_str()))
                .filter(trip_shares::Column::ExpiresAt.is_not_null())
                .filter(trip_shares::Column::ExpiresAt.lt(now))
                .exec(&db_tx)
                .await?
                .rows_affected;
            if rows > 0 {
                tracing::info!(rows, "pending shares expired");
            }
            Ok(rows)
        })
    }

    /// All shares of a trip, newest first; owner or admin share required.
    pub async fn list_shares(
        &self,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<TripShare>> {
        with_tx!(self, |db_tx| {
            self.require_trip_admin(&db_tx, trip_id, user_id, now)
                .await?;
            let models = trip_shares::Entity::find()
                .filter(trip_shares::Column::TripId.eq(trip_id.to_string()))
                .order_by_desc(trip_shares::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            models.into_iter().map(TripShare::try_from).collect()
        })
    }

    /// Pending, non-expired invitations addressed to `user_id`.
    pub async fn list_invitations(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<TripShare>> {
        with_tx!(self, |db_tx| {
            let models = trip_shares::Entity::find()
                .filter(trip_shares::Column::SharedWith.eq(user_id.to_string()))
                .filter(trip_shares::Column::Status.eq(ShareStatus::Pending.as_str()))
                .order_by_desc(trip_shares::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let share = TripShare::try_from(model)?;
                if !share.is_expired(now) {
                    out.push(share);
                }
            }
            Ok(out)
        })
    }

    /// Look up a share by its opaque token, for out-of-band invitation links.
    pub async fn share_by_token(&self, token: &str) -> ResultEngine<TripShare> {
        with_tx!(self, |db_tx| {
            let model = trip_shares::Entity::find()
                .filter(trip_shares::Column::ShareToken.eq(token.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("share not exists".to_string()))?;
            TripShare::try_from(model)
        })
    }

    /// Whether `user_id` may currently read the trip.
    pub async fn can_view(
        &self,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            Ok(self
                .require_trip_read(&db_tx, trip_id, user_id, now)
                .await
                .is_ok())
        })
    }

    /// Whether `user_id` may currently mutate the trip's contents.
    pub async fn can_edit(
        &self,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            Ok(self
                .require_trip_write(&db_tx, trip_id, user_id, now)
                .await
                .is_ok())
        })
    }

    /// Whether `user_id` may currently manage the trip's shares.
    pub async fn can_admin(
        &self,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            Ok(self
                .require_trip_admin(&db_tx, trip_id, user_id, now)
                .await
                .is_ok())
        })
    }

    async fn store_share_transition(
        &self,
        db: &DatabaseTransaction,
        share: &TripShare,
        expected_version: i32,
    ) -> ResultEngine<()> {
        let rows = trip_shares::Entity::update_many()
            .col_expr(
                trip_shares::Column::Status,
                Expr::value(share.status.as_str().to_string()),
            )
            .col_expr(
                trip_shares::Column::RespondedAt,
                Expr::value(share.responded_at),
            )
            .col_expr(trip_shares::Column::Version, Expr::value(share.version))
            .filter(trip_shares::Column::Id.eq(share.id.to_string()))
            .filter(trip_shares::Column::Version.eq(expected_version))
            .exec(db)
            .await?
            .rows_affected;
        if rows == 0 {
            return Err(EngineError::ConcurrentModification(
                "share was modified concurrently".to_string(),
            ));
        }
        Ok(())
    }
}
