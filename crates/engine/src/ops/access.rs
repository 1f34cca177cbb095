//! Permission checks shared by every operation.
//!
//! Reads fail with `NotFound` for callers without access, so a trip id leaks
//! no existence information. Mutations on a readable trip fail with
//! `PermissionDenied` instead. Share expiry is evaluated lazily against the
//! caller-supplied clock; stored status is not consulted for timing.

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, expenses,
    trip_shares::{self, SharePermission, ShareStatus, TripShare},
    trips::{self, Trip, TripVisibility},
    users,
};

use super::Engine;

impl Engine {
    async fn find_trip_by_id(
        &self,
        db: &DatabaseTransaction,
        trip_id: Uuid,
    ) -> ResultEngine<Option<trips::Model>> {
        trips::Entity::find_by_id(trip_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// The accepted, non-expired share granting `user_id` access to the trip,
    /// if one exists.
    pub(super) async fn active_share(
        &self,
        db: &DatabaseTransaction,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Option<TripShare>> {
        let model = trip_shares::Entity::find()
            .filter(trip_shares::Column::TripId.eq(trip_id.to_string()))
            .filter(trip_shares::Column::SharedWith.eq(user_id.to_string()))
            .filter(trip_shares::Column::Status.eq(ShareStatus::Accepted.as_str()))
            .one(db)
            .await?;
        let Some(model) = model else {
            return Ok(None);
        };
        let share = TripShare::try_from(model)?;
        Ok((!share.is_expired(now)).then_some(share))
    }

    /// The trip if `user_id` may read it, `NotFound` otherwise.
    pub(super) async fn require_trip_read(
        &self,
        db: &DatabaseTransaction,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Trip> {
        let model = self
            .find_trip_by_id(db, trip_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("trip not exists".to_string()))?;
        let trip = Trip::try_from(model)?;
        if trip.is_owner(user_id) || trip.visibility == TripVisibility::Public {
            return Ok(trip);
        }
        let share = self.active_share(db, trip_id, user_id, now).await?;
        if share.is_some_and(|s| s.grants(SharePermission::View, now)) {
            return Ok(trip);
        }
        Err(EngineError::NotFound("trip not exists".to_string()))
    }

    /// The trip if `user_id` may mutate its contents.
    pub(super) async fn require_trip_write(
        &self,
        db: &DatabaseTransaction,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Trip> {
        let trip = self.require_trip_read(db, trip_id, user_id, now).await?;
        if trip.is_owner(user_id) {
            return Ok(trip);
        }
        let share = self.active_share(db, trip_id, user_id, now).await?;
        if share.is_some_and(|s| s.grants(SharePermission::Edit, now)) {
            return Ok(trip);
        }
        Err(EngineError::PermissionDenied(
            "edit permission required".to_string(),
        ))
    }

    /// The trip if `user_id` may manage its shares and settings.
    pub(super) async fn require_trip_admin(
        &self,
        db: &DatabaseTransaction,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Trip> {
        let trip = self.require_trip_read(db, trip_id, user_id, now).await?;
        if trip.is_owner(user_id) {
            return Ok(trip);
        }
        let share = self.active_share(db, trip_id, user_id, now).await?;
        if share.is_some_and(|s| s.grants(SharePermission::Admin, now)) {
            return Ok(trip);
        }
        Err(EngineError::PermissionDenied(
            "admin permission required".to_string(),
        ))
    }

    /// The trip if `user_id` is its owner; shares never grant ownership.
    pub(super) async fn require_trip_owner(
        &self,
        db: &DatabaseTransaction,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Trip> {
        let trip = self.require_trip_read(db, trip_id, user_id, now).await?;
        if !trip.is_owner(user_id) {
            return Err(EngineError::PermissionDenied(
                "owner permission required".to_string(),
            ));
        }
        Ok(trip)
    }

    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<()> {
        let exists = users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::NotFound("user not exists".to_string()));
        }
        Ok(())
    }

    pub(super) async fn require_expense_in_trip(
        &self,
        db: &DatabaseTransaction,
        trip_id: Uuid,
        expense_id: Uuid,
    ) -> ResultEngine<expenses::Model> {
        expenses::Entity::find_by_id(expense_id.to_string())
            .filter(expenses::Column::TripId.eq(trip_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("expense not exists".to_string()))
    }
}
