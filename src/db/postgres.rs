use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};

use super::{Store, StoreTx};
use crate::error::{HallError, HallResult};
use crate::models::booking::{
    Booking, BookingDetails, BookingRequest, BookingStats, BookingStatus,
};
use crate::models::user::preapproved::PreapprovedUser;
use crate::models::user::session::Session;
use crate::models::user::{NewUser, Role, User, UserStatus};

const BOOKING_DETAILS: &str = "SELECT bookings.*, users.name AS user_name, \
     users.email AS user_email, users.role AS user_role \
     FROM bookings JOIN users ON users.id = bookings.user_id";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> HallResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// A Postgres transaction, rolled back when dropped uncommitted.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn user_with_id(&mut self, id: i32) -> HallResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(Into::into)
    }

    async fn user_with_email(&mut self, email: &str) -> HallResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(Into::into)
    }

    async fn users_with_status(&mut self, status: UserStatus) -> HallResult<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE status = $1 ORDER BY id")
            .bind(status)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(Into::into)
    }

    async fn insert_user(&mut self, user: &NewUser, now: OffsetDateTime) -> HallResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, pass_hash, role, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.pass_hash)
        .bind(user.role)
        .bind(user.status)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|error| {
            HallError::on_duplicate(error, || "User with this email already exists.".to_owned())
        })
    }

    async fn upsert_user(&mut self, user: &NewUser, now: OffsetDateTime) -> HallResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, pass_hash, role, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (email) DO UPDATE SET
                 name = EXCLUDED.name,
                 pass_hash = EXCLUDED.pass_hash,
                 role = EXCLUDED.role,
                 status = EXCLUDED.status
             RETURNING *",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.pass_hash)
        .bind(user.role)
        .bind(user.status)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(Into::into)
    }

    async fn set_user_status(&mut self, id: i32, status: UserStatus) -> HallResult<User> {
        sqlx::query_as::<_, User>("UPDATE users SET status = $1 WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(Into::into)
    }

    async fn preapproved_with_email(
        &mut self,
        email: &str,
    ) -> HallResult<Option<PreapprovedUser>> {
        sqlx::query_as::<_, PreapprovedUser>("SELECT * FROM preapproved_users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(Into::into)
    }

    async fn all_preapproved(&mut self) -> HallResult<Vec<PreapprovedUser>> {
        sqlx::query_as::<_, PreapprovedUser>("SELECT * FROM preapproved_users ORDER BY name, id")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(Into::into)
    }

    async fn insert_preapproved(
        &mut self,
        name: &str,
        email: &str,
        role: Role,
        now: OffsetDateTime,
    ) -> HallResult<PreapprovedUser> {
        sqlx::query_as::<_, PreapprovedUser>(
            "INSERT INTO preapproved_users (name, email, role, is_registered, created_at)
             VALUES ($1, $2, $3, FALSE, $4) RETURNING *",
        )
        .bind(name)
        .bind(email)
        .bind(role)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|error| {
            HallError::on_duplicate(error, || format!("{email} is already pre-approved."))
        })
    }

    async fn mark_preapproved_registered(&mut self, email: &str) -> HallResult<()> {
        sqlx::query("UPDATE preapproved_users SET is_registered = TRUE WHERE email = $1")
            .bind(email)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn delete_preapproved(&mut self, id: i32) -> HallResult<bool> {
        let result = sqlx::query("DELETE FROM preapproved_users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_session(&mut self, session: &Session) -> HallResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn session_with_token(&mut self, token: &str) -> HallResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(Into::into)
    }

    async fn delete_sessions_for(&mut self, user_id: i32) -> HallResult<()> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn delete_expired_sessions(&mut self, now: OffsetDateTime) -> HallResult<()> {
        sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn lock_date(&mut self, date: Date) -> HallResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(i64::from(date.to_julian_day()))
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn booking_with_id(&mut self, id: i32) -> HallResult<Option<BookingDetails>> {
        sqlx::query_as::<_, BookingDetails>(&format!("{BOOKING_DETAILS} WHERE bookings.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(Into::into)
    }

    async fn bookings_on(&mut self, date: Date) -> HallResult<Vec<Booking>> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE date = $1 ORDER BY start_time")
            .bind(date)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(Into::into)
    }

    async fn bookings_for_user(&mut self, user_id: i32) -> HallResult<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(Into::into)
    }

    async fn bookings_with_status(
        &mut self,
        status: BookingStatus,
    ) -> HallResult<Vec<BookingDetails>> {
        sqlx::query_as::<_, BookingDetails>(&format!(
            "{BOOKING_DETAILS} WHERE bookings.status = $1 \
             ORDER BY bookings.created_at, bookings.id"
        ))
        .bind(status)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(Into::into)
    }

    async fn all_bookings(&mut self) -> HallResult<Vec<BookingDetails>> {
        sqlx::query_as::<_, BookingDetails>(&format!(
            "{BOOKING_DETAILS} ORDER BY bookings.created_at DESC, bookings.id DESC"
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(Into::into)
    }

    async fn approved_from(&mut self, date: Date) -> HallResult<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE status = 'approved' AND date >= $1
             ORDER BY date, start_time",
        )
        .bind(date)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(Into::into)
    }

    async fn booking_stats(&mut self) -> HallResult<BookingStats> {
        sqlx::query_as::<_, BookingStats>(
            "SELECT
                 COUNT(*) AS total_bookings,
                 COUNT(*) FILTER (WHERE status = 'pending') AS pending_bookings,
                 COUNT(*) FILTER (WHERE status = 'approved') AS approved_bookings,
                 COUNT(*) FILTER (WHERE status = 'rejected') AS rejected_bookings,
                 COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_bookings
             FROM bookings",
        )
        .fetch_one(&mut *self.tx)
        .await
        .map_err(Into::into)
    }

    async fn insert_booking(
        &mut self,
        user_id: i32,
        request: &BookingRequest,
        now: OffsetDateTime,
    ) -> HallResult<Booking> {
        sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (user_id, club_name, title, description, date, start_time,
                 end_time, status, terms_accepted, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9, $9) RETURNING *",
        )
        .bind(user_id)
        .bind(&request.club_name)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.slot.date)
        .bind(request.slot.start)
        .bind(request.slot.end)
        .bind(request.terms_accepted)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(Into::into)
    }

    async fn update_booking(
        &mut self,
        id: i32,
        request: &BookingRequest,
        now: OffsetDateTime,
    ) -> HallResult<Booking> {
        sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET club_name = $1, title = $2, description = $3, date = $4,
                 start_time = $5, end_time = $6, terms_accepted = $7, updated_at = $8
             WHERE id = $9 RETURNING *",
        )
        .bind(&request.club_name)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.slot.date)
        .bind(request.slot.start)
        .bind(request.slot.end)
        .bind(request.terms_accepted)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(Into::into)
    }

    async fn set_booking_status(
        &mut self,
        id: i32,
        status: BookingStatus,
        admin_comments: Option<&str>,
        now: OffsetDateTime,
    ) -> HallResult<Booking> {
        sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = $1, admin_comments = $2, updated_at = $3
             WHERE id = $4 RETURNING *",
        )
        .bind(status)
        .bind(admin_comments)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(Into::into)
    }

    async fn commit(self: Box<Self>) -> HallResult<()> {
        self.tx.commit().await.map_err(Into::into)
    }
}
