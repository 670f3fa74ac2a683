//! `PostgreSQL` store for events, users and sessions.

use crate::rows::{
    EVENT_COLUMNS, EVENT_ORDER, EventRow, SessionRow, UserRow, count_to_db, price_to_db,
    version_from_db, version_to_db,
};
use eventbook_core::event::EventRecord;
use eventbook_core::session::Session;
use eventbook_core::store::{
    BookingStore, EventCatalog, EventRevision, RecordRef, SessionStore, SpotReservation,
    StoreError, StoreFuture,
};
use eventbook_core::types::{EventId, SessionId, UserId, Version, Versioned};
use eventbook_core::user::UserRecord;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

fn db_error(context: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::Database(format!("{context}: {e}"))
}

fn conflict(record: RecordRef, expected: Version, actual: Version) -> StoreError {
    metrics::counter!("eventbook_store_conflicts_total", "record" => match record {
        RecordRef::Event(_) => "event",
        RecordRef::User(_) => "user",
    })
    .increment(1);
    StoreError::ConcurrencyConflict {
        record,
        expected,
        actual,
    }
}

/// `PostgreSQL` implementation of every eventbook store trait.
///
/// Each conditional write runs in one transaction whose `UPDATE ... WHERE
/// version = $expected` both checks and claims the row; a concurrent writer
/// that committed first makes the `WHERE` miss and the transaction roll back.
///
/// # Example
///
/// ```no_run
/// use eventbook_postgres::PostgresStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresStore::connect("postgres://localhost/eventbook").await?;
/// store.migrate().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(db_error("Failed to connect"))?;
        Ok(Self::from_pool(pool))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))
    }

    /// Store a session issued by the sign-in service.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    pub async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO sessions (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET user_id = $2, expires_at = $3
            ",
        )
        .bind(session.session_id.as_uuid())
        .bind(session.user_id.as_uuid())
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to store session"))?;
        Ok(())
    }

    async fn fetch_event(&self, event_id: EventId) -> Result<Option<Versioned<EventRecord>>, StoreError> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1"))
                .bind(event_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to load event"))?;
        row.map(Versioned::try_from).transpose()
    }

    async fn fetch_events(&self, organizer: Option<UserId>) -> Result<Vec<EventRecord>, StoreError> {
        let rows: Vec<EventRow> = match organizer {
            Some(organizer) => sqlx::query_as(&format!(
                "SELECT {EVENT_COLUMNS} FROM events e WHERE e.organizer_id = $1 {EVENT_ORDER}"
            ))
            .bind(organizer.as_uuid())
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events e {EVENT_ORDER}"))
                .fetch_all(&self.pool)
                .await,
        }
        .map_err(db_error("Failed to list events"))?;

        rows.into_iter()
            .map(|row| Versioned::try_from(row).map(|versioned| versioned.record))
            .collect()
    }

    async fn fetch_user(&self, user_id: UserId) -> Result<Option<Versioned<UserRecord>>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT u.id, u.version,
                   ARRAY(SELECT b.event_id FROM user_bookings b
                         WHERE b.user_id = u.id ORDER BY b.position) AS booked_events
            FROM users u
            WHERE u.id = $1
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load user"))?;
        row.map(Versioned::try_from).transpose()
    }

    /// Explain why a conditional event update matched no row.
    async fn diagnose_event_miss(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
        expected: Version,
        new_max: Option<i32>,
    ) -> StoreError {
        let row: Result<Option<(i64, i32, i32)>, _> = sqlx::query_as(
            "SELECT version, current_attendees, max_attendees FROM events WHERE id = $1",
        )
        .bind(event_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await;

        match row {
            Err(e) => db_error("Failed to inspect event")(e),
            Ok(None) => StoreError::EventNotFound(event_id),
            Ok(Some((version, current, max))) => match version_from_db(version) {
                Err(e) => e,
                Ok(actual) if actual != expected => conflict(RecordRef::Event(event_id), expected, actual),
                Ok(_) => match new_max {
                    Some(new_max) => StoreError::ConstraintViolation(format!(
                        "capacity {new_max} below {current} current attendees"
                    )),
                    None => StoreError::ConstraintViolation(format!(
                        "event {event_id} is at capacity {max}"
                    )),
                },
            },
        }
    }

    async fn reserve(&self, reservation: SpotReservation) -> Result<Version, StoreError> {
        let SpotReservation {
            event_id,
            user_id,
            expected_event_version,
            expected_user_version,
            booked_at,
        } = reservation;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        // Step 1: claim the spot; misses on a stale version or a full event
        let claimed: Option<(i64,)> = sqlx::query_as(
            r"
            UPDATE events
            SET current_attendees = current_attendees + 1,
                version = version + 1,
                updated_at = $3
            WHERE id = $1 AND version = $2 AND current_attendees < max_attendees
            RETURNING version
            ",
        )
        .bind(event_id.as_uuid())
        .bind(version_to_db(expected_event_version)?)
        .bind(booked_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to claim spot"))?;

        let Some((new_event_version,)) = claimed else {
            let error =
                Self::diagnose_event_miss(&mut tx, event_id, expected_event_version, None).await;
            let _ = tx.rollback().await; // Ignore rollback errors
            return Err(error);
        };

        // Step 2: attendee entry
        let inserted = sqlx::query(
            r"
            INSERT INTO event_attendees (event_id, user_id, booked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(booked_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to insert attendee"))?;

        if inserted.rows_affected() == 0 {
            let _ = tx.rollback().await;
            return Err(StoreError::ConstraintViolation(format!(
                "user {user_id} already attends event {event_id}"
            )));
        }

        // Step 3: claim the user record at the expected version
        let user_claimed = if expected_user_version.is_initial() {
            sqlx::query("INSERT INTO users (id, version) VALUES ($1, 1) ON CONFLICT DO NOTHING")
                .bind(user_id.as_uuid())
                .execute(&mut *tx)
                .await
        } else {
            sqlx::query("UPDATE users SET version = version + 1 WHERE id = $1 AND version = $2")
                .bind(user_id.as_uuid())
                .bind(version_to_db(expected_user_version)?)
                .execute(&mut *tx)
                .await
        }
        .map_err(db_error("Failed to claim user"))?;

        if user_claimed.rows_affected() == 0 {
            let actual: Option<(i64,)> = sqlx::query_as("SELECT version FROM users WHERE id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to inspect user"))?;
            let _ = tx.rollback().await;
            let actual = actual.map_or(Ok(Version::INITIAL), |(v,)| version_from_db(v))?;
            return Err(conflict(RecordRef::User(user_id), expected_user_version, actual));
        }

        // Step 4: booked-events entry, appended after the user's last booking
        sqlx::query(
            r"
            INSERT INTO user_bookings (user_id, event_id, position, booked_at)
            VALUES ($1, $2,
                    (SELECT COALESCE(MAX(position), 0) + 1 FROM user_bookings WHERE user_id = $1),
                    $3)
            ",
        )
        .bind(user_id.as_uuid())
        .bind(event_id.as_uuid())
        .bind(booked_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to append booking"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit booking"))?;

        let version = version_from_db(new_event_version)?;
        tracing::debug!(%event_id, %user_id, %version, "Spot reserved");
        Ok(version)
    }

    async fn insert(&self, event: EventRecord) -> Result<Version, StoreError> {
        let version = Version::new(1);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let result = sqlx::query(
            r"
            INSERT INTO events (
                id, details, organizer_id, organizer_name, organizer_email,
                price_minor, max_attendees, current_attendees, version,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(event.id.as_uuid())
        .bind(Json(&event.details))
        .bind(event.organizer.user_id.as_uuid())
        .bind(&event.organizer.name)
        .bind(&event.organizer.email)
        .bind(price_to_db(event.pricing)?)
        .bind(count_to_db(event.max_attendees, "max_attendees")?)
        .bind(count_to_db(event.current_attendees, "current_attendees")?)
        .bind(version_to_db(version)?)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = result {
            let duplicate = matches!(&e, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
            if duplicate {
                return Err(StoreError::DuplicateEvent(event.id));
            }
            return Err(db_error("Failed to insert event")(e));
        }

        for attendee in &event.attendees {
            sqlx::query(
                "INSERT INTO event_attendees (event_id, user_id, booked_at) VALUES ($1, $2, $3)",
            )
            .bind(event.id.as_uuid())
            .bind(attendee.as_uuid())
            .bind(event.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert attendee"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit event"))?;
        Ok(version)
    }

    async fn revise(&self, revision: EventRevision) -> Result<Version, StoreError> {
        let max_attendees = count_to_db(revision.max_attendees, "max_attendees")?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let updated: Option<(i64,)> = sqlx::query_as(
            r"
            UPDATE events
            SET details = $3, price_minor = $4, max_attendees = $5,
                updated_at = $6, version = version + 1
            WHERE id = $1 AND version = $2 AND current_attendees <= $5
            RETURNING version
            ",
        )
        .bind(revision.event_id.as_uuid())
        .bind(version_to_db(revision.expected_version)?)
        .bind(Json(&revision.details))
        .bind(price_to_db(revision.pricing)?)
        .bind(max_attendees)
        .bind(revision.updated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to update event"))?;

        let Some((version,)) = updated else {
            let error = Self::diagnose_event_miss(
                &mut tx,
                revision.event_id,
                revision.expected_version,
                Some(max_attendees),
            )
            .await;
            let _ = tx.rollback().await;
            return Err(error);
        };

        tx.commit()
            .await
            .map_err(db_error("Failed to commit event update"))?;
        version_from_db(version)
    }

    async fn session(&self, session_id: SessionId) -> Result<Option<Session>, StoreError> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT id, user_id, expires_at FROM sessions WHERE id = $1")
                .bind(session_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to load session"))?;
        Ok(row.map(Session::from))
    }
}

impl BookingStore for PostgresStore {
    fn load_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Versioned<EventRecord>>> {
        Box::pin(self.fetch_event(event_id))
    }

    fn load_user(&self, user_id: UserId) -> StoreFuture<'_, Option<Versioned<UserRecord>>> {
        Box::pin(self.fetch_user(user_id))
    }

    fn reserve_spot(&self, reservation: SpotReservation) -> StoreFuture<'_, Version> {
        Box::pin(self.reserve(reservation))
    }
}

impl EventCatalog for PostgresStore {
    fn insert_event(&self, event: EventRecord) -> StoreFuture<'_, Version> {
        Box::pin(self.insert(event))
    }

    fn update_event(&self, revision: EventRevision) -> StoreFuture<'_, Version> {
        Box::pin(self.revise(revision))
    }

    fn list_events(&self) -> StoreFuture<'_, Vec<EventRecord>> {
        Box::pin(self.fetch_events(None))
    }

    fn events_by_organizer(&self, organizer: UserId) -> StoreFuture<'_, Vec<EventRecord>> {
        Box::pin(self.fetch_events(Some(organizer)))
    }
}

impl SessionStore for PostgresStore {
    fn find_session(&self, session_id: SessionId) -> StoreFuture<'_, Option<Session>> {
        Box::pin(self.session(session_id))
    }
}
