//! SQLite-based store implementation

use deskbook_api::{Reservation, Resource, ResourceKind, ResourceStatus, TimeOfDay};
use deskbook_util::{ReservationId, ResourceId};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{Mutation, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Close the underlying connection, reporting any error SQLite raises
    /// while finalizing.
    pub fn close(self) -> StoreResult<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))?;
        conn.close().map_err(|(_, e)| StoreError::from(e))?;
        debug!("Store closed");
        Ok(())
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS resources (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'available',
                kind_json TEXT NOT NULL DEFAULT '{"type":"standard"}'
            );

            CREATE TABLE IF NOT EXISTS reservations (
                id INTEGER PRIMARY KEY,
                resource_id INTEGER NOT NULL,
                client_name TEXT NOT NULL,
                booking_date TEXT NOT NULL,
                start_hour INTEGER NOT NULL,
                start_minute INTEGER NOT NULL,
                end_hour INTEGER NOT NULL,
                end_minute INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reservations_resource
                ON reservations(resource_id, booking_date);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn load_resources(&self) -> StoreResult<Vec<Resource>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT id, name, status, kind_json FROM resources ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            let status: String = row.get(2)?;
            let kind_json: String = row.get(3)?;
            Ok((id, name, status, kind_json))
        })?;

        let mut resources = Vec::new();
        for row in rows {
            let (id, name, status, kind_json) = row?;
            let status: ResourceStatus = status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("resource {id}: {e}")))?;
            let kind: ResourceKind = serde_json::from_str(&kind_json)?;

            resources.push(Resource {
                id: ResourceId::new(id),
                name,
                status,
                kind,
            });
        }

        debug!(count = resources.len(), "Resources loaded");
        Ok(resources)
    }

    fn load_reservations(&self) -> StoreResult<Vec<Reservation>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, resource_id, client_name, booking_date,
                   start_hour, start_minute, end_hour, end_minute
            FROM reservations ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([], read_reservation_row)?;

        let mut reservations = Vec::new();
        for row in rows {
            reservations.push(row??);
        }

        debug!(count = reservations.len(), "Reservations loaded");
        Ok(reservations)
    }

    fn save_resource(&self, resource: &Resource) -> StoreResult<()> {
        save_resource(&*self.conn()?, resource)
    }

    fn delete_resource(&self, id: ResourceId) -> StoreResult<()> {
        delete_resource(&*self.conn()?, id)
    }

    fn set_resource_status(&self, id: ResourceId, status: ResourceStatus) -> StoreResult<()> {
        set_resource_status(&*self.conn()?, id, status)
    }

    fn save_reservation(&self, reservation: &Reservation) -> StoreResult<()> {
        save_reservation(&*self.conn()?, reservation)
    }

    fn delete_reservation(&self, id: ReservationId) -> StoreResult<()> {
        delete_reservation(&*self.conn()?, id)
    }

    fn commit(&self, batch: &[Mutation]) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        // Dropping `tx` on an early return rolls the batch back
        for mutation in batch {
            apply_mutation(&tx, mutation)?;
        }
        tx.commit()?;

        debug!(mutations = batch.len(), "Batch committed");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

fn apply_mutation(conn: &Connection, mutation: &Mutation) -> StoreResult<()> {
    match mutation {
        Mutation::SaveResource(resource) => save_resource(conn, resource),
        Mutation::DeleteResource(id) => delete_resource(conn, *id),
        Mutation::SetResourceStatus { id, status } => set_resource_status(conn, *id, *status),
        Mutation::SaveReservation(reservation) => save_reservation(conn, reservation),
        Mutation::DeleteReservation(id) => delete_reservation(conn, *id),
    }
}

fn save_resource(conn: &Connection, resource: &Resource) -> StoreResult<()> {
    let kind_json = serde_json::to_string(&resource.kind)?;

    conn.execute(
        r#"
        INSERT INTO resources (id, name, status, kind_json)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id)
        DO UPDATE SET name = excluded.name,
                      status = excluded.status,
                      kind_json = excluded.kind_json
        "#,
        params![
            resource.id.get(),
            resource.name,
            resource.status.as_str(),
            kind_json
        ],
    )?;

    debug!(resource_id = %resource.id, "Resource saved");
    Ok(())
}

fn delete_resource(conn: &Connection, id: ResourceId) -> StoreResult<()> {
    let changed = conn.execute("DELETE FROM resources WHERE id = ?", [id.get()])?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("resource {id}")));
    }

    debug!(resource_id = %id, "Resource deleted");
    Ok(())
}

fn set_resource_status(conn: &Connection, id: ResourceId, status: ResourceStatus) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE resources SET status = ? WHERE id = ?",
        params![status.as_str(), id.get()],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("resource {id}")));
    }

    debug!(resource_id = %id, status = %status, "Resource status set");
    Ok(())
}

fn save_reservation(conn: &Connection, reservation: &Reservation) -> StoreResult<()> {
    conn.execute(
        r#"
        INSERT INTO reservations (id, resource_id, client_name, booking_date,
                                  start_hour, start_minute, end_hour, end_minute)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id)
        DO UPDATE SET resource_id = excluded.resource_id,
                      client_name = excluded.client_name,
                      booking_date = excluded.booking_date,
                      start_hour = excluded.start_hour,
                      start_minute = excluded.start_minute,
                      end_hour = excluded.end_hour,
                      end_minute = excluded.end_minute
        "#,
        params![
            reservation.id.get(),
            reservation.resource_id.get(),
            reservation.client_name,
            reservation.date,
            reservation.start.hour(),
            reservation.start.minute(),
            reservation.end.hour(),
            reservation.end.minute(),
        ],
    )?;

    debug!(reservation_id = %reservation.id, "Reservation saved");
    Ok(())
}

fn delete_reservation(conn: &Connection, id: ReservationId) -> StoreResult<()> {
    let changed = conn.execute("DELETE FROM reservations WHERE id = ?", [id.get()])?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("reservation {id}")));
    }

    debug!(reservation_id = %id, "Reservation deleted");
    Ok(())
}

/// Row mapper; the inner result carries range errors SQLite cannot see.
fn read_reservation_row(row: &Row<'_>) -> rusqlite::Result<StoreResult<Reservation>> {
    let id: i64 = row.get(0)?;
    let resource_id: i64 = row.get(1)?;
    let client_name: String = row.get(2)?;
    let date: String = row.get(3)?;
    let start = (row.get::<_, i64>(4)?, row.get::<_, i64>(5)?);
    let end = (row.get::<_, i64>(6)?, row.get::<_, i64>(7)?);

    let (Some(start), Some(end)) = (time_of_day(start), time_of_day(end)) else {
        return Ok(Err(StoreError::Corrupt(format!(
            "reservation {id}: time out of range"
        ))));
    };

    Ok(Ok(Reservation {
        id: ReservationId::new(id),
        resource_id: ResourceId::new(resource_id),
        client_name,
        date,
        start,
        end,
    }))
}

fn time_of_day((hour, minute): (i64, i64)) -> Option<TimeOfDay> {
    TimeOfDay::new(u8::try_from(hour).ok()?, u8::try_from(minute).ok()?)
}
