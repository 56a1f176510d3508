use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{types::Type, Connection, OptionalExtension, Row};
use sprout_core::PlantId;
use tracing::debug;

use crate::db::init_db;
use crate::error::{GardenError, Result};
use crate::types::{HealthStatus, NewPlant, Plant};

/// Durable table of plant records.
pub trait PlantStore: Send + Sync {
    /// Insert one plant atomically and return its assigned id.
    fn insert(&self, plant: &NewPlant) -> Result<PlantId>;

    /// Snapshot of every plant, ordered by id.
    fn list_all(&self) -> Result<Vec<Plant>>;

    fn get_by_id(&self, id: PlantId) -> Result<Option<Plant>>;

    /// Persist the mutable fields of `plants` in one transaction.
    ///
    /// Each row only updates if it still carries the revision it was read
    /// with; otherwise nothing is written and [`GardenError::Conflict`] is
    /// returned.
    fn save_batch(&self, plants: &[Plant]) -> Result<()>;
}

/// SQLite-backed [`PlantStore`].
pub struct SqlitePlantStore {
    db: Mutex<Connection>,
}

impl SqlitePlantStore {
    /// Wrap a connection, creating the `plants` table if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn db(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| GardenError::LockPoisoned)
    }
}

impl PlantStore for SqlitePlantStore {
    fn insert(&self, plant: &NewPlant) -> Result<PlantId> {
        let db = self.db()?;
        db.execute(
            "INSERT INTO plants (plant_type, water_level, growth_points, health_status,
                                 planted_at, revision)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            rusqlite::params![
                plant.plant_type,
                plant.water_level,
                plant.growth_points,
                plant.health_status.to_string(),
                plant.planted_at.to_rfc3339(),
            ],
        )?;
        Ok(PlantId(db.last_insert_rowid()))
    }

    fn list_all(&self) -> Result<Vec<Plant>> {
        let db = self.db()?;
        let mut stmt = db.prepare(
            "SELECT id, plant_type, water_level, growth_points, health_status,
                    planted_at, revision
             FROM plants ORDER BY id",
        )?;
        let plants = stmt
            .query_map([], row_to_plant)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(plants)
    }

    fn get_by_id(&self, id: PlantId) -> Result<Option<Plant>> {
        let db = self.db()?;
        let plant = db
            .query_row(
                "SELECT id, plant_type, water_level, growth_points, health_status,
                        planted_at, revision
                 FROM plants WHERE id = ?1",
                [id.get()],
                row_to_plant,
            )
            .optional()?;
        Ok(plant)
    }

    fn save_batch(&self, plants: &[Plant]) -> Result<()> {
        if plants.is_empty() {
            return Ok(());
        }
        let mut db = self.db()?;
        let tx = db.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE plants SET water_level = ?1, growth_points = ?2, health_status = ?3,
                                   revision = revision + 1
                 WHERE id = ?4 AND revision = ?5",
            )?;
            for plant in plants {
                let n = stmt.execute(rusqlite::params![
                    plant.water_level,
                    plant.growth_points,
                    plant.health_status.to_string(),
                    plant.id.get(),
                    plant.revision,
                ])?;
                if n == 0 {
                    // Dropping `tx` without commit rolls the batch back.
                    return Err(GardenError::Conflict { id: plant.id });
                }
            }
        }
        tx.commit()?;
        debug!(count = plants.len(), "plant batch saved");
        Ok(())
    }
}

fn row_to_plant(row: &Row<'_>) -> rusqlite::Result<Plant> {
    let status: String = row.get(4)?;
    let health_status: HealthStatus = status
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into()))?;
    let planted_at: String = row.get(5)?;
    let planted_at = DateTime::parse_from_rfc3339(&planted_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(Plant {
        id: PlantId(row.get(0)?),
        plant_type: row.get(1)?,
        water_level: row.get(2)?,
        growth_points: row.get(3)?,
        health_status,
        planted_at,
        revision: row.get(6)?,
    })
}
