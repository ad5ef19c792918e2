//! Planner settings persistence.
//!
//! # Invariants
//! - Missing keys fall back to `PlannerSettings::default()` values.
//! - `save` validates before writing and replaces all keys in one transaction.

use crate::model::settings::PlannerSettings;
use crate::repo::error::{RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};

const KEY_DAILY_CAPACITY: &str = "daily_capacity_minutes";
const KEY_HORIZON_DAYS: &str = "horizon_days";

pub trait SettingsRepository {
    fn load_settings(&self) -> RepoResult<PlannerSettings>;
    fn save_settings(&self, settings: &PlannerSettings) -> RepoResult<()>;
}

pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn read_u32(&self, key: &str) -> RepoResult<Option<u32>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|text| {
                text.parse::<u32>().map_err(|_| {
                    RepoError::InvalidData(format!("invalid value `{text}` for setting `{key}`"))
                })
            })
            .transpose()
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn load_settings(&self) -> RepoResult<PlannerSettings> {
        let defaults = PlannerSettings::default();
        let settings = PlannerSettings {
            daily_capacity_minutes: self
                .read_u32(KEY_DAILY_CAPACITY)?
                .unwrap_or(defaults.daily_capacity_minutes),
            horizon_days: self
                .read_u32(KEY_HORIZON_DAYS)?
                .unwrap_or(defaults.horizon_days),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn save_settings(&self, settings: &PlannerSettings) -> RepoResult<()> {
        settings.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in [
            (KEY_DAILY_CAPACITY, settings.daily_capacity_minutes),
            (KEY_HORIZON_DAYS, settings.horizon_days),
        ] {
            tx.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![key, value.to_string()],
            )?;
        }
        tx.commit()?;

        info!(
            "event=settings_save module=settings status=ok daily_capacity_minutes={} horizon_days={}",
            settings.daily_capacity_minutes, settings.horizon_days
        );
        Ok(())
    }
}
