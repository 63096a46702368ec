//! The last activated worker per scope.
//!
//! Saved after each successful activation and read back on startup, so a
//! restarted proxy keeps serving the installed version even when the origin
//! is unreachable.

use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;
use url::Url;

use super::connection::CacheDb;
use crate::Error;
use crate::policy::CacheSettings;

/// A persisted registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Fingerprint of `settings` at the time it was saved.
    pub version: String,
    pub settings: CacheSettings,
    pub activated_at: String,
}

impl CacheDb {
    /// Record `settings` as the active version for its scope, replacing any
    /// earlier record.
    pub async fn save_registration(&self, settings: &CacheSettings) -> Result<(), Error> {
        let scope = settings.scope.to_string();
        let version = settings.version();
        let settings_json = serde_json::to_string(settings)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO registration (scope, version, settings_json, activated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(scope) DO UPDATE SET
                        version = excluded.version,
                        settings_json = excluded.settings_json,
                        activated_at = excluded.activated_at",
                    params![scope, version, settings_json, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The saved registration for `scope`, if any.
    ///
    /// A record whose settings no longer hash to its stored version is
    /// reported as corrupt rather than resumed.
    pub async fn load_registration(&self, scope: &Url) -> Result<Option<RegistrationRecord>, Error> {
        let scope = scope.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, String, String)>, Error> {
                let row = conn
                    .query_row(
                        "SELECT version, settings_json, activated_at FROM registration WHERE scope = ?1",
                        params![scope],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        let Some((version, settings_json, activated_at)) = row else {
            return Ok(None);
        };
        let settings: CacheSettings = serde_json::from_str(&settings_json)?;
        if settings.version() != version {
            return Err(Error::CorruptEntry(format!("registration for {} does not match its version", settings.scope)));
        }
        Ok(Some(RegistrationRecord { version, settings, activated_at }))
    }
}
