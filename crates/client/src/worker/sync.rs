//! Background sync.
//!
//! Only the saved-jobs tag is recognised, and its handler does nothing but
//! log. Pending saves would have to be queued somewhere first.

use laojobs_core::Error;

pub const SYNC_SAVED_JOBS: &str = "sync-saved-jobs";

/// Dispatch a sync event. Returns whether the tag was recognised.
pub async fn handle_sync(tag: &str) -> Result<bool, Error> {
    match tag {
        SYNC_SAVED_JOBS => {
            sync_saved_jobs().await?;
            Ok(true)
        }
        other => {
            tracing::debug!(tag = other, "ignoring unknown sync tag");
            Ok(false)
        }
    }
}

async fn sync_saved_jobs() -> Result<(), Error> {
    tracing::info!("syncing saved jobs");
    Ok(())
}
