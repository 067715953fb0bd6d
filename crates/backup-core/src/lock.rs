//! Read lock spanning every selected table and view.
//!
//! The lock is held from before the first schema statement until after
//! the footer, so the schema and the row data come from the same state.

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::{BackupError, Result};

/// A held `LOCK TABLES ... READ`.
///
/// Must be given back with [`ReadLock::release`];
/// [`crate::snapshot::Snapshot::run`] does that on every path.
#[must_use = "a ReadLock must be released"]
#[derive(Debug)]
pub struct ReadLock {
    objects: usize,
    released: bool,
}

impl ReadLock {
    /// Lock `objects` for reading. An empty list takes no lock.
    pub async fn acquire<C>(catalog: &mut C, objects: &[String]) -> Result<Self>
    where
        C: Catalog + ?Sized,
    {
        if !objects.is_empty() {
            catalog
                .lock_tables(objects)
                .await
                .map_err(|e| BackupError::Lock {
                    objects: objects.len(),
                    message: e.to_string(),
                })?;
        }
        info!("Locked {} table(s) and view(s) for reading", objects.len());
        Ok(Self {
            objects: objects.len(),
            released: false,
        })
    }

    pub async fn release<C>(mut self, catalog: &mut C) -> Result<()>
    where
        C: Catalog + ?Sized,
    {
        self.released = true;
        catalog.unlock_tables().await?;
        info!("Released read lock on {} object(s)", self.objects);
        Ok(())
    }
}

impl Drop for ReadLock {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "Read lock on {} object(s) dropped without release",
                self.objects
            );
        }
    }
}

/// Combine the outcome of the locked work with the outcome of the release.
///
/// An error from the work wins; a release failure is then only logged.
pub fn settle<T>(outcome: Result<T>, released: Result<()>) -> Result<T> {
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(release_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(release_err)) => {
            warn!("Failed to release read lock after error: {release_err}");
            Err(err)
        }
    }
}
