use std::io;

use mbdb_format::{Backup, BackupEntry, MaterializeError};
use tempfile::TempDir;

use crate::escape::{self, ABORT_MARKER};
use crate::service::{RestoreOptions, RestoreService, ServiceError};

/// Message fragment the transport produces when the device's activation
/// lock blocks a system restore.
const FIND_MY_MARKER: &str = "Find My";

#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("Creating staging directory failed.")]
    Staging(#[source] io::Error),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error("Find My is enabled on the device. Disable Find My and try again.")]
    FindMyEnabled,

    #[error("Restore service failed.")]
    Service(#[source] ServiceError),
}

enum Outcome {
    ExpectedAbort,
    FindMyEnabled,
    Other(ServiceError),
}

// The transport exposes no structured error code; keep every matched
// message fragment in this one place.
fn classify(error: ServiceError) -> Outcome {
    if error.message.contains(ABORT_MARKER) {
        Outcome::ExpectedAbort
    } else if error.message.contains(FIND_MY_MARKER) {
        Outcome::FindMyEnabled
    } else {
        Outcome::Other(error)
    }
}

/// Stage `backup` into a fresh temporary directory and replay it through
/// `service`. The staging directory is torn down on every exit path; the
/// service call is awaited to completion before teardown.
pub fn perform_restore<S: RestoreService>(
    service: &mut S,
    backup: &Backup,
    options: &RestoreOptions,
) -> Result<(), RestoreError> {
    let staging = TempDir::new().map_err(RestoreError::Staging)?;
    backup.write_to_directory(staging.path())?;

    tracing::debug!(
        staging = %staging.path().display(),
        entries = backup.entries.len(),
        "invoking restore service"
    );
    service
        .restore(staging.path(), options)
        .map_err(RestoreError::Service)
}

/// Replay `entries` with the always-failing abort entry appended, so the
/// consumer applies the writes and then stops before committing a full
/// restore. The abort failure is the expected outcome and maps to `Ok`;
/// an activation-lock failure surfaces as
/// [FindMyEnabled][RestoreError::FindMyEnabled]; anything else is re-raised
/// unchanged.
pub fn escape_restore<S: RestoreService>(
    service: &mut S,
    mut entries: Vec<BackupEntry>,
    options: &RestoreOptions,
) -> Result<(), RestoreError> {
    entries.push(escape::abort_entry());
    let backup = Backup::new(entries);

    match perform_restore(service, &backup, options) {
        Ok(()) => {
            tracing::warn!("restore completed without the expected abort");
            Ok(())
        }
        Err(RestoreError::Service(error)) => match classify(error) {
            Outcome::ExpectedAbort => {
                tracing::debug!("restore aborted as designed");
                Ok(())
            }
            Outcome::FindMyEnabled => Err(RestoreError::FindMyEnabled),
            Outcome::Other(error) => Err(RestoreError::Service(error)),
        },
        Err(other) => Err(other),
    }
}
