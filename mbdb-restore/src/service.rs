use std::path::Path;

/// Flags forwarded verbatim to the restore service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Restore into system data rather than user data.
    pub system: bool,
    /// Reboot the device once the restore completes.
    pub reboot: bool,
    /// Copy staged files instead of moving them in place.
    pub copy: bool,
    /// Source qualifier for the staged snapshot.
    pub source: String,
}

impl Default for RestoreOptions {
    /// A system-level, non-rebooting, in-place restore.
    fn default() -> Self {
        RestoreOptions {
            system: true,
            reboot: false,
            copy: false,
            source: ".".to_string(),
        }
    }
}

/// Failure raised by a restore service. The transport exposes no structured
/// code, only message text, so that text is all there is to classify on.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> ServiceError {
        ServiceError {
            message: message.into(),
        }
    }
}

/// The external backup-restore transport. Implementations receive a fully
/// staged directory (manifest, descriptors, content files) and replay it
/// against the device.
pub trait RestoreService {
    fn restore(&mut self, staging_dir: &Path, options: &RestoreOptions) -> Result<(), ServiceError>;
}
