use std::path::{Path, PathBuf};

use mbdb_format::{content_address, Manifest, MANIFEST_FILENAME};
use mbdb_restore::{
    escape, escape_restore, perform_restore, Backup, RestoreError, RestoreOptions, RestoreService,
    ServiceError,
};

/// Service double that inspects the staged directory and fails with a
/// scripted message.
struct ScriptedService {
    /// Message to fail with; `None` means the call succeeds.
    failure: Option<String>,
    seen_staging_dir: Option<PathBuf>,
    seen_files: Vec<String>,
    seen_manifest: Option<Manifest>,
    seen_options: Option<RestoreOptions>,
}

impl ScriptedService {
    fn failing_with(message: &str) -> ScriptedService {
        ScriptedService {
            failure: Some(message.to_string()),
            seen_staging_dir: None,
            seen_files: Vec::new(),
            seen_manifest: None,
            seen_options: None,
        }
    }
}

impl RestoreService for ScriptedService {
    fn restore(&mut self, staging_dir: &Path, options: &RestoreOptions) -> Result<(), ServiceError> {
        self.seen_staging_dir = Some(staging_dir.to_path_buf());
        self.seen_options = Some(options.clone());
        for entry in std::fs::read_dir(staging_dir).unwrap() {
            self.seen_files
                .push(entry.unwrap().file_name().to_string_lossy().into_owned());
        }
        self.seen_files.sort();

        let manifest_bytes = std::fs::read(staging_dir.join(MANIFEST_FILENAME)).unwrap();
        self.seen_manifest = Some(Manifest::parse(&manifest_bytes).unwrap());

        match self.failure.take() {
            Some(message) => Err(ServiceError::new(message)),
            None => Ok(()),
        }
    }
}

#[test]
fn expected_abort_is_success() {
    let mut service = ScriptedService::failing_with(
        "failed to restore file 'crash_on_purpose': no such directory",
    );
    let entries = vec![escape::file("/var/mobile/x", b"Z".to_vec()).unwrap()];

    escape_restore(&mut service, entries, &RestoreOptions::default()).unwrap();

    // The abort entry went out last, after the legitimate write.
    let manifest = service.seen_manifest.as_ref().unwrap();
    assert_eq!(manifest.records.len(), 2);
    assert!(manifest.records[0].domain.ends_with("/var/mobile/x"));
    assert!(manifest.records[1].domain.ends_with("/crash_on_purpose"));
}

#[test]
fn find_my_failure_is_user_actionable() {
    let mut service =
        ScriptedService::failing_with("restore failed: Find My is enabled on this device");
    let entries = vec![escape::directory("/var/db/somewhere").unwrap()];

    let err = escape_restore(&mut service, entries, &RestoreOptions::default()).unwrap_err();
    assert!(matches!(err, RestoreError::FindMyEnabled));
}

#[test]
fn unrecognized_failure_is_propagated() {
    let mut service = ScriptedService::failing_with("device disconnected mid-transfer");
    let entries = vec![escape::file("/tmp/x", Vec::new()).unwrap()];

    let err = escape_restore(&mut service, entries, &RestoreOptions::default()).unwrap_err();
    match err {
        RestoreError::Service(source) => {
            assert_eq!(source.message, "device disconnected mid-transfer")
        }
        other => panic!("expected the service error back, got {other:?}"),
    }
}

#[test]
fn staging_directory_contract() {
    let mut service = ScriptedService::failing_with("crash_on_purpose");
    let payload_entry = escape::file("/var/mobile/x", b"Z".to_vec()).unwrap();
    let payload_domain = payload_entry.domain().to_string();

    escape_restore(&mut service, vec![payload_entry], &RestoreOptions::default()).unwrap();

    // Manifest, the three descriptors, and one content file per regular
    // file (the payload and the empty abort file).
    let mut expected = vec![
        "Info.plist".to_string(),
        "Manifest.mbdb".to_string(),
        "Manifest.plist".to_string(),
        "Status.plist".to_string(),
        content_address(&payload_domain, ""),
        content_address(
            "SysContainerDomain-../../../../../../../../crash_on_purpose",
            "",
        ),
    ];
    expected.sort();
    assert_eq!(service.seen_files, expected);
}

#[test]
fn default_options_request_inplace_system_restore() {
    let mut service = ScriptedService::failing_with("crash_on_purpose");
    escape_restore(
        &mut service,
        vec![escape::file("/x", Vec::new()).unwrap()],
        &RestoreOptions::default(),
    )
    .unwrap();

    let options = service.seen_options.unwrap();
    assert!(options.system);
    assert!(!options.reboot);
    assert!(!options.copy);
    assert_eq!(options.source, ".");
}

#[test]
fn staging_directory_is_removed_on_every_path() {
    // Expected abort.
    let mut service = ScriptedService::failing_with("crash_on_purpose");
    escape_restore(
        &mut service,
        vec![escape::file("/x", Vec::new()).unwrap()],
        &RestoreOptions::default(),
    )
    .unwrap();
    assert!(!service.seen_staging_dir.unwrap().exists());

    // Unexpected failure.
    let mut service = ScriptedService::failing_with("some transport error");
    let _ = escape_restore(
        &mut service,
        vec![escape::file("/x", Vec::new()).unwrap()],
        &RestoreOptions::default(),
    );
    assert!(!service.seen_staging_dir.unwrap().exists());

    // Plain restore, success path.
    let mut service = ScriptedService {
        failure: None,
        seen_staging_dir: None,
        seen_files: Vec::new(),
        seen_manifest: None,
        seen_options: None,
    };
    perform_restore(&mut service, &Backup::default(), &RestoreOptions::default()).unwrap();
    assert!(!service.seen_staging_dir.unwrap().exists());
}

#[test]
fn plain_restore_does_not_swallow_abort_failures() {
    // Only the escape flow treats the abort signature as success.
    let mut service = ScriptedService::failing_with("crash_on_purpose");
    let err =
        perform_restore(&mut service, &Backup::default(), &RestoreOptions::default()).unwrap_err();
    assert!(matches!(err, RestoreError::Service(_)));
}
