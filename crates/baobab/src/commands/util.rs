//! Shared helpers for command handlers.

use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use baobab_core::{CoreError, Record, RecordKey, Sdk, SdkEvent};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Fail early with a helpful message when the command needs a login.
pub fn require_login(sdk: &Sdk, global: &GlobalOpts) -> Result<(), CliError> {
    if sdk.is_logged_in() {
        Ok(())
    } else {
        Err(CliError::NotLoggedIn {
            profile: global.profile.clone().unwrap_or_else(|| "default".into()),
        })
    }
}

/// Start a fetch and gather every record it delivers.
///
/// Waits for the operation-complete signal. Errors reported along the
/// way fail the command only when nothing at all was delivered.
pub async fn collect_records(
    sdk: &Sdk,
    start: impl FnOnce(&Sdk) -> Result<(), CoreError>,
) -> Result<Vec<Record>, CliError> {
    let mut rx = sdk.events();
    start(sdk)?;

    let mut keys: Vec<RecordKey> = Vec::new();
    let mut first_error = None;
    loop {
        match rx.recv().await {
            Ok(SdkEvent::Records(batch)) => {
                for key in batch {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
            Ok(SdkEvent::Error(err)) => {
                warn!(error = %err, "request failed");
                first_error.get_or_insert(err);
            }
            Ok(SdkEvent::OperationComplete) | Err(RecvError::Closed) => break,
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
        }
    }

    if let Some(err) = first_error {
        if keys.is_empty() {
            return Err(CliError::from((*err).clone()));
        }
        eprintln!("warning: {err}");
    }

    let mut records: Vec<Record> = keys.iter().filter_map(|k| sdk.record(k)).collect();
    records.sort_by_key(Record::key);
    Ok(records)
}
