//! Stale coordination-lock clearing.
//!
//! The engine drops `*.json` lock entries under `locks/<stack>/` while an
//! operation is in flight; a crash leaves them behind and blocks every later
//! operation. Clearing is best-effort availability-over-consistency: it does
//! not verify that no live process holds the lock, so concurrent invocations
//! against one stack remain a known race. [`wait_for_locks`] offers the
//! opt-in hardened variant that waits for the holder before clearing.

use std::fs;
use std::time::{Duration, Instant};

use glob::glob;
use tracing::{debug, warn};

use crate::layout::StateLayout;

/// Remove every lock entry for one stack. Returns the number removed.
///
/// Idempotent: a missing or empty lock directory is a no-op. Individual
/// deletion failures are logged and skipped, never fatal. Locks belonging to
/// any other stack are untouched.
pub fn clear_locks(layout: &StateLayout, stack: &str) -> usize {
    let lock_dir = layout.stack_locks_dir(stack);
    if !lock_dir.exists() {
        return 0;
    }

    debug!("Clearing locks for stack '{}' in {:?}", stack, lock_dir);

    let pattern = lock_dir.join("*.json");
    let mut removed = 0;
    let entries = match glob(&pattern.to_string_lossy()) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not scan lock directory {:?}: {}", lock_dir, e);
            return 0;
        }
    };

    for entry in entries.flatten() {
        match fs::remove_file(&entry) {
            Ok(()) => {
                debug!("Removed lock entry {:?}", entry.file_name());
                removed += 1;
            }
            Err(e) => {
                warn!("Could not remove lock entry {:?}: {}", entry, e);
            }
        }
    }

    removed
}

/// Remove the entire locks tree under the state root.
///
/// Used by the `clear` command when no stack is named.
pub fn clear_all_locks(layout: &StateLayout) -> bool {
    let locks_dir = layout.locks_dir();
    if !locks_dir.exists() {
        return false;
    }

    match fs::remove_dir_all(&locks_dir) {
        Ok(()) => {
            debug!("Removed locks directory {:?}", locks_dir);
            true
        }
        Err(e) => {
            warn!("Could not remove locks directory {:?}: {}", locks_dir, e);
            false
        }
    }
}

/// Wait until the stack's lock directory drains, up to `timeout`.
///
/// Returns true if the locks were released by their holder, false on
/// timeout. Callers that opted into waiting still clear afterwards to
/// handle locks orphaned by a crash.
pub fn wait_for_locks(layout: &StateLayout, stack: &str, timeout: Duration) -> bool {
    let lock_dir = layout.stack_locks_dir(stack);
    let deadline = Instant::now() + timeout;

    loop {
        let held = lock_dir
            .read_dir()
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if !held {
            return true;
        }
        if Instant::now() >= deadline {
            warn!(
                "Locks for stack '{}' still held after {:?}; proceeding to clear",
                stack, timeout
            );
            return false;
        }
        std::thread::sleep(Duration::from_millis(200));
    }
}
