use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::error::{SansError, SansResult};

/// Identity this scattering module reports to callers.
pub const PLUGIN_NAME: &str = "SANSND";

static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Announces the module to the process. Idempotent.
pub fn register() {
    if !REGISTERED.swap(true, Ordering::SeqCst) {
        log::info!("registered scattering module '{PLUGIN_NAME}'");
    }
}

pub fn is_registered() -> bool {
    REGISTERED.load(Ordering::SeqCst)
}

/// Name-query entry point.
pub fn plugin_name() -> &'static str {
    PLUGIN_NAME
}

/// Confirms the loaded module is the one the caller expects. A mismatch
/// is fatal at startup and must never be ignored.
pub fn verify_identity(expected: &str) -> SansResult<()> {
    if expected == PLUGIN_NAME {
        Ok(())
    } else {
        Err(SansError::LibraryMismatch {
            expected: expected.to_string(),
            actual: PLUGIN_NAME.to_string(),
        })
    }
}
