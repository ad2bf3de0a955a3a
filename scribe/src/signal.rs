use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

/// Register SIGINT and SIGTERM handlers that set a shared `AtomicBool`.
///
/// The flag is polled by the ingest loop, which then stops reading and
/// finalizes the turn. A second signal while the flag is already set exits
/// the process immediately with status 130.
///
/// # Errors
///
/// Returns `Err` if a handler cannot be installed.
pub fn register_shutdown() -> std::io::Result<Arc<AtomicBool>> {
    let term = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        // Order matters: the conditional exit must see the flag before this
        // signal sets it.
        flag::register_conditional_shutdown(signal, 130, Arc::clone(&term))?;
        flag::register(signal, Arc::clone(&term))?;
    }
    Ok(term)
}
