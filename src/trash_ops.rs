//! Recycle Bin access through the `trash` crate.
//!
//! On Windows `trash` drives the Shell through COM. If COM was already
//! initialized on the calling thread with another concurrency model the crate
//! can panic (`CoInitializeEx failed`, `RPC_E_CHANGED_MODE`). Panics from the
//! dependency are turned into errors so the post-phase can record them.

use anyhow::{anyhow, Result};
use std::any::Any;

fn panic_payload_to_string(panic_payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn catch_trash_panic<R>(f: impl FnOnce() -> Result<R>) -> Result<R> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(r) => r,
        Err(panic_payload) => {
            let msg = panic_payload_to_string(panic_payload);
            Err(anyhow!("Recycle Bin operation panicked (dependency bug): {msg}"))
        }
    }
}

/// Permanently remove everything in the Recycle Bin. Returns the item count.
#[cfg(any(
    target_os = "windows",
    all(unix, not(target_os = "macos"), not(target_os = "ios"), not(target_os = "android"))
))]
pub fn empty_all() -> Result<usize> {
    catch_trash_panic(|| {
        let items = trash::os_limited::list()?;
        let count = items.len();
        if count > 0 {
            trash::os_limited::purge_all(items)?;
        }
        Ok(count)
    })
}

#[cfg(not(any(
    target_os = "windows",
    all(unix, not(target_os = "macos"), not(target_os = "ios"), not(target_os = "android"))
)))]
pub fn empty_all() -> Result<usize> {
    Err(anyhow!("emptying the trash is not supported on this platform"))
}
