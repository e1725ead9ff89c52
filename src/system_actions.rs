//! Run-level OS capabilities: closing browsers before their caches are
//! cleared, and the sequential post-phase (DNS flush, Recycle Bin, memory
//! trim).
//!
//! Everything here is best-effort. Failures come back as errors for the
//! orchestrator to record; none of them affect file or byte counters.

use crate::trash_ops;
use anyhow::{anyhow, bail, Context, Result};
use std::process::Command;
use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, info};

pub trait SystemActions: Send + Sync {
    /// Terminate running processes whose executable name matches one of
    /// `names` (case-insensitive). Returns how many were signalled.
    fn close_processes(&self, names: &[String]) -> usize;

    fn flush_dns(&self) -> Result<String>;

    /// Returns the number of items purged.
    fn empty_recycle_bin(&self) -> Result<usize>;

    fn trim_memory(&self) -> Result<String>;
}

/// The real operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsActions;

fn matches_process(process_name: &str, wanted: &[String]) -> bool {
    let process_name = process_name.to_ascii_lowercase();
    let bare = process_name.trim_end_matches(".exe");
    wanted.iter().any(|name| {
        let name = name.to_ascii_lowercase();
        name == process_name || name.trim_end_matches(".exe") == bare
    })
}

fn run_command(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute {program}"))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            bail!("{program} exited with {}", output.status)
        } else {
            bail!("{program} failed: {stderr}")
        }
    }
}

impl SystemActions for OsActions {
    fn close_processes(&self, names: &[String]) -> usize {
        if names.is_empty() {
            return 0;
        }
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let mut closed = 0;
        for (pid, process) in system.processes() {
            let name = process.name().to_string_lossy();
            if matches_process(&name, names) {
                if process.kill() {
                    debug!(pid = pid.as_u32(), process = %name, "terminated");
                    closed += 1;
                } else {
                    debug!(pid = pid.as_u32(), process = %name, "could not terminate");
                }
            }
        }
        if closed > 0 {
            info!(closed, "closed browser processes");
        }
        closed
    }

    fn flush_dns(&self) -> Result<String> {
        if cfg!(windows) {
            run_command("ipconfig", &["/flushdns"])?;
            Ok("DNS cache flushed successfully".to_string())
        } else if cfg!(target_os = "linux") {
            run_command("resolvectl", &["flush-caches"])?;
            Ok("systemd-resolved caches flushed".to_string())
        } else {
            Err(anyhow!("DNS flush is not supported on this platform"))
        }
    }

    fn empty_recycle_bin(&self) -> Result<usize> {
        trash_ops::empty_all()
    }

    fn trim_memory(&self) -> Result<String> {
        if !cfg!(windows) {
            bail!("memory trimming is only supported on Windows");
        }
        // Setting MinWorkingSet to itself makes Windows trim the working set.
        let script = r#"
            Get-Process |
                Where-Object { $_.Id -ne $PID -and $_.ProcessName -notin @('csrss', 'winlogon') } |
                ForEach-Object {
                    try { $_.MinWorkingSet = $_.MinWorkingSet } catch {}
                }
        "#;
        run_command(
            "powershell",
            &["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", script],
        )?;
        Ok("Trimmed process working sets".to_string())
    }
}
