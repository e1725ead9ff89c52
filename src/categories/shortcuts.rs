//! Shortcut (`.lnk`) target resolution and orphan detection.
//!
//! Shell links are parsed directly from the binary format instead of going
//! through COM automation. Only the `LinkInfo` local path is used; shortcuts
//! that point at shell namespace items or network shares resolve to `None`
//! and are therefore never treated as orphans.

use super::KnownFolders;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub trait ShortcutResolver: Send + Sync {
    /// The filesystem path a shortcut points at, if it can be determined.
    fn resolve_target(&self, path: &Path) -> Option<PathBuf>;
}

/// Resolver for platforms without shell links.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoShortcuts;

impl ShortcutResolver for NoShortcuts {
    fn resolve_target(&self, _path: &Path) -> Option<PathBuf> {
        None
    }
}

/// Reads `.lnk` files in the MS-SHLLINK binary format.
#[derive(Debug, Default, Clone, Copy)]
pub struct LnkResolver;

impl ShortcutResolver for LnkResolver {
    fn resolve_target(&self, path: &Path) -> Option<PathBuf> {
        let bytes = std::fs::read(path).ok()?;
        parse_lnk_target(&bytes)
    }
}

pub fn default_resolver() -> Arc<dyn ShortcutResolver> {
    if cfg!(windows) {
        Arc::new(LnkResolver)
    } else {
        Arc::new(NoShortcuts)
    }
}

/// A `.lnk` file whose resolved target no longer exists.
pub fn is_orphaned(resolver: &dyn ShortcutResolver, path: &Path) -> bool {
    let is_lnk = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("lnk"))
        .unwrap_or(false);
    if !is_lnk || !path.is_file() {
        return false;
    }
    match resolver.resolve_target(path) {
        Some(target) => !target.exists(),
        None => false,
    }
}

/// Desktop and per-user Start Menu program folders.
pub fn shortcut_dirs(folders: &KnownFolders) -> Option<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    if let Some(desktop) = &folders.desktop {
        dirs.push(desktop.clone());
    }
    if let Some(programs) = folders.start_menu_programs() {
        dirs.push(programs);
    }
    if dirs.is_empty() {
        None
    } else {
        Some(dirs)
    }
}

const HEADER_SIZE: usize = 0x4C;
const HAS_LINK_TARGET_ID_LIST: u32 = 0x0000_0001;
const HAS_LINK_INFO: u32 = 0x0000_0002;
const VOLUME_ID_AND_LOCAL_BASE_PATH: u32 = 0x0000_0001;

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let slice = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([slice[0], slice[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let slice = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn read_cstr(bytes: &[u8], at: usize) -> Option<String> {
    let tail = bytes.get(at..)?;
    let end = tail.iter().position(|&b| b == 0)?;
    Some(String::from_utf8_lossy(&tail[..end]).into_owned())
}

fn read_wstr(bytes: &[u8], at: usize) -> Option<String> {
    let tail = bytes.get(at..)?;
    let units: Vec<u16> = tail
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    Some(String::from_utf16_lossy(&units))
}

/// Extract `LocalBasePath` + `CommonPathSuffix` from a shell link.
pub fn parse_lnk_target(bytes: &[u8]) -> Option<PathBuf> {
    if read_u32(bytes, 0)? as usize != HEADER_SIZE {
        return None;
    }
    let flags = read_u32(bytes, 0x14)?;
    if flags & HAS_LINK_INFO == 0 {
        return None;
    }

    let mut offset = HEADER_SIZE;
    if flags & HAS_LINK_TARGET_ID_LIST != 0 {
        offset += 2 + read_u16(bytes, offset)? as usize;
    }

    let info = bytes.get(offset..)?;
    let info_size = read_u32(info, 0)? as usize;
    let info = info.get(..info_size)?;
    let info_header_size = read_u32(info, 4)? as usize;
    let info_flags = read_u32(info, 8)?;
    if info_flags & VOLUME_ID_AND_LOCAL_BASE_PATH == 0 {
        return None;
    }

    let (base, suffix) = if info_header_size >= 0x24 {
        let base_at = read_u32(info, 0x1C)? as usize;
        let suffix_at = read_u32(info, 0x20)? as usize;
        (read_wstr(info, base_at)?, read_wstr(info, suffix_at).unwrap_or_default())
    } else {
        let base_at = read_u32(info, 0x10)? as usize;
        let suffix_at = read_u32(info, 0x18)? as usize;
        (read_cstr(info, base_at)?, read_cstr(info, suffix_at).unwrap_or_default())
    };

    if base.is_empty() {
        return None;
    }
    let mut target = base;
    if !suffix.is_empty() {
        if !target.ends_with('\\') && !target.ends_with('/') {
            target.push('\\');
        }
        target.push_str(&suffix);
    }
    Some(PathBuf::from(target))
}
