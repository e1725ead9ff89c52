//! Base folders that category layouts are resolved against.

use directories::{BaseDirs, UserDirs};
use std::env;
use std::path::{Path, PathBuf};

/// Well-known base folders. `None` means "not available on this machine";
/// categories that need a missing folder resolve to nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownFolders {
    /// `%SystemRoot%`
    pub system_root: Option<PathBuf>,
    /// `%ProgramData%`
    pub program_data: Option<PathBuf>,
    /// `%LOCALAPPDATA%`
    pub local_app_data: Option<PathBuf>,
    /// `%APPDATA%`
    pub roaming_app_data: Option<PathBuf>,
    /// `%TEMP%`
    pub user_temp: Option<PathBuf>,
    /// `%USERPROFILE%`
    pub user_profile: Option<PathBuf>,
    pub desktop: Option<PathBuf>,
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

impl KnownFolders {
    /// Read the Windows environment, falling back to the platform's
    /// conventional directories where one exists.
    pub fn from_env() -> Self {
        let base = BaseDirs::new();
        let user = UserDirs::new();

        Self {
            system_root: env_path("SystemRoot").or_else(|| env_path("windir")),
            program_data: env_path("ProgramData"),
            local_app_data: env_path("LOCALAPPDATA")
                .or_else(|| base.as_ref().map(|b| b.data_local_dir().to_path_buf())),
            roaming_app_data: env_path("APPDATA")
                .or_else(|| base.as_ref().map(|b| b.config_dir().to_path_buf())),
            user_temp: env_path("TEMP")
                .or_else(|| env_path("TMP"))
                .or_else(|| Some(env::temp_dir())),
            user_profile: env_path("USERPROFILE")
                .or_else(|| base.as_ref().map(|b| b.home_dir().to_path_buf())),
            desktop: user
                .as_ref()
                .and_then(|u| u.desktop_dir().map(Path::to_path_buf))
                .or_else(|| env_path("USERPROFILE").map(|p| p.join("Desktop"))),
        }
    }

    /// A Windows-shaped layout under `base`, for sandboxed runs and tests.
    pub fn rooted_at(base: &Path) -> Self {
        let profile = base.join("Users").join("user");
        Self {
            system_root: Some(base.join("Windows")),
            program_data: Some(base.join("ProgramData")),
            local_app_data: Some(profile.join("AppData").join("Local")),
            roaming_app_data: Some(profile.join("AppData").join("Roaming")),
            user_temp: Some(profile.join("AppData").join("Local").join("Temp")),
            desktop: Some(profile.join("Desktop")),
            user_profile: Some(profile),
        }
    }

    /// `%APPDATA%\Microsoft\Windows\Start Menu\Programs`
    pub fn start_menu_programs(&self) -> Option<PathBuf> {
        self.roaming_app_data.as_ref().map(|roaming| {
            crate::utils::join_segments(
                roaming,
                &["Microsoft", "Windows", "Start Menu", "Programs"],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rooted_layout() {
        let folders = KnownFolders::rooted_at(Path::new("sandbox"));
        assert_eq!(folders.system_root, Some(PathBuf::from("sandbox").join("Windows")));
        let temp = folders.user_temp.unwrap();
        assert!(temp.starts_with(folders.local_app_data.unwrap()));
    }

    #[test]
    fn test_from_env_always_has_temp() {
        assert!(KnownFolders::from_env().user_temp.is_some());
    }

    #[test]
    fn test_start_menu_programs() {
        let folders = KnownFolders::rooted_at(Path::new("s"));
        let programs = folders.start_menu_programs().unwrap();
        assert!(programs.ends_with("Programs"));
        assert!(programs.starts_with(folders.roaming_app_data.unwrap()));
    }
}
