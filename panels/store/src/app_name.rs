//! Application identity used to place store files

use std::path::PathBuf;

/// Application identifier used to determine storage location
///
/// Resolved through [`directories::ProjectDirs`], so files follow the XDG
/// Base Directory layout on Linux and the native conventions elsewhere.
///
/// # Example
///
/// ```
/// use keystash_store::AppName;
///
/// let app_name = AppName::new("com", "keystash", "keystash");
/// let dir = app_name.store_dir();
/// assert!(dir.ends_with("store"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppName {
    pub qualifier: String,
    pub organization: String,
    pub application: String,
}

impl AppName {
    /// * `qualifier` - Typically a reverse domain name (e.g., "com", "org")
    /// * `organization` - Your organization or username
    /// * `application` - The application name
    pub fn new(
        qualifier: impl Into<String>,
        organization: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        Self {
            qualifier: qualifier.into(),
            organization: organization.into(),
            application: application.into(),
        }
    }

    /// Directory holding one file per origin
    ///
    /// - Linux: `$XDG_CONFIG_HOME/<app>/store` or `~/.config/<app>/store`
    /// - macOS: `~/Library/Application Support/<qualifier>.<org>.<app>/store`
    /// - Windows: `%LOCALAPPDATA%\<org>\<app>\config\store`
    ///
    /// Falls back to `./store` when no home directory can be found.
    pub fn store_dir(&self) -> PathBuf {
        directories::ProjectDirs::from(&self.qualifier, &self.organization, &self.application)
            .map(|dirs| dirs.config_local_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("store")
    }

    /// File holding the entries of `origin`
    pub fn origin_path(&self, origin: &str) -> PathBuf {
        self.store_dir().join(format!("{origin}.json"))
    }

    /// Whether `origin` names a file directly inside [`store_dir`](Self::store_dir)
    pub fn is_valid_origin(origin: &str) -> bool {
        !origin.is_empty()
            && origin != "."
            && origin != ".."
            && !origin.contains(['/', '\\', '\0'])
    }
}
