//! Standard paths used by pomo

use std::path::{Path, PathBuf};

/// Standard pomo paths
pub struct Paths {
    /// Data directory (~/.local/share/pomo)
    pub data: PathBuf,
    /// Config directory (~/.config/pomo)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("pomo");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("pomo");

        Self { data, config }
    }

    /// Default location of the config file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Default location of a named database
    pub fn database(&self, name: &str) -> PathBuf {
        self.data.join(format!("{}.db", name))
    }
}

/// Expand a leading `~/` to the user's home directory.
///
/// Paths without the prefix are returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

/// Render a path back into the `~/` form when it lives under home
pub fn contract_tilde(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_namespaced() {
        let paths = Paths::new();
        assert!(paths.data.ends_with("pomo"));
        assert!(paths.config.ends_with("pomo"));
        assert!(paths.config_file().ends_with("pomo/config.toml"));
        assert!(paths.database("tasks").ends_with("pomo/tasks.db"));
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/tmp/pomo.db"), PathBuf::from("/tmp/pomo.db"));
        assert_eq!(expand_tilde("relative/x"), PathBuf::from("relative/x"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/.pomo/tasks"), home.join(".pomo/tasks"));
        }
    }

    #[test]
    fn test_contract_tilde_roundtrip() {
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".local/share/pomo/tasks.db");
            let contracted = contract_tilde(&path);
            assert_eq!(contracted, "~/.local/share/pomo/tasks.db");
            assert_eq!(expand_tilde(&contracted), path);
        }
    }
}
