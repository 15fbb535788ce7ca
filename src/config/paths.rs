//! Configuration directory layout and first-run bootstrap.
//!
//! Layout (default `~/.config/ttstreambot/`):
//!
//! ```text
//! ttstreambot.toml   bot settings (twitch / festival / phone / baresip)
//! config             baresip configuration, used when `baresip.config_dir`
//!                    points at the same directory
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Default settings written on first run.
pub const SAMPLE_CONFIG: &str = include_str!("../../assets/sample-config.toml");

/// Default baresip configuration written on first run.
pub const BARESIP_CONFIG: &str = include_str!("../../assets/baresip-config");

/// Holds all resolved configuration file paths.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Directory holding `ttstreambot.toml` and the baresip `config`.
    pub config_dir: PathBuf,
    /// Full path to `ttstreambot.toml`.
    pub settings_file: PathBuf,
    /// Full path to the baresip `config` file.
    pub baresip_file: PathBuf,
}

/// Outcome of [`ConfigPaths::ensure_defaults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    /// A settings file already existed; startup can continue.
    Existing,
    /// The default settings file was just written; the operator must edit it.
    Created,
}

impl ConfigPaths {
    const APP_NAME: &'static str = "ttstreambot";
    const SETTINGS_FILE: &'static str = "ttstreambot.toml";
    const BARESIP_FILE: &'static str = "config";

    /// Resolve the layout under `config_dir`, expanding a leading `~/`.
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        let config_dir = expand_home(config_dir.as_ref());
        let settings_file = config_dir.join(Self::SETTINGS_FILE);
        let baresip_file = config_dir.join(Self::BARESIP_FILE);

        Self {
            config_dir,
            settings_file,
            baresip_file,
        }
    }

    /// `~/.config/ttstreambot`, falling back to the current directory when the
    /// platform has no home directory.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(Self::APP_NAME)
    }

    /// Create the directory and any missing default files.
    ///
    /// An existing baresip `config` or settings file is never overwritten.
    pub fn ensure_defaults(&self) -> io::Result<Bootstrap> {
        std::fs::create_dir_all(&self.config_dir)?;

        if !self.baresip_file.exists() {
            log::debug!("writing default baresip config to {}", self.baresip_file.display());
            std::fs::write(&self.baresip_file, BARESIP_CONFIG)?;
        }

        if self.settings_file.exists() {
            return Ok(Bootstrap::Existing);
        }

        log::debug!("writing default settings to {}", self.settings_file.display());
        std::fs::write(&self.settings_file, SAMPLE_CONFIG)?;
        Ok(Bootstrap::Created)
    }
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

/// Expand a leading `~` into the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn layout_uses_fixed_file_names() {
        let paths = ConfigPaths::new("/tmp/bot");
        assert_eq!(paths.settings_file, PathBuf::from("/tmp/bot/ttstreambot.toml"));
        assert_eq!(paths.baresip_file, PathBuf::from("/tmp/bot/config"));
    }

    #[test]
    fn default_dir_ends_with_app_name() {
        let dir = ConfigPaths::default_dir();
        assert!(dir.ends_with(".config/ttstreambot"));
    }

    #[test]
    fn tilde_is_expanded() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/x")), home.join("x"));
        }
        assert_eq!(expand_home(Path::new("/abs/x")), PathBuf::from("/abs/x"));
    }

    #[test]
    fn first_run_creates_both_files() {
        let dir = tempdir().expect("temp dir");
        let paths = ConfigPaths::new(dir.path().join("nested"));

        assert_eq!(paths.ensure_defaults().expect("bootstrap"), Bootstrap::Created);
        assert!(paths.settings_file.exists());
        assert!(paths.baresip_file.exists());

        assert_eq!(paths.ensure_defaults().expect("bootstrap"), Bootstrap::Existing);
    }

    #[test]
    fn existing_baresip_config_is_kept() {
        let dir = tempdir().expect("temp dir");
        let paths = ConfigPaths::new(dir.path());
        std::fs::write(&paths.baresip_file, "custom").expect("write");

        paths.ensure_defaults().expect("bootstrap");
        let kept = std::fs::read_to_string(&paths.baresip_file).expect("read");
        assert_eq!(kept, "custom");
    }
}
