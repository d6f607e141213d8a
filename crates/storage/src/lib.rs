//! JSON file persistence for projects and settings.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use directories::ProjectDirs;
use log::debug;
use memoir_core::{Manuscript, Settings};

pub const DEFAULT_TITLE: &str = "Neues Memoir";
const SETTINGS_FILE: &str = "settings.json";

pub trait ProjectRepository {
    fn load(&self, path: &Path) -> anyhow::Result<Manuscript>;
    fn save(&self, manuscript: &Manuscript, path: &Path) -> anyhow::Result<()>;
    fn create_new(&self, title: &str, author: &str) -> Manuscript;
    /// Writes a timestamped copy next to `path` and returns where it went.
    fn create_backup(&self, manuscript: &Manuscript, path: &Path) -> anyhow::Result<PathBuf>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileProjectRepository;

impl FileProjectRepository {
    pub fn new() -> Self {
        Self
    }
}

impl ProjectRepository for FileProjectRepository {
    fn load(&self, path: &Path) -> anyhow::Result<Manuscript> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("read project {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parse project {}", path.display()))
    }

    fn save(&self, manuscript: &Manuscript, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(manuscript).context("serialize project")?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create project dir {}", parent.display()))?;
        }
        fs::write(path, json).with_context(|| format!("write project {}", path.display()))?;
        debug!("saved project to {}", path.display());
        Ok(())
    }

    fn create_new(&self, title: &str, author: &str) -> Manuscript {
        let title = match title.trim() {
            "" => DEFAULT_TITLE,
            title => title,
        };
        Manuscript::new(title, author.trim())
    }

    fn create_backup(&self, manuscript: &Manuscript, path: &Path) -> anyhow::Result<PathBuf> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let backup = backup_path(path, &stamp.to_string());
        self.save(manuscript, &backup)?;
        Ok(backup)
    }
}

fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".backup_{stamp}"));
    PathBuf::from(name)
}

/// `settings.json` in the per-user config directory, or any explicit path.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("dev", "memoir", "memoir").context("resolve project dirs")?;
        Ok(Self::new(dirs.config_dir().join(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file yields defaults; values are normalized either way.
    pub fn load(&self) -> anyhow::Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("read settings {}", self.path.display()))?;
        let mut settings: Settings = serde_json::from_str(&json)
            .with_context(|| format!("parse settings {}", self.path.display()))?;
        settings.normalize();
        Ok(settings)
    }

    pub fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut settings = settings.clone();
        settings.normalize();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&settings).context("serialize settings")?;
        fs::write(&self.path, json)
            .with_context(|| format!("write settings {}", self.path.display()))?;
        Ok(())
    }
}
