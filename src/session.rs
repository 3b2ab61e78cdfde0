// =============================================================================
// Session Persistence
// =============================================================================
//
// A session holds one configuration, its dataset versions and the last
// generated script. Nothing here is interpreted by the synthesizer.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PlotConfig;
use crate::data::OutcomeRow;
use crate::error::{ForestError, ForestResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataVersion {
    pub id: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub data: Vec<OutcomeRow>,
}

impl DataVersion {
    pub fn new(name: impl Into<String>, data: Vec<OutcomeRow>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            timestamp: Utc::now(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub name: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub data_versions: Vec<DataVersion>,
    #[serde(default)]
    pub config: PlotConfig,
    #[serde(default)]
    pub generated_code: String,
}

impl Session {
    /// New session with the default configuration and one empty version.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created: now,
            modified: now,
            data_versions: vec![DataVersion::new("Version 1", Vec::new())],
            config: PlotConfig::default(),
            generated_code: String::new(),
        }
    }

    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }

    pub fn latest_version(&self) -> Option<&DataVersion> {
        self.data_versions.last()
    }
}

/// Storage for sessions keyed by id.
///
/// Implementors provide the five storage primitives; the editing operations
/// are built on top of them and bump `modified` on every change.
pub trait SessionStore {
    /// All sessions, most recently modified first.
    fn list(&self) -> ForestResult<Vec<Session>>;
    fn get(&self, id: Uuid) -> ForestResult<Session>;
    fn save(&self, session: &Session) -> ForestResult<()>;
    fn delete(&self, id: Uuid) -> ForestResult<()>;
    fn clear(&self) -> ForestResult<()>;

    fn create(&self, name: &str) -> ForestResult<Session> {
        let session = Session::new(name);
        self.save(&session)?;
        tracing::info!(id = %session.id, name, "created session");
        Ok(session)
    }

    /// Load, change and save one session.
    fn update<F>(&self, id: Uuid, change: F) -> ForestResult<Session>
    where
        F: FnOnce(&mut Session),
        Self: Sized,
    {
        let mut session = self.get(id)?;
        change(&mut session);
        session.touch();
        self.save(&session)?;
        Ok(session)
    }

    fn rename(&self, id: Uuid, name: &str) -> ForestResult<Session>
    where
        Self: Sized,
    {
        self.update(id, |s| s.name = name.to_string())
    }

    fn update_config(&self, id: Uuid, config: PlotConfig) -> ForestResult<Session>
    where
        Self: Sized,
    {
        config.validate()?;
        self.update(id, |s| s.config = config)
    }

    fn add_data_version(&self, id: Uuid, name: &str, data: Vec<OutcomeRow>) -> ForestResult<DataVersion>
    where
        Self: Sized,
    {
        let version = DataVersion::new(name, data);
        self.update(id, |s| s.data_versions.push(version.clone()))?;
        Ok(version)
    }

    fn record_generated_code(&self, id: Uuid, code: &str) -> ForestResult<Session>
    where
        Self: Sized,
    {
        self.update(id, |s| s.generated_code = code.to_string())
    }

    /// Pretty JSON of one session.
    fn export(&self, id: Uuid) -> ForestResult<String> {
        let session = self.get(id)?;
        serde_json::to_string_pretty(&session)
            .map_err(|e| ForestError::session(format!("failed to serialize session {id}: {e}")))
    }

    /// Store an exported session under a fresh id.
    fn import(&self, json: &str) -> ForestResult<Session> {
        let mut session: Session = serde_json::from_str(json)
            .map_err(|e| ForestError::session(format!("invalid session JSON: {e}")))?;
        let now = Utc::now();
        session.id = Uuid::new_v4();
        session.created = now;
        session.modified = now;
        self.save(&session)?;
        Ok(session)
    }
}

/// One `<id>.json` file per session in a directory.
#[derive(Debug, Clone)]
pub struct JsonSessionStore {
    dir: PathBuf,
}

impl JsonSessionStore {
    pub fn open(dir: impl Into<PathBuf>) -> ForestResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create session directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn session_files(&self) -> ForestResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read '{}'", self.dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.context("failed to read directory entry")?.path();
            if path.extension().is_some_and(|e| e == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn read(path: &Path) -> ForestResult<Session> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        serde_json::from_str(&text)
            .map_err(|e| ForestError::session(format!("corrupt session file '{}': {e}", path.display())))
    }
}

impl SessionStore for JsonSessionStore {
    fn list(&self) -> ForestResult<Vec<Session>> {
        let mut sessions = Vec::new();
        for path in self.session_files()? {
            match Self::read(&path) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable session file"),
            }
        }
        sessions.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(sessions)
    }

    fn get(&self, id: Uuid) -> ForestResult<Session> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(ForestError::session(format!("session {id} not found")));
        }
        Self::read(&path)
    }

    fn save(&self, session: &Session) -> ForestResult<()> {
        let path = self.path_for(session.id);
        let text = serde_json::to_string_pretty(session)
            .map_err(|e| ForestError::session(format!("failed to serialize session: {e}")))?;
        // Write then rename so a crash never leaves a half-written file
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, text).with_context(|| format!("failed to write '{}'", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace '{}'", path.display()))?;
        Ok(())
    }

    fn delete(&self, id: Uuid) -> ForestResult<()> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(ForestError::session(format!("session {id} not found")));
        }
        std::fs::remove_file(&path).with_context(|| format!("failed to remove '{}'", path.display()))?;
        Ok(())
    }

    fn clear(&self) -> ForestResult<()> {
        for path in self.session_files()? {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove '{}'", path.display()))?;
        }
        Ok(())
    }
}
