//! Session save and restore
//!
//! A session file holds the source tree and the workspace. Sources are
//! stored as their label, descriptors, configuration and reader kind; the
//! reader itself is rebuilt from the configuration through a
//! [`ReaderFactory`] on load. Identities ([`SourceId`](crate::source::SourceId))
//! are not persisted and are freshly assigned on restore.
//!
//! The format is JSON with an explicit version. Files written by a newer
//! version are rejected rather than half-read.

use crate::error::{Result, ResultExt, XpadError};
use crate::source::{ReaderFactory, SourceConfig, SourceNode, SourceRegistry};
use crate::types::{DataItem, VariableDescriptor};
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Version written by this build
pub const SESSION_FORMAT_VERSION: u32 = 1;

/// Persisted form of a source node and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub label: String,
    /// Reader kind, `None` for grouping nodes
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub config: SourceConfig,
    #[serde(default)]
    pub variables: Vec<VariableDescriptor>,
    #[serde(default)]
    pub children: Vec<SourceRecord>,
}

impl SourceRecord {
    pub fn capture(node: &SourceNode) -> Self {
        Self {
            label: node.label().to_string(),
            kind: node.kind().map(str::to_string),
            config: node.config().clone(),
            variables: node.variables().to_vec(),
            children: node.children().iter().map(SourceRecord::capture).collect(),
        }
    }

    /// Rebuild the node, its reader and its children
    pub fn restore(&self, factory: &ReaderFactory) -> Result<SourceNode> {
        let node = match &self.kind {
            Some(kind) => SourceNode::with_reader(self.label.clone(), factory.build(kind, &self.config)?),
            None => SourceNode::new(self.label.clone()),
        };
        self.children.iter().try_fold(
            node.with_variables(self.variables.iter().cloned())
                .with_config(self.config.clone()),
            |node, child| Ok(node.with_child(child.restore(factory)?)),
        )
    }
}

/// One workspace entry, in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    pub name: String,
    pub item: DataItem,
}

/// Top-level session file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub sources: Vec<SourceRecord>,
    pub workspace: Vec<WorkspaceEntry>,
}

impl SessionFile {
    /// Snapshot the registry and workspace
    pub fn capture(registry: &SourceRegistry, workspace: &Workspace) -> Self {
        Self {
            version: SESSION_FORMAT_VERSION,
            saved_at: Utc::now(),
            sources: registry.roots().iter().map(SourceRecord::capture).collect(),
            workspace: workspace
                .iter()
                .map(|(name, item)| WorkspaceEntry {
                    name: name.to_string(),
                    item: item.clone(),
                })
                .collect(),
        }
    }

    /// Write to `path` through a sibling temporary file, so an existing
    /// session is only replaced by a complete one
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| XpadError::Persistence(format!("Failed to serialize session: {}", e)))?;

        let temp = temp_path(path);
        std::fs::write(&temp, json).map_err(|e| {
            XpadError::Persistence(format!("Failed to write session file {:?}: {}", temp, e))
        })?;
        std::fs::rename(&temp, path).map_err(|e| {
            let _ = std::fs::remove_file(&temp);
            XpadError::Persistence(format!("Failed to replace session file {:?}: {}", path, e))
        })?;

        tracing::info!(
            "Saved session to {:?} ({} source(s), {} item(s))",
            path,
            self.sources.len(),
            self.workspace.len()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            XpadError::Persistence(format!("Failed to read session file {:?}: {}", path, e))
        })?;
        Self::from_json(&json).with_context(|| format!("Failed to load session {:?}", path))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let session: SessionFile = serde_json::from_str(json)
            .map_err(|e| XpadError::Persistence(format!("Malformed session file: {}", e)))?;
        if session.version > SESSION_FORMAT_VERSION {
            return Err(XpadError::Persistence(format!(
                "Session format version {} is newer than supported version {}",
                session.version, SESSION_FORMAT_VERSION
            )));
        }
        Ok(session)
    }

    /// Rebuild a registry and workspace. Nothing is returned unless every
    /// source and entry could be restored.
    pub fn restore(&self, factory: &ReaderFactory) -> Result<(SourceRegistry, Workspace)> {
        let mut registry = SourceRegistry::new();
        for record in &self.sources {
            let node = record
                .restore(factory)
                .with_context(|| format!("Failed to restore source '{}'", record.label))?;
            registry.add_root(node);
        }

        let mut workspace = Workspace::new();
        for entry in &self.workspace {
            workspace.insert(&entry.name, entry.item.clone())?;
        }

        Ok((registry, workspace))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "session".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Save the registry and workspace to `path`
pub fn save_session(
    path: impl AsRef<Path>,
    registry: &SourceRegistry,
    workspace: &Workspace,
) -> Result<()> {
    SessionFile::capture(registry, workspace).save(path)
}

/// Load `path` into `registry` and `workspace`.
///
/// Both are replaced only when the whole file loaded and restored; on error
/// they are left untouched.
pub fn load_session_into(
    path: impl AsRef<Path>,
    factory: &ReaderFactory,
    registry: &mut SourceRegistry,
    workspace: &mut Workspace,
) -> Result<()> {
    let path = path.as_ref();
    let session = SessionFile::load(path)?;
    let (new_registry, new_workspace) = session.restore(factory)?;

    tracing::info!(
        "Loaded session from {:?} saved at {} ({} source(s), {} item(s))",
        path,
        session.saved_at,
        new_registry.len(),
        new_workspace.len()
    );
    *registry = new_registry;
    *workspace = new_workspace;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySourceBuilder;

    fn sample() -> (SourceRegistry, Workspace) {
        let node = MemorySourceBuilder::new("shot 100")
            .item(
                "ip",
                "",
                DataItem::series("ip", vec![1.0, 2.0]).with_units("kA"),
            )
            .child(SourceNode::new("empty group"))
            .build()
            .unwrap();
        let mut registry = SourceRegistry::new();
        registry.add_root(node);

        let mut workspace = Workspace::new();
        workspace
            .insert("b", DataItem::scalar("b", f64::NAN).with_comment("missing"))
            .unwrap();
        workspace.insert("a", DataItem::series("a", vec![1.0])).unwrap();
        (registry, workspace)
    }

    #[test]
    fn test_capture_keeps_structure() {
        let (registry, workspace) = sample();
        let session = SessionFile::capture(&registry, &workspace);
        assert_eq!(session.version, SESSION_FORMAT_VERSION);
        assert_eq!(session.sources.len(), 1);
        assert_eq!(session.sources[0].kind.as_deref(), Some("memory"));
        assert_eq!(session.sources[0].children[0].kind, None);
        let names: Vec<_> = session.workspace.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let (registry, workspace) = sample();
        save_session(&path, &registry, &workspace).unwrap();
        assert!(!temp_path(&path).exists());

        let mut loaded_registry = SourceRegistry::new();
        let mut loaded_workspace = Workspace::new();
        load_session_into(
            &path,
            &ReaderFactory::with_builtins(),
            &mut loaded_registry,
            &mut loaded_workspace,
        )
        .unwrap();

        assert_eq!(loaded_workspace.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        let b = loaded_workspace.get("b").unwrap();
        assert_eq!(b.comment, "missing");
        assert!(b.values().unwrap()[0].is_nan());

        let id = loaded_registry.roots()[0].id();
        assert_ne!(id, registry.roots()[0].id());
        let item = loaded_registry.read(id, "ip", "").unwrap();
        assert_eq!(item.values(), Some(&[1.0, 2.0][..]));
        assert_eq!(item.source, "shot 100");
    }

    #[test]
    fn test_newer_version_rejected() {
        let (registry, workspace) = sample();
        let mut session = SessionFile::capture(&registry, &workspace);
        session.version = SESSION_FORMAT_VERSION + 1;
        let json = serde_json::to_string(&session).unwrap();
        assert!(matches!(
            SessionFile::from_json(&json),
            Err(XpadError::Persistence(_))
        ));
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"{"version": 1, "sources": [], "workspace": []}"#;
        assert!(matches!(
            SessionFile::from_json(json),
            Err(XpadError::Persistence(_))
        ));
    }

    #[test]
    fn test_failed_load_leaves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let (mut registry, mut workspace) = sample();
        let result = load_session_into(
            &path,
            &ReaderFactory::with_builtins(),
            &mut registry,
            &mut workspace,
        );
        assert!(result.is_err());
        assert_eq!(registry.len(), 1);
        assert_eq!(workspace.len(), 2);
    }

    #[test]
    fn test_unknown_kind_fails_restore() {
        let (registry, workspace) = sample();
        let session = SessionFile::capture(&registry, &workspace);
        let err = session.restore(&ReaderFactory::new()).unwrap_err();
        assert!(err.to_string().contains("shot 100"));
    }
}
