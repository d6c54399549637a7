//! Workflow definition persistence.
//!
//! Two backends behind one trait: an in-memory store for tests and embedded
//! use, and a file store keeping the whole name-to-definition mapping in one
//! JSON document. The file store holds an in-memory map as the source of
//! truth and rewrites the document on every mutation; entries that fail
//! validation at load time are skipped with a warning.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::workflow::WorkflowDefinition;

/// Maximum number of documents accepted by one import batch.
pub const MAX_IMPORT_ENTRIES: usize = 100;

/// An entry rejected during import.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedImport {
    /// Position in the submitted batch.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub reason: String,
}

/// Outcome of an import batch.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub skipped: Vec<SkippedImport>,
}

/// Storage for workflow definitions.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Validate, stamp `updated_at`, and persist. Overwrites by name.
    async fn save(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition, CoreError>;

    async fn get(&self, name: &str) -> Result<Option<WorkflowDefinition>, CoreError>;

    /// All definitions ordered by name.
    async fn list(&self) -> Result<Vec<WorkflowDefinition>, CoreError>;

    /// Remove a definition; unknown names are an error.
    async fn delete(&self, name: &str) -> Result<(), CoreError>;

    /// Import a batch of raw documents. Malformed entries are skipped and
    /// reported, never fatal to the rest of the batch. With `replace` the
    /// store contents are swapped for the valid entries; otherwise they are
    /// merged over the existing ones.
    async fn import_batch(
        &self,
        entries: Vec<serde_json::Value>,
        replace: bool,
    ) -> Result<ImportReport, CoreError>;

    /// Every stored definition keyed by name.
    async fn export(&self) -> Result<BTreeMap<String, WorkflowDefinition>, CoreError>;
}

/// Parse and validate raw import entries, splitting them into accepted
/// definitions and skip reports. Shared by both backends.
fn screen_entries(
    entries: Vec<serde_json::Value>,
) -> Result<(Vec<WorkflowDefinition>, Vec<SkippedImport>), CoreError> {
    if entries.len() > MAX_IMPORT_ENTRIES {
        return Err(CoreError::Capacity(format!(
            "import batch has {} entries, maximum is {MAX_IMPORT_ENTRIES}",
            entries.len()
        )));
    }
    let mut accepted = Vec::new();
    let mut skipped = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let name = entry
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        match WorkflowDefinition::parse(entry) {
            Ok(definition) => accepted.push(definition),
            Err(err) => {
                debug!(index, name = ?name, reason = %err, "import entry skipped");
                skipped.push(SkippedImport {
                    index,
                    name,
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok((accepted, skipped))
}

/// In-memory workflow store.
pub struct MemoryWorkflowStore {
    workflows: RwLock<BTreeMap<String, WorkflowDefinition>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn save(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition, CoreError> {
        let mut definition = definition.validated()?;
        definition.updated_at = chrono::Utc::now();
        let mut workflows = self.workflows.write().await;
        workflows.insert(definition.name.clone(), definition.clone());
        Ok(definition)
    }

    async fn get(&self, name: &str) -> Result<Option<WorkflowDefinition>, CoreError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<WorkflowDefinition>, CoreError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.values().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<(), CoreError> {
        let mut workflows = self.workflows.write().await;
        if workflows.remove(name).is_none() {
            return Err(CoreError::NotFound(format!("workflow '{name}'")));
        }
        Ok(())
    }

    async fn import_batch(
        &self,
        entries: Vec<serde_json::Value>,
        replace: bool,
    ) -> Result<ImportReport, CoreError> {
        let (accepted, skipped) = screen_entries(entries)?;
        let mut workflows = self.workflows.write().await;
        if replace {
            workflows.clear();
        }
        let mut imported = Vec::with_capacity(accepted.len());
        for mut definition in accepted {
            definition.updated_at = chrono::Utc::now();
            imported.push(definition.name.clone());
            workflows.insert(definition.name.clone(), definition);
        }
        Ok(ImportReport { imported, skipped })
    }

    async fn export(&self) -> Result<BTreeMap<String, WorkflowDefinition>, CoreError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.clone())
    }
}

/// File-backed workflow store: the whole name-to-definition mapping lives in
/// a single JSON document.
#[derive(Debug)]
pub struct FileWorkflowStore {
    path: PathBuf,
    workflows: RwLock<BTreeMap<String, WorkflowDefinition>>,
}

impl FileWorkflowStore {
    /// Open the store, creating the parent directory and loading the
    /// document when it exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    CoreError::Storage(format!("create {}: {e}", parent.display()))
                })?;
            }
        }

        let mut workflows = BTreeMap::new();
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                // A document that no longer parses fails open rather than
                // being silently overwritten by the next save.
                let loaded: BTreeMap<String, WorkflowDefinition> = serde_json::from_str(&raw)
                    .map_err(|e| CoreError::Storage(format!("parse {}: {e}", path.display())))?;
                for (name, definition) in loaded {
                    match definition.validated() {
                        Ok(definition) => {
                            workflows.insert(definition.name.clone(), definition);
                        }
                        Err(err) => {
                            warn!(name = %name, error = %err, "skipping invalid workflow entry");
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CoreError::Storage(format!("read {}: {e}", path.display())));
            }
        }
        debug!(path = %path.display(), count = workflows.len(), "workflow store loaded");
        Ok(Self {
            path,
            workflows: RwLock::new(workflows),
        })
    }

    async fn persist(
        &self,
        workflows: &BTreeMap<String, WorkflowDefinition>,
    ) -> Result<(), CoreError> {
        let body =
            serde_json::to_string_pretty(workflows).map_err(|e| CoreError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| CoreError::Storage(format!("write {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl WorkflowStore for FileWorkflowStore {
    async fn save(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition, CoreError> {
        let mut definition = definition.validated()?;
        definition.updated_at = chrono::Utc::now();
        let mut workflows = self.workflows.write().await;
        // The document is written before the in-memory map changes, so a
        // failed write leaves both sides on the previous state.
        let mut next = workflows.clone();
        next.insert(definition.name.clone(), definition.clone());
        self.persist(&next).await?;
        *workflows = next;
        Ok(definition)
    }

    async fn get(&self, name: &str) -> Result<Option<WorkflowDefinition>, CoreError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<WorkflowDefinition>, CoreError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.values().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<(), CoreError> {
        let mut workflows = self.workflows.write().await;
        if !workflows.contains_key(name) {
            return Err(CoreError::NotFound(format!("workflow '{name}'")));
        }
        let mut next = workflows.clone();
        next.remove(name);
        self.persist(&next).await?;
        *workflows = next;
        Ok(())
    }

    async fn import_batch(
        &self,
        entries: Vec<serde_json::Value>,
        replace: bool,
    ) -> Result<ImportReport, CoreError> {
        let (accepted, skipped) = screen_entries(entries)?;
        let mut workflows = self.workflows.write().await;
        let mut next = if replace {
            BTreeMap::new()
        } else {
            workflows.clone()
        };
        let mut imported = Vec::with_capacity(accepted.len());
        for mut definition in accepted {
            definition.updated_at = chrono::Utc::now();
            imported.push(definition.name.clone());
            next.insert(definition.name.clone(), definition);
        }
        self.persist(&next).await?;
        *workflows = next;
        Ok(ImportReport { imported, skipped })
    }

    async fn export(&self) -> Result<BTreeMap<String, WorkflowDefinition>, CoreError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.clone())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
