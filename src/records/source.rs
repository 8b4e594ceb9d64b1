use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing::{debug, info};

use super::error::{DataError, DataResult};
use super::types::{KnowledgeLinkKind, KnowledgeLinkRecord, YearlyGraphData};

/// The record store the graph is built from.
///
/// Calls are made from background threads and may block.
pub trait GraphDataSource: Send + Sync {
    fn describe(&self) -> String;

    fn yearly_graph_data(&self, year: i32) -> DataResult<YearlyGraphData>;

    fn create_knowledge_link(
        &self,
        source_id: &str,
        target_id: &str,
        kind: KnowledgeLinkKind,
    ) -> DataResult<KnowledgeLinkRecord>;

    fn delete_knowledge_link(&self, link_id: &str) -> DataResult<()>;
}

/// A single JSON document holding every record and link.
///
/// A missing file reads as an empty store and is created on the first write.
pub struct JsonFileSource {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn io_error(&self, source: std::io::Error) -> DataError {
        DataError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_all(&self) -> DataResult<YearlyGraphData> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "data file missing, treating as empty");
                Ok(YearlyGraphData::default())
            }
            Err(error) => Err(self.io_error(error)),
        }
    }

    fn write_all(&self, data: &YearlyGraphData) -> DataResult<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        let staging = staging_path(&self.path);
        fs::write(&staging, serialized).map_err(|error| self.io_error(error))?;
        fs::rename(&staging, &self.path).map_err(|error| self.io_error(error))
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl GraphDataSource for JsonFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn yearly_graph_data(&self, year: i32) -> DataResult<YearlyGraphData> {
        let mut data = self.read_all()?;
        data.retain_year(year, &Local);
        info!(
            year,
            records = data.record_count(),
            links = data.kb_links.len(),
            "loaded yearly graph data"
        );
        Ok(data)
    }

    fn create_knowledge_link(
        &self,
        source_id: &str,
        target_id: &str,
        kind: KnowledgeLinkKind,
    ) -> DataResult<KnowledgeLinkRecord> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut data = self.read_all()?;

        let link = KnowledgeLinkRecord {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: source_id.to_owned(),
            target_id: target_id.to_owned(),
            link_type: kind.to_string(),
        };
        data.kb_links.push(link.clone());
        self.write_all(&data)?;

        info!(source_id, target_id, kind = %kind, "created knowledge link");
        Ok(link)
    }

    fn delete_knowledge_link(&self, link_id: &str) -> DataResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut data = self.read_all()?;

        let before = data.kb_links.len();
        data.kb_links.retain(|link| link.id != link_id);
        if data.kb_links.len() == before {
            return Err(DataError::LinkNotFound(link_id.to_owned()));
        }
        self.write_all(&data)?;

        info!(link_id, "deleted knowledge link");
        Ok(())
    }
}
