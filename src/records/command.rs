use std::process::Command;

use tracing::{debug, info};

use super::error::{DataError, DataResult};
use super::source::GraphDataSource;
use super::types::{KnowledgeLinkKind, KnowledgeLinkRecord, YearlyGraphData};

/// Delegates every query to an external program that speaks JSON on stdout.
///
/// * `<program> yearly-graph-data <year>` prints a `YearlyGraphData` document.
/// * `<program> create-knowledge-link <source> <target> <type>` prints the
///   created link.
/// * `<program> delete-knowledge-link <id>` exits with status 0 on success.
pub struct CommandSource {
    program: String,
}

impl CommandSource {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str]) -> DataResult<String> {
        debug!(program = %self.program, ?args, "running data command");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| DataError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(String::from_utf8(output.stdout)?)
        } else {
            Err(DataError::CommandFailed {
                program: self.program.clone(),
                args: args.iter().map(|arg| (*arg).to_owned()).collect(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

impl GraphDataSource for CommandSource {
    fn describe(&self) -> String {
        format!("command: {}", self.program)
    }

    fn yearly_graph_data(&self, year: i32) -> DataResult<YearlyGraphData> {
        let raw = self.run(&["yearly-graph-data", &year.to_string()])?;
        let data: YearlyGraphData = serde_json::from_str(&raw)?;
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
        let raw = self.run(&["create-knowledge-link", source_id, target_id, kind.as_str()])?;
        let link = serde_json::from_str(&raw)?;
        info!(source_id, target_id, kind = %kind, "created knowledge link");
        Ok(link)
    }

    fn delete_knowledge_link(&self, link_id: &str) -> DataResult<()> {
        self.run(&["delete-knowledge-link", link_id])?;
        info!(link_id, "deleted knowledge link");
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_a_spawn_error() {
        let source = CommandSource::new("/nonexistent/knowledge-atlas-data");
        assert!(matches!(
            source.yearly_graph_data(2025),
            Err(DataError::Spawn { .. })
        ));
    }

    #[test]
    fn failing_program_reports_stderr() {
        let source = CommandSource::new("false");
        assert!(matches!(
            source.delete_knowledge_link("abc"),
            Err(DataError::CommandFailed { .. })
        ));
    }
}
