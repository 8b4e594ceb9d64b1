mod command;
mod error;
mod source;
mod types;

pub use command::CommandSource;
pub use error::DataResult;
pub use source::{GraphDataSource, JsonFileSource};
pub use types::{
    ActivityRecord, GoalRecord, JournalRecord, KbItemRecord, KnowledgeLinkKind,
    KnowledgeLinkRecord, NoteRecord, Record, RecordKind, RetroRecord, SubmissionRecord,
    YearlyGraphData,
};
