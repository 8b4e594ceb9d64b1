use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::error::DataError;

/// One year's worth of dated records plus the knowledge links between them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyGraphData {
    #[serde(default)]
    pub activities: Vec<ActivityRecord>,
    #[serde(default)]
    pub goals: Vec<GoalRecord>,
    #[serde(default)]
    pub submissions: Vec<SubmissionRecord>,
    #[serde(default)]
    pub kb_items: Vec<KbItemRecord>,
    #[serde(default)]
    pub retrospectives: Vec<RetroRecord>,
    #[serde(default)]
    pub journal_entries: Vec<JournalRecord>,
    #[serde(default)]
    pub notes: Vec<NoteRecord>,
    #[serde(default)]
    pub kb_links: Vec<KnowledgeLinkRecord>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub is_productive: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalRecord {
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: String,
    #[serde(default)]
    pub submitted_time: Option<String>,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub problem_title: String,
    #[serde(default)]
    pub verdict: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KbItemRecord {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub metadata_title: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetroRecord {
    pub id: String,
    #[serde(default)]
    pub period_start: Option<String>,
    #[serde(default)]
    pub period_end: Option<String>,
    #[serde(default)]
    pub period_type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalRecord {
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub reflection_text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub id: String,
    #[serde(default)]
    pub created_at_ms: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeLinkRecord {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub link_type: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeLinkKind {
    #[default]
    Related,
    Blocks,
    Requires,
}

impl KnowledgeLinkKind {
    pub const ALL: [Self; 3] = [Self::Related, Self::Blocks, Self::Requires];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Related => "related",
            Self::Blocks => "blocks",
            Self::Requires => "requires",
        }
    }
}

impl fmt::Display for KnowledgeLinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnowledgeLinkKind {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "related" => Ok(Self::Related),
            "blocks" => Ok(Self::Blocks),
            "requires" => Ok(Self::Requires),
            _ => Err(DataError::UnknownLinkType(value.to_owned())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Activity,
    Goal,
    Submission,
    Kb,
    Retro,
    Journal,
    Note,
}

/// Where a record's calendar date comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordDate<'a> {
    /// A `YYYY-MM-DD` string, optionally followed by a time part.
    Calendar(&'a str),
    /// An RFC 3339 / ISO 8601 instant.
    Timestamp(&'a str),
    EpochMillis(i64),
    Missing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DateIssue {
    Missing,
    Unparsable(String),
}

impl fmt::Display for DateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("no date"),
            Self::Unparsable(raw) => write!(f, "unparsable date `{raw}`"),
        }
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    // Postgres text output: `2025-03-10 21:30:00+00` or with fractional seconds.
    ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%#z"]
        .iter()
        .find_map(|format| DateTime::parse_from_str(raw, format).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

impl RecordDate<'_> {
    /// Resolves the record's calendar day as seen from `zone`.
    ///
    /// Instants are shifted into `zone` before the date is taken, so an item
    /// created at 23:30 local time stays on its local day.
    pub fn local_date<Tz: TimeZone>(&self, zone: &Tz) -> Result<NaiveDate, DateIssue> {
        match *self {
            Self::Calendar(raw) => {
                let trimmed = raw.trim();
                let day = trimmed.get(..10).unwrap_or(trimmed);
                NaiveDate::parse_from_str(day, "%Y-%m-%d")
                    .map_err(|_| DateIssue::Unparsable(raw.to_owned()))
            }
            Self::Timestamp(raw) => parse_instant(raw)
                .map(|instant| instant.with_timezone(zone).date_naive())
                // A bare day carries no instant to shift.
                .or_else(|| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
                .ok_or_else(|| DateIssue::Unparsable(raw.to_owned())),
            Self::EpochMillis(millis) => DateTime::<Utc>::from_timestamp_millis(millis)
                .map(|instant| instant.with_timezone(zone).date_naive())
                .ok_or_else(|| DateIssue::Unparsable(millis.to_string())),
            Self::Missing => Err(DateIssue::Missing),
        }
    }
}

fn calendar_or_missing(value: &Option<String>) -> RecordDate<'_> {
    value
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map_or(RecordDate::Missing, RecordDate::Calendar)
}

fn timestamp_or_missing(value: &Option<String>) -> RecordDate<'_> {
    value
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map_or(RecordDate::Missing, RecordDate::Timestamp)
}

/// A borrowed view over any of the seven record collections.
#[derive(Clone, Copy, Debug)]
pub enum Record<'a> {
    Activity(&'a ActivityRecord),
    Goal(&'a GoalRecord),
    Submission(&'a SubmissionRecord),
    Kb(&'a KbItemRecord),
    Retro(&'a RetroRecord),
    Journal(&'a JournalRecord),
    Note(&'a NoteRecord),
}

impl<'a> Record<'a> {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Activity(_) => RecordKind::Activity,
            Self::Goal(_) => RecordKind::Goal,
            Self::Submission(_) => RecordKind::Submission,
            Self::Kb(_) => RecordKind::Kb,
            Self::Retro(_) => RecordKind::Retro,
            Self::Journal(_) => RecordKind::Journal,
            Self::Note(_) => RecordKind::Note,
        }
    }

    pub fn id(&self) -> &'a str {
        match self {
            Self::Activity(record) => &record.id,
            Self::Goal(record) => &record.id,
            Self::Submission(record) => &record.id,
            Self::Kb(record) => &record.id,
            Self::Retro(record) => &record.id,
            Self::Journal(record) => &record.id,
            Self::Note(record) => &record.id,
        }
    }

    pub fn date(&self) -> RecordDate<'a> {
        match self {
            Self::Activity(record) => match calendar_or_missing(&record.date) {
                RecordDate::Missing => timestamp_or_missing(&record.start_time),
                date => date,
            },
            Self::Goal(record) => calendar_or_missing(&record.date),
            Self::Submission(record) => timestamp_or_missing(&record.submitted_time),
            Self::Kb(record) => timestamp_or_missing(&record.created_at),
            Self::Retro(record) => timestamp_or_missing(&record.period_start),
            Self::Journal(record) => calendar_or_missing(&record.date),
            Self::Note(record) => record
                .created_at_ms
                .map_or(RecordDate::Missing, RecordDate::EpochMillis),
        }
    }

    /// Text the graph label is derived from, before truncation.
    pub fn label_source(&self) -> String {
        let text = match self {
            Self::Activity(record) => record.title.clone(),
            Self::Goal(record) => record.text.clone(),
            Self::Submission(record) => record.problem_title.clone(),
            Self::Kb(record) => record
                .metadata_title
                .clone()
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| record.content.clone()),
            Self::Retro(record) if !record.period_type.trim().is_empty() => {
                format!("{} retrospective", record.period_type.trim())
            }
            Self::Retro(_) => String::new(),
            Self::Journal(record) => record.reflection_text.clone(),
            Self::Note(record) => record.title.clone().unwrap_or_default(),
        };

        if text.trim().is_empty() {
            self.fallback_label().to_owned()
        } else {
            text
        }
    }

    fn fallback_label(&self) -> &'static str {
        match self {
            Self::Activity(_) => "Untitled activity",
            Self::Goal(_) => "Untitled goal",
            Self::Submission(_) => "Submission",
            Self::Kb(_) => "Knowledge item",
            Self::Retro(_) => "Retrospective",
            Self::Journal(_) => "Journal entry",
            Self::Note(_) => "Untitled note",
        }
    }

    /// Field name/value pairs shown in the details panel.
    pub fn detail_fields(&self) -> Vec<(&'static str, String)> {
        fn opt(value: &Option<String>) -> String {
            value.clone().unwrap_or_else(|| "-".to_owned())
        }

        match self {
            Self::Activity(record) => vec![
                ("Title", record.title.clone()),
                ("Category", record.category.clone()),
                ("Date", opt(&record.date)),
                ("Start", opt(&record.start_time)),
                ("End", opt(&record.end_time)),
                ("Productive", record.is_productive.to_string()),
            ],
            Self::Goal(record) => vec![
                ("Goal", record.text.clone()),
                ("Due", opt(&record.date)),
                ("Priority", opt(&record.priority)),
                ("Completed", record.completed.to_string()),
            ],
            Self::Submission(record) => vec![
                ("Problem", record.problem_title.clone()),
                ("Platform", record.platform.clone()),
                ("Verdict", record.verdict.clone()),
                ("Difficulty", opt(&record.difficulty)),
                ("Submitted", opt(&record.submitted_time)),
            ],
            Self::Kb(record) => vec![
                ("Title", opt(&record.metadata_title)),
                ("Type", record.item_type.clone()),
                ("Status", record.status.clone()),
                ("Content", record.content.clone()),
                ("Created", opt(&record.created_at)),
            ],
            Self::Retro(record) => vec![
                ("Period", record.period_type.clone()),
                ("Start", opt(&record.period_start)),
                ("End", opt(&record.period_end)),
            ],
            Self::Journal(record) => vec![
                ("Date", opt(&record.date)),
                ("Reflection", record.reflection_text.clone()),
            ],
            Self::Note(record) => vec![
                ("Title", opt(&record.title)),
                (
                    "Created",
                    record
                        .created_at_ms
                        .and_then(DateTime::<Utc>::from_timestamp_millis)
                        .map(|instant| instant.to_rfc3339())
                        .unwrap_or_else(|| "-".to_owned()),
                ),
            ],
        }
    }
}

impl YearlyGraphData {
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.activities
            .iter()
            .map(Record::Activity)
            .chain(self.goals.iter().map(Record::Goal))
            .chain(self.submissions.iter().map(Record::Submission))
            .chain(self.kb_items.iter().map(Record::Kb))
            .chain(self.retrospectives.iter().map(Record::Retro))
            .chain(self.journal_entries.iter().map(Record::Journal))
            .chain(self.notes.iter().map(Record::Note))
    }

    pub fn record_count(&self) -> usize {
        self.activities.len()
            + self.goals.len()
            + self.submissions.len()
            + self.kb_items.len()
            + self.retrospectives.len()
            + self.journal_entries.len()
            + self.notes.len()
    }

    pub fn find(&self, kind: RecordKind, id: &str) -> Option<Record<'_>> {
        self.records()
            .find(|record| record.kind() == kind && record.id() == id)
    }

    /// Restricts every collection to records dated in `year` (as seen from
    /// `zone`) and keeps only the links touching a surviving knowledge item.
    ///
    /// Undated records are kept so the graph builder can report them.
    pub fn retain_year<Tz: TimeZone>(&mut self, year: i32, zone: &Tz) {
        fn keep<Tz: TimeZone>(record: Record<'_>, year: i32, zone: &Tz) -> bool {
            record
                .date()
                .local_date(zone)
                .map_or(true, |date| date.year() == year)
        }

        self.activities
            .retain(|record| keep(Record::Activity(record), year, zone));
        self.goals.retain(|record| keep(Record::Goal(record), year, zone));
        self.submissions
            .retain(|record| keep(Record::Submission(record), year, zone));
        self.kb_items.retain(|record| keep(Record::Kb(record), year, zone));
        self.retrospectives
            .retain(|record| keep(Record::Retro(record), year, zone));
        self.journal_entries
            .retain(|record| keep(Record::Journal(record), year, zone));
        self.notes.retain(|record| keep(Record::Note(record), year, zone));

        let kb_ids = self
            .kb_items
            .iter()
            .map(|item| item.id.as_str())
            .collect::<std::collections::HashSet<_>>();
        self.kb_links.retain(|link| {
            kb_ids.contains(link.source_id.as_str()) || kb_ids.contains(link.target_id.as_str())
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    #[test]
    fn late_evening_timestamp_stays_on_local_day() {
        // 23:30 in UTC-05:00 is 04:30 UTC on the next day.
        let zone = FixedOffset::west_opt(5 * 3600).expect("valid offset");
        let date = RecordDate::Timestamp("2025-03-11T04:30:00Z")
            .local_date(&zone)
            .expect("parsable");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"));
    }

    #[test]
    fn epoch_millis_use_zone_offset() {
        let zone = FixedOffset::east_opt(9 * 3600).expect("valid offset");
        // 2025-03-10T20:00:00Z
        let millis = 1_741_636_800_000;
        let date = RecordDate::EpochMillis(millis)
            .local_date(&zone)
            .expect("parsable");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 11).expect("valid date"));
    }

    #[test]
    fn calendar_dates_ignore_time_suffix_and_zone() {
        let zone = FixedOffset::east_opt(14 * 3600).expect("valid offset");
        let date = RecordDate::Calendar("2025-12-31T23:00:00")
            .local_date(&zone)
            .expect("parsable");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 12, 31).expect("valid date"));
    }

    #[test]
    fn date_only_timestamp_keeps_its_day() {
        let zone = FixedOffset::west_opt(8 * 3600).expect("valid offset");
        let date = RecordDate::Timestamp("2025-03-11")
            .local_date(&zone)
            .expect("parsable");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 11).expect("valid date"));
        assert_eq!(
            RecordDate::Timestamp("2025-13-40").local_date(&Utc),
            Err(DateIssue::Unparsable("2025-13-40".to_owned()))
        );
    }

    #[test]
    fn postgres_style_timestamps_parse() {
        let date = RecordDate::Timestamp("2025-06-01 12:00:00.25+00")
            .local_date(&Utc)
            .expect("parsable");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"));
    }

    #[test]
    fn garbage_and_missing_dates_are_reported() {
        assert_eq!(
            RecordDate::Calendar("next tuesday").local_date(&Utc),
            Err(DateIssue::Unparsable("next tuesday".to_owned()))
        );
        assert_eq!(RecordDate::Missing.local_date(&Utc), Err(DateIssue::Missing));
    }

    #[test]
    fn activity_falls_back_to_start_time() {
        let activity = ActivityRecord {
            id: "a1".to_owned(),
            start_time: Some("2025-02-02T10:00:00Z".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            Record::Activity(&activity).date(),
            RecordDate::Timestamp("2025-02-02T10:00:00Z")
        );
    }

    #[test]
    fn link_kind_parses_case_insensitively() {
        assert_eq!("Blocks".parse::<KnowledgeLinkKind>().ok(), Some(KnowledgeLinkKind::Blocks));
        assert!("depends".parse::<KnowledgeLinkKind>().is_err());
    }

    #[test]
    fn kb_label_prefers_metadata_title() {
        let item = KbItemRecord {
            id: "k".to_owned(),
            content: "https://example.com".to_owned(),
            metadata_title: Some("Segment trees".to_owned()),
            ..Default::default()
        };
        assert_eq!(Record::Kb(&item).label_source(), "Segment trees");

        let untitled = KbItemRecord {
            metadata_title: Some("  ".to_owned()),
            ..item
        };
        assert_eq!(Record::Kb(&untitled).label_source(), "https://example.com");
    }

    #[test]
    fn retain_year_keeps_undated_and_touching_links() {
        let mut data = YearlyGraphData {
            goals: vec![
                GoalRecord {
                    id: "in".to_owned(),
                    date: Some("2025-01-05".to_owned()),
                    ..Default::default()
                },
                GoalRecord {
                    id: "out".to_owned(),
                    date: Some("2024-01-05".to_owned()),
                    ..Default::default()
                },
                GoalRecord {
                    id: "undated".to_owned(),
                    ..Default::default()
                },
            ],
            kb_items: vec![KbItemRecord {
                id: "k1".to_owned(),
                created_at: Some("2025-04-01T00:00:00Z".to_owned()),
                ..Default::default()
            }],
            kb_links: vec![
                KnowledgeLinkRecord {
                    id: "l1".to_owned(),
                    source_id: "k1".to_owned(),
                    target_id: "k9".to_owned(),
                    link_type: "related".to_owned(),
                },
                KnowledgeLinkRecord {
                    id: "l2".to_owned(),
                    source_id: "k8".to_owned(),
                    target_id: "k9".to_owned(),
                    link_type: "related".to_owned(),
                },
            ],
            ..Default::default()
        };

        data.retain_year(2025, &Utc);

        let goal_ids = data.goals.iter().map(|goal| goal.id.as_str()).collect::<Vec<_>>();
        assert_eq!(goal_ids, vec!["in", "undated"]);
        assert_eq!(data.kb_links.len(), 1);
        assert_eq!(data.kb_links[0].id, "l1");
    }
}
