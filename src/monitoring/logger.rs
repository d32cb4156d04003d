//! Event log: one line per event, one file per UTC day.
//!
//! ```text
//! 2026-10-19T08:15:02.114Z INFO    [Job: job_1760861702114_3f9a1c2b7d4e] Job started
//! ```
//!
//! An optional JSON payload follows the line, pretty-printed. Every event is
//! also emitted as a `tracing` event carrying the job id as a field.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub job_id: Option<String>,
    pub payload: Option<Value>,
}

impl LogEntry {
    /// Render the entry as written to the log file (without trailing newline).
    pub fn format(&self) -> String {
        let mut line = format!(
            "{} {:<7} ",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level.as_str()
        );
        if let Some(job_id) = &self.job_id {
            line.push_str(&format!("[Job: {}] ", job_id));
        }
        line.push_str(&self.message);

        if let Some(payload) = &self.payload {
            let pretty = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
            line.push('\n');
            line.push_str(&pretty);
        }
        line
    }

    /// Parse an entry header line. Payload lines do not parse.
    pub fn parse_line(line: &str) -> Option<Self> {
        static LINE: OnceLock<Regex> = OnceLock::new();
        let re = LINE.get_or_init(|| {
            Regex::new(
                r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z) (DEBUG|INFO|WARNING|ERROR)\s+(?:\[Job: ([^\]]+)\] )?(.*)$",
            )
            .expect("valid log line regex")
        });

        let caps = re.captures(line)?;
        Some(Self {
            timestamp: DateTime::parse_from_rfc3339(&caps[1]).ok()?.with_timezone(&Utc),
            level: caps[2].parse().ok()?,
            job_id: caps.get(3).map(|m| m.as_str().to_string()),
            message: caps[4].to_string(),
            payload: None,
        })
    }
}

/// Appends events to `<logs_dir>/YYYY-MM-DD.log`.
pub struct EventLogger {
    logs_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl EventLogger {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// File holding the events of `date`.
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.logs_dir.join(format!("{}.log", date.format("%Y-%m-%d")))
    }

    /// Record an event on the console and in today's file.
    ///
    /// File errors are reported through `tracing` and otherwise ignored.
    pub fn log(&self, level: LogLevel, message: &str, job_id: Option<&str>, payload: Option<Value>) -> LogEntry {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            job_id: job_id.map(str::to_string),
            payload,
        };

        let job = entry.job_id.as_deref().unwrap_or("-");
        match level {
            LogLevel::Debug => tracing::debug!(job_id = job, "{}", message),
            LogLevel::Info => tracing::info!(job_id = job, "{}", message),
            LogLevel::Warning => tracing::warn!(job_id = job, "{}", message),
            LogLevel::Error => tracing::error!(job_id = job, "{}", message),
        }

        if let Err(e) = self.append(&entry) {
            tracing::warn!("Error writing to log file: {}", e);
        }
        entry
    }

    fn append(&self, entry: &LogEntry) -> std::io::Result<()> {
        // The file is derived per entry so a long-running process rolls over at midnight.
        let path = self.file_for(entry.timestamp.date_naive());
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        std::fs::create_dir_all(&self.logs_dir)?;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry.format())
    }

    pub fn debug(&self, message: &str, job_id: Option<&str>) {
        self.log(LogLevel::Debug, message, job_id, None);
    }

    pub fn info(&self, message: &str, job_id: Option<&str>) {
        self.log(LogLevel::Info, message, job_id, None);
    }

    pub fn warning(&self, message: &str, job_id: Option<&str>) {
        self.log(LogLevel::Warning, message, job_id, None);
    }

    pub fn error(&self, message: &str, job_id: Option<&str>) {
        self.log(LogLevel::Error, message, job_id, None);
    }

    /// The last `limit` entries logged today, oldest first.
    pub fn recent_entries(&self, limit: usize) -> Vec<LogEntry> {
        self.entries_for(Utc::now().date_naive(), limit)
    }

    /// The last `limit` entries of `date`'s file, oldest first.
    pub fn entries_for(&self, date: NaiveDate, limit: usize) -> Vec<LogEntry> {
        let Ok(content) = std::fs::read_to_string(self.file_for(date)) else {
            return Vec::new();
        };

        let entries: Vec<LogEntry> = content.lines().filter_map(LogEntry::parse_line).collect();
        let skip = entries.len().saturating_sub(limit);
        entries.into_iter().skip(skip).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn entry(job_id: Option<&str>, payload: Option<Value>) -> LogEntry {
        LogEntry {
            timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 8, 15, 2).unwrap(),
            level: LogLevel::Info,
            message: "Started new job".into(),
            job_id: job_id.map(str::to_string),
            payload,
        }
    }

    #[test]
    fn test_line_format() {
        assert_eq!(
            entry(Some("job_1_abc"), None).format(),
            "2026-10-19T08:15:02.000Z INFO    [Job: job_1_abc] Started new job"
        );
        assert_eq!(entry(None, None).format(), "2026-10-19T08:15:02.000Z INFO    Started new job");
    }

    #[test]
    fn test_payload_follows_line() {
        let formatted = entry(None, Some(json!({ "niche": "motivational" }))).format();
        let mut lines = formatted.lines();
        assert!(lines.next().unwrap().ends_with("Started new job"));
        assert_eq!(lines.next(), Some("{"));
        assert_eq!(lines.next(), Some("  \"niche\": \"motivational\""));
    }

    #[test]
    fn test_parse_round_trip() {
        let original = entry(Some("job_1_abc"), None);
        assert_eq!(LogEntry::parse_line(&original.format()), Some(original));
        assert!(LogEntry::parse_line("  \"niche\": \"motivational\"").is_none());
    }

    #[test]
    fn test_writes_to_today_file_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let logger = EventLogger::new(dir.path().join("logs"));

        logger.log(LogLevel::Info, "first", Some("job_1"), Some(json!({ "a": 1 })));
        logger.warning("second", None);
        logger.error("third", Some("job_2"));

        let path = logger.file_for(Utc::now().date_naive());
        assert!(path.exists());

        let recent = logger.recent_entries(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "second");
        assert_eq!(recent[0].level, LogLevel::Warning);
        assert_eq!(recent[1].job_id.as_deref(), Some("job_2"));
    }

    #[test]
    fn test_file_name_follows_entry_date() {
        let logger = EventLogger::new("/var/log/sofy");
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        assert_eq!(logger.file_for(date), PathBuf::from("/var/log/sofy/2026-01-02.log"));
    }

    #[test]
    fn test_entries_across_midnight_go_to_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let logger = EventLogger::new(dir.path());

        let mut before = entry(Some("job_1_abc"), None);
        before.timestamp = Utc.with_ymd_and_hms(2026, 10, 19, 23, 59, 59).unwrap();
        before.message = "before midnight".to_string();
        let mut after = entry(Some("job_1_abc"), None);
        after.timestamp = Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 1).unwrap();
        after.message = "after midnight".to_string();

        logger.append(&before).unwrap();
        logger.append(&after).unwrap();

        let day1 = logger.entries_for(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), 10);
        let day2 = logger.entries_for(NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(), 10);
        assert_eq!(day1.len(), 1);
        assert_eq!(day1[0].message, "before midnight");
        assert_eq!(day2.len(), 1);
        assert_eq!(day2[0].message, "after midnight");
    }
}
