//! Bulk search across archives.
//!
//! Every archive below a directory is opened on one of a fixed number of
//! worker threads. Each worker decodes its own archive, so no decoded
//! state is shared; only the hit list is behind a lock. A caller-owned
//! stop flag is checked between archives.

use crate::error::{ConfigError, SearchError};
use parking_lot::Mutex;
use serde::Serialize;
use starbit_formats::bcsv::{BcsvTable, FieldValue};
use starbit_formats::msbt::MsbtFile;
use starbit_formats::rarc::RarcArchive;
use starbit_hash::FieldNameTable;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Bulk search settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Worker threads
    pub threads: usize,
    /// Stop after this many hits
    pub max_hits: usize,
    /// Archive file extensions, lowercase
    pub extensions: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism().map_or(4, usize::from),
            max_hits: 1000,
            extensions: vec!["arc".to_string()],
        }
    }
}

impl SearchConfig {
    /// Set the worker thread count
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the hit limit
    #[must_use]
    pub const fn with_max_hits(mut self, max_hits: usize) -> Self {
        self.max_hits = max_hits;
        self
    }

    /// Set the archive extensions
    #[must_use]
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|ext| ext.to_ascii_lowercase()).collect();
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 || self.threads > crate::config::MAX_THREADS {
            return Err(ConfigError::InvalidThreads(self.threads));
        }
        if self.max_hits == 0 {
            return Err(ConfigError::InvalidMaxHits);
        }
        Ok(())
    }
}

/// One match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SearchHit {
    /// Archive containing the match
    pub archive: PathBuf,
    /// File inside the archive
    pub file: String,
    /// Row and column, or message label
    pub location: String,
    /// Matching value as displayed
    pub value: String,
}

/// Outcome of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    /// Archives opened
    pub scanned: usize,
    /// Archives that could not be opened
    pub failed: usize,
    /// Whether the stop flag or the hit limit ended the search early
    pub stopped: bool,
    /// Matches, sorted by archive, file, and location
    pub hits: Vec<SearchHit>,
}

/// Find archive files below `dir`, sorted by path.
pub fn collect_archives(dir: &Path, config: &SearchConfig) -> Vec<PathBuf> {
    let mut archives: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    config
                        .extensions
                        .iter()
                        .any(|wanted| wanted.eq_ignore_ascii_case(ext))
                })
        })
        .map(walkdir::DirEntry::into_path)
        .collect();
    archives.sort();
    archives
}

/// Search every archive below `dir` for `query`.
///
/// Strings match case-insensitively by substring; numbers match when
/// their displayed form equals the query.
pub fn run(
    dir: &Path,
    query: &str,
    names: &FieldNameTable,
    config: &SearchConfig,
    stop: &AtomicBool,
) -> Result<SearchReport, SearchError> {
    config.validate()?;
    if !dir.is_dir() {
        return Err(SearchError::NotADirectory(dir.to_path_buf()));
    }

    let archives = collect_archives(dir, config);
    let workers = config.threads.min(archives.len()).max(1);
    info!(
        "Searching {} archives under {} with {} workers",
        archives.len(),
        dir.display(),
        workers
    );

    let next = AtomicUsize::new(0);
    let scanned = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let full = AtomicBool::new(false);
    let hits = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                while !stop.load(Ordering::Relaxed) && !full.load(Ordering::Relaxed) {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(path) = archives.get(index) else {
                        break;
                    };

                    let archive = match RarcArchive::open_path(path) {
                        Ok(archive) => archive,
                        Err(e) => {
                            warn!("Skipping {}: {}", path.display(), e);
                            failed.fetch_add(1, Ordering::Relaxed);
                            continue;
                        }
                    };
                    scanned.fetch_add(1, Ordering::Relaxed);

                    let found = search_archive(path, &archive, query, names);
                    if found.is_empty() {
                        continue;
                    }

                    let mut hits = hits.lock();
                    hits.extend(found);
                    if hits.len() >= config.max_hits {
                        full.store(true, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    let mut hits = hits.into_inner();
    hits.sort();
    hits.truncate(config.max_hits);

    let report = SearchReport {
        scanned: scanned.into_inner(),
        failed: failed.into_inner(),
        stopped: stop.load(Ordering::Relaxed) || full.into_inner(),
        hits,
    };
    info!(
        "Search finished: {} scanned, {} failed, {} hits",
        report.scanned,
        report.failed,
        report.hits.len()
    );
    Ok(report)
}

/// Search the tables and message files of one archive.
pub fn search_archive(
    path: &Path,
    archive: &RarcArchive,
    query: &str,
    names: &FieldNameTable,
) -> Vec<SearchHit> {
    let needle = query.to_lowercase();
    let mut hits = Vec::new();
    let mut hit = |file: &str, location: String, value: String| {
        hits.push(SearchHit {
            archive: path.to_path_buf(),
            file: file.to_string(),
            location,
            value,
        });
    };

    for (file_path, file) in archive.walk() {
        let lower = file_path.to_ascii_lowercase();
        if lower.ends_with(".msbt") {
            match MsbtFile::parse(&file.data) {
                Ok(messages) => {
                    for message in messages.messages() {
                        let text = message.text.to_string_lossy();
                        if text.to_lowercase().contains(&needle) {
                            hit(&file_path, message.label.clone(), text);
                        }
                    }
                }
                Err(e) => debug!("{}: not a message table: {}", file_path, e),
            }
        } else if is_table_name(&lower) {
            let Ok(table) = BcsvTable::parse(&file.data) else {
                continue;
            };
            let columns = table.column_names(names);
            for (row, entry) in table.entries().iter().enumerate() {
                for (column, value) in columns.iter().zip(entry.values()) {
                    if value_matches(value, query, &needle) {
                        hit(&file_path, format!("{row}:{column}"), value.display());
                    }
                }
            }
        }
    }

    hits
}

/// Tables are stored with a table extension or with no extension at all
fn is_table_name(lower: &str) -> bool {
    let name = lower.rsplit('/').next().unwrap_or(lower);
    match name.rsplit_once('.') {
        Some((_, ext)) => matches!(ext, "bcsv" | "tbl" | "banmt" | "pa"),
        None => true,
    }
}

fn value_matches(value: &FieldValue, query: &str, needle: &str) -> bool {
    match value.as_str() {
        Some(text) => text.to_lowercase().contains(needle),
        None => value.display() == query,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use starbit_formats::bcsv::FieldType;
    use starbit_formats::msbt::Message;

    fn write_archive(path: &Path, object: &str, message: &str) {
        let mut table = BcsvTable::new();
        table.add_field("name", FieldType::StringOffset).unwrap();
        table.add_field("l_id", FieldType::Int).unwrap();
        let row = table.add_entry();
        table
            .set_value(row, "name", FieldValue::String(object.to_string()))
            .unwrap();
        table.set_value(row, "l_id", FieldValue::Int(42)).unwrap();

        let mut messages = MsbtFile::new();
        messages.add_message(Message::new("Line", message));

        let mut archive = RarcArchive::new("Stage");
        archive.create_directory("", "jmp").unwrap();
        let handle = archive.create_file("jmp", "ObjInfo").unwrap();
        archive.set_contents(&handle, table.build().unwrap()).unwrap();
        let handle = archive.create_file("", "Talk.msbt").unwrap();
        archive.set_contents(&handle, messages.build().unwrap()).unwrap();
        archive.save_to(path).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write_archive(&dir.path().join("A.arc"), "Kuribo", "Watch out for Goombas");
        write_archive(&dir.path().join("nested/B.ARC"), "Coin", "Nothing here");
        std::fs::write(dir.path().join("broken.arc"), b"not an archive").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"Kuribo").unwrap();
        dir
    }

    #[test]
    fn test_collect_archives() {
        let dir = fixture();
        let archives = collect_archives(dir.path(), &SearchConfig::default());
        let names: Vec<_> = archives
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.arc", "broken.arc", "B.ARC"]);
    }

    #[test]
    fn test_search_strings_and_messages() {
        let dir = fixture();
        let stop = AtomicBool::new(false);
        let config = SearchConfig::default().with_threads(2);
        let report = run(
            dir.path(),
            "kuribo",
            &FieldNameTable::with_defaults(),
            &config,
            &stop,
        )
        .unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.stopped);
        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.hits[0].file, "jmp/ObjInfo");
        assert_eq!(report.hits[0].location, "0:name");
        assert_eq!(report.hits[0].value, "Kuribo");

        let report = run(
            dir.path(),
            "goombas",
            &FieldNameTable::with_defaults(),
            &config,
            &stop,
        )
        .unwrap();
        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.hits[0].location, "Line");
    }

    #[test]
    fn test_search_numbers_exactly() {
        let dir = fixture();
        let stop = AtomicBool::new(false);
        let names = FieldNameTable::with_defaults();
        let config = SearchConfig::default();

        let report = run(dir.path(), "42", &names, &config, &stop).unwrap();
        assert_eq!(report.hits.len(), 2);
        assert!(report.hits.iter().all(|hit| hit.location == "0:l_id"));

        let report = run(dir.path(), "4", &names, &config, &stop).unwrap();
        assert!(report.hits.is_empty());
    }

    #[test]
    fn test_stop_flag_and_hit_limit() {
        let dir = fixture();
        let names = FieldNameTable::with_defaults();

        let stop = AtomicBool::new(true);
        let report = run(dir.path(), "42", &names, &SearchConfig::default(), &stop).unwrap();
        assert_eq!(report.scanned, 0);
        assert!(report.stopped);

        let stop = AtomicBool::new(false);
        let config = SearchConfig::default().with_threads(1).with_max_hits(1);
        let report = run(dir.path(), "42", &names, &config, &stop).unwrap();
        assert_eq!(report.hits.len(), 1);
        assert!(report.stopped);
    }

    #[test]
    fn test_invalid_inputs() {
        let stop = AtomicBool::new(false);
        let names = FieldNameTable::empty();
        let config = SearchConfig::default().with_threads(0);
        assert!(matches!(
            run(Path::new("."), "x", &names, &config, &stop),
            Err(SearchError::Config(ConfigError::InvalidThreads(0)))
        ));

        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            run(file.path(), "x", &names, &SearchConfig::default(), &stop),
            Err(SearchError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_table_names() {
        assert!(is_table_name("jmp/placement/objinfo"));
        assert!(is_table_name("jmp/list/scenariodata.bcsv"));
        assert!(!is_table_name("talk.msbf"));
        assert!(!is_table_name("stage.bdl"));
    }
}
