use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Sink for key metadata captured during a rotation
pub trait KeyRecorder {
    /// Store the full checkout-key listing of a project whose legacy key is about to be replaced
    fn record_old_key(&self, organization: &str, project: &str, key_list: &str) -> io::Result<()>;

    /// Store the key the provider created as replacement
    fn record_new_key(&self, organization: &str, project: &str, new_key: &str) -> io::Result<()>;
}

/// Line written to the new-key log
pub fn new_key_line(project: &str, new_key: &str) -> String {
    format!("{project} new prefered key: {new_key} ")
}

/// Appends to `old_keys_<org>.txt` and `new_keys_<org>.txt` in one directory.
///
/// Each write opens, appends and closes the file again.
#[derive(Debug, Clone)]
pub struct FileKeyRecorder {
    directory: PathBuf,
}

impl FileKeyRecorder {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn old_keys_path(&self, organization: &str) -> PathBuf {
        self.directory.join(format!("old_keys_{organization}.txt"))
    }

    pub fn new_keys_path(&self, organization: &str) -> PathBuf {
        self.directory.join(format!("new_keys_{organization}.txt"))
    }

    fn append_line(path: &Path, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")?;
        debug!(path = %path.display(), "appended key record");
        Ok(())
    }
}

impl KeyRecorder for FileKeyRecorder {
    fn record_old_key(&self, organization: &str, _project: &str, key_list: &str) -> io::Result<()> {
        Self::append_line(&self.old_keys_path(organization), key_list)
    }

    fn record_new_key(&self, organization: &str, project: &str, new_key: &str) -> io::Result<()> {
        Self::append_line(&self.new_keys_path(organization), &new_key_line(project, new_key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedKey {
    Old {
        organization: String,
        project: String,
        key_list: String,
    },
    New {
        organization: String,
        project: String,
        new_key: String,
    },
}

/// Keeps records in memory, in write order
#[derive(Debug, Default)]
pub struct MemoryKeyRecorder {
    records: Mutex<Vec<RecordedKey>>,
}

impl MemoryKeyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RecordedKey> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn old_keys(&self) -> Vec<RecordedKey> {
        self.records()
            .into_iter()
            .filter(|r| matches!(r, RecordedKey::Old { .. }))
            .collect()
    }

    pub fn new_keys(&self) -> Vec<RecordedKey> {
        self.records()
            .into_iter()
            .filter(|r| matches!(r, RecordedKey::New { .. }))
            .collect()
    }

    fn push(&self, record: RecordedKey) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

impl KeyRecorder for MemoryKeyRecorder {
    fn record_old_key(&self, organization: &str, project: &str, key_list: &str) -> io::Result<()> {
        self.push(RecordedKey::Old {
            organization: organization.to_string(),
            project: project.to_string(),
            key_list: key_list.to_string(),
        });
        Ok(())
    }

    fn record_new_key(&self, organization: &str, project: &str, new_key: &str) -> io::Result<()> {
        self.push(RecordedKey::New {
            organization: organization.to_string(),
            project: project.to_string(),
            new_key: new_key.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_recorder_paths() {
        let recorder = FileKeyRecorder::new("/tmp/logs");

        assert_eq!(recorder.old_keys_path("acme"), PathBuf::from("/tmp/logs/old_keys_acme.txt"));
        assert_eq!(recorder.new_keys_path("acme"), PathBuf::from("/tmp/logs/new_keys_acme.txt"));
    }

    #[test]
    fn test_file_recorder_appends() {
        let dir = tempdir().unwrap();
        let recorder = FileKeyRecorder::new(dir.path());

        recorder.record_old_key("acme", "widgets", r#"{"items":[1]}"#).unwrap();
        recorder.record_old_key("acme", "gizmos", r#"{"items":[2]}"#).unwrap();
        recorder.record_new_key("acme", "widgets", r#"{"type":"deploy-key"}"#).unwrap();

        let old = std::fs::read_to_string(recorder.old_keys_path("acme")).unwrap();
        assert_eq!(old, "{\"items\":[1]}\n{\"items\":[2]}\n");

        let new = std::fs::read_to_string(recorder.new_keys_path("acme")).unwrap();
        assert_eq!(new, "widgets new prefered key: {\"type\":\"deploy-key\"} \n");
    }

    #[test]
    fn test_file_recorder_keeps_existing_content() {
        let dir = tempdir().unwrap();
        let recorder = FileKeyRecorder::new(dir.path());
        std::fs::write(recorder.old_keys_path("acme"), "earlier run\n").unwrap();

        recorder.record_old_key("acme", "widgets", "{}").unwrap();

        let old = std::fs::read_to_string(recorder.old_keys_path("acme")).unwrap();
        assert_eq!(old, "earlier run\n{}\n");
    }

    #[test]
    fn test_file_recorder_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let recorder = FileKeyRecorder::new(dir.path().join("missing"));

        assert!(recorder.record_old_key("acme", "widgets", "{}").is_err());
    }

    #[test]
    fn test_memory_recorder_keeps_order() {
        let recorder = MemoryKeyRecorder::new();

        recorder.record_old_key("acme", "widgets", "old").unwrap();
        recorder.record_new_key("acme", "widgets", "new").unwrap();

        assert_eq!(recorder.records().len(), 2);
        assert_eq!(
            recorder.old_keys(),
            vec![RecordedKey::Old {
                organization: "acme".to_string(),
                project: "widgets".to_string(),
                key_list: "old".to_string(),
            }]
        );
        assert_eq!(recorder.new_keys().len(), 1);
    }
}
