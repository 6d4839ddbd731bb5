//! Per-epoch CSV training log.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TrainError;

/// Header row, written once when the log is created.
pub const HEADER: &str = "Epoch,total_loss,task_loss,contrast_loss,validation_loss,ADE,FDE,COLL";

/// One row of the training log.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Epoch index.
    #[serde(rename = "Epoch")]
    pub epoch: usize,
    /// Mean total training loss.
    pub total_loss: f64,
    /// Mean task loss.
    pub task_loss: f64,
    /// Mean contrastive loss.
    pub contrast_loss: f64,
    /// Validation NLL.
    pub validation_loss: f64,
    /// Test ADE.
    #[serde(rename = "ADE")]
    pub ade: f64,
    /// Test FDE.
    #[serde(rename = "FDE")]
    pub fde: f64,
    /// Test joint cumulative collision rate at level 2.
    #[serde(rename = "COLL")]
    pub coll: f64,
}

/// Append-only `training_log.csv`.
#[derive(Clone, Debug)]
pub struct TrainingLog {
    path: PathBuf,
}

impl TrainingLog {
    /// Log stored at `path`; nothing is written until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the CSV file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first if the file is new or empty.
    pub fn append(&self, record: &EpochRecord) -> Result<(), TrainError> {
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        wtr.serialize(record)?;
        wtr.flush()?;
        Ok(())
    }

    /// Every row recorded so far. A missing file reads as empty.
    pub fn read(&self) -> Result<Vec<EpochRecord>, TrainError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&self.path)?;
        let records = rdr.deserialize().collect::<Result<Vec<EpochRecord>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn record(epoch: usize, fde: f64) -> EpochRecord {
        EpochRecord {
            epoch,
            total_loss: 1.5,
            task_loss: 1.25,
            contrast_loss: 5.0,
            validation_loss: 2.0,
            ade: 0.5,
            fde,
            coll: 0.125,
        }
    }

    #[test]
    fn header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = TrainingLog::new(dir.path().join("training_log.csv"));
        log.append(&record(0, 1.0)).unwrap();
        log.append(&record(1, 0.9)).unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(text.matches("Epoch").count(), 1);
        assert_eq!(log.read().unwrap(), vec![record(0, 1.0), record(1, 0.9)]);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = TrainingLog::new(dir.path().join("absent.csv"));
        assert!(log.read().unwrap().is_empty());
    }

    #[test]
    fn malformed_row_reports_its_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training_log.csv");
        fs::write(&path, format!("{HEADER}\n0,1,2,3,4,5,6,7\n1,oops,2,3,4,5,6,7\n")).unwrap();
        let err = TrainingLog::new(path).read().unwrap_err();
        let TrainError::Csv(err) = err else {
            panic!("expected a csv error, got {err:?}");
        };
        assert_eq!(err.position().map(|p| p.line()), Some(3));
    }

    #[test]
    fn header_matches_record_fields() {
        let dir = tempfile::tempdir().unwrap();
        let log = TrainingLog::new(dir.path().join("training_log.csv"));
        log.append(&record(3, 0.75)).unwrap();
        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().next(), Some(HEADER));
        assert_eq!(text.lines().nth(1), Some("3,1.5,1.25,5.0,2.0,0.5,0.75,0.125"));
    }

    #[test]
    fn appends_to_a_log_from_an_earlier_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training_log.csv");
        TrainingLog::new(&path).append(&record(0, 1.0)).unwrap();
        let resumed = TrainingLog::new(&path);
        resumed.append(&record(1, 0.8)).unwrap();
        assert_eq!(resumed.read().unwrap(), vec![record(0, 1.0), record(1, 0.8)]);
    }
}
