//! Prediction audit log
//!
//! Optional append-only CSV sink receiving one row per scored request.
//! Appends serialize through a mutex so concurrent requests never interleave
//! a record; write order carries no guarantee relative to request arrival.
//! Auditing is best-effort: a failed append is the caller's to log, never to
//! propagate into the scoring response.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;

use crate::scoring::inference::ScoreResult;
use crate::scoring::record::FeatureRecord;

pub struct AuditLog {
    file: Mutex<File>,
    feature_columns: Vec<String>,
}

impl AuditLog {
    /// Open (or create) the sink. The header row is written exactly once,
    /// when the file is newly created; reopening an existing log appends.
    pub fn create(path: &Path, feature_columns: &[String]) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata()?.len() == 0 {
            let header = format!(
                "timestamp,client_id,prediction,score,{}",
                feature_columns.join(",")
            );
            writeln!(file, "{}", header)?;
        }

        Ok(Self {
            file: Mutex::new(file),
            feature_columns: feature_columns.to_vec(),
        })
    }

    /// Append one scored request. Missing feature values stay empty cells.
    pub fn append(
        &self,
        client_id: i64,
        vector: &FeatureRecord,
        result: &ScoreResult,
    ) -> io::Result<()> {
        let mut line = format!(
            "{},{},{},{}",
            Utc::now().to_rfc3339(),
            client_id,
            result.prediction,
            result.score
        );
        for column in &self.feature_columns {
            line.push(',');
            if let Some(value) = vector.get(column) {
                line.push_str(&value.to_string());
            }
        }

        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "audit log lock poisoned"))?;
        writeln!(file, "{}", line)
    }
}
