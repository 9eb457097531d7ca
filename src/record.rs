//! # Position Record Module
//!
//! Append-only log of positions captured on operator demand during tool
//! setup.
//!
//! ## Format
//!
//! Plain text, one position per line, `x,y,z` with each coordinate
//! truncated toward zero:
//!
//! ```text
//! 120,45,80
//! 121,45,12
//! ```
//!
//! No header and no versioning. The file is created empty by
//! [`PositionRecorder::initialize`] and only ever appended to afterwards.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{JogBridgeError, Result};
use crate::motion::MachinePosition;

/// Appends positions to a record file.
#[derive(Debug, Clone)]
pub struct PositionRecorder {
    path: PathBuf,
}

impl PositionRecorder {
    /// Creates a recorder for `path` without touching the file.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates an empty record file at `path`, truncating existing content.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the path is not writable.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use jog_bridge::record::PositionRecorder;
    ///
    /// let recorder = PositionRecorder::initialize("positions.txt")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn initialize<P: AsRef<Path>>(path: P) -> Result<Self> {
        File::create(path.as_ref())?;
        info!("Started new record file at {}", path.as_ref().display());
        Ok(Self::new(path))
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one `x,y,z` line and returns the recorded position.
    ///
    /// The file is opened in append mode, flushed and closed before
    /// returning, so nothing is buffered between calls.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened or written.
    pub fn record(&self, position: MachinePosition) -> Result<MachinePosition> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format_record(position).as_bytes())?;
        file.flush()?;

        debug!("Recorded {:?} to {}", position, self.path.display());
        Ok(position)
    }
}

/// Formats a position as a record line.
fn format_record(position: MachinePosition) -> String {
    format!(
        "{},{},{}\n",
        position.x.trunc() as i64,
        position.y.trunc() as i64,
        position.z.trunc() as i64
    )
}

/// Reads a record file back as integer triples, in file order.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// - `Io`: the file cannot be read
/// - `Record`: a line is not three comma-separated integers
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<[i64; 3]>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        let parsed: Option<Vec<i64>> = fields.iter().map(|f| f.trim().parse().ok()).collect();
        match parsed.as_deref() {
            Some(&[x, y, z]) => records.push([x, y, z]),
            _ => {
                return Err(JogBridgeError::Record(format!(
                    "line {}: expected x,y,z but found {:?}",
                    index + 1,
                    line
                )));
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_truncates_toward_zero() {
        let line = format_record(MachinePosition::new(12.9, -0.7, -3.2));
        assert_eq!(line, "12,0,-3\n");
    }

    #[test]
    fn test_initialize_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("positions.txt");

        PositionRecorder::initialize(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_initialize_truncates_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("positions.txt");
        fs::write(&path, "1,2,3\n4,5,6\n").unwrap();

        let recorder = PositionRecorder::initialize(&path).unwrap();
        recorder.record(MachinePosition::new(7.0, 8.0, 9.0)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "7,8,9\n");
    }

    #[test]
    fn test_records_append_in_call_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("positions.txt");
        let recorder = PositionRecorder::initialize(&path).unwrap();

        recorder.record(MachinePosition::new(100.4, 50.0, 20.0)).unwrap();
        recorder.record(MachinePosition::new(100.4, 50.0, 20.0)).unwrap();
        recorder.record(MachinePosition::new(1.0, 2.0, 3.0)).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "100,50,20\n100,50,20\n1,2,3\n"
        );
    }

    #[test]
    fn test_record_returns_position() {
        let dir = tempdir().unwrap();
        let recorder = PositionRecorder::new(dir.path().join("positions.txt"));
        let position = MachinePosition::new(1.5, 2.5, 3.5);
        assert_eq!(recorder.record(position).unwrap(), position);
    }

    #[test]
    fn test_initialize_unwritable_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("positions.txt");
        assert!(matches!(
            PositionRecorder::initialize(&path),
            Err(JogBridgeError::Io(_))
        ));
    }

    #[test]
    fn test_read_records_roundtrip_with_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("positions.txt");
        fs::write(&path, "1,2,3\n\n-4, 5 ,6\n").unwrap();

        assert_eq!(read_records(&path).unwrap(), vec![[1, 2, 3], [-4, 5, 6]]);
    }

    #[test]
    fn test_read_records_rejects_malformed_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("positions.txt");
        fs::write(&path, "1,2,3\n4,5\n").unwrap();

        match read_records(&path) {
            Err(JogBridgeError::Record(msg)) => assert!(msg.contains("line 2")),
            other => panic!("Expected Record error, got: {:?}", other),
        }
    }
}
