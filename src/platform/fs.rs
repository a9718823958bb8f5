// LogSections - platform/fs.rs
//
// File access for log and series inputs. Readers are handed to the core
// layer as BufRead and closed when dropped.

use crate::util::error::LogSectionsError;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Open a log file for buffered, line-by-line reading.
pub fn open_log(path: &Path) -> Result<BufReader<File>, LogSectionsError> {
    let file = File::open(path).map_err(|source| LogSectionsError::Io {
        path: path.to_path_buf(),
        operation: "open",
        source,
    })?;
    tracing::debug!(path = %path.display(), "Opened log file");
    Ok(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Write};

    #[test]
    fn test_open_log_reads_lines() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "first").unwrap();
        writeln!(tmp, "second").unwrap();

        let lines: Vec<_> = open_log(tmp.path())
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_open_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.log");
        let err = open_log(&missing).unwrap_err();
        assert!(matches!(
            err,
            LogSectionsError::Io { operation: "open", ref path, .. } if *path == missing
        ));
        assert!(err.to_string().contains("absent.log"));
    }
}
