//! JSONL trace ingestion. One packet object per line; blank lines skipped.

use crate::Packet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error("packet file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid packet at {}:{line}: {source}", path.display())]
    InvalidPacket {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub struct PacketReader {
    path: PathBuf,
}

impl PacketReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ReadError::NotFound(path));
        }
        Ok(Self { path })
    }

    /// Lazily yields packets in file order. Errors carry the 1-based line.
    pub fn packets(&self) -> Result<impl Iterator<Item = Result<Packet, ReadError>> + '_, ReadError> {
        let file = File::open(&self.path).map_err(|source| ReadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let lines = BufReader::new(file).lines().enumerate();
        Ok(lines.filter_map(move |(idx, line)| {
            let line = match line {
                Ok(l) => l,
                Err(source) => {
                    return Some(Err(ReadError::Io {
                        path: self.path.clone(),
                        source,
                    }))
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(
                serde_json::from_str::<Packet>(trimmed).map_err(|source| {
                    ReadError::InvalidPacket {
                        path: self.path.clone(),
                        line: idx + 1,
                        source,
                    }
                }),
            )
        }))
    }

    pub fn read_all(&self) -> Result<Vec<Packet>, ReadError> {
        let packets = self.packets()?.collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(path = %self.path.display(), packets = packets.len(), "trace loaded");
        Ok(packets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{load_fixture_suite, Action};
    use std::fs;
    use tempfile::TempDir;

    fn write_trace(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("trace.jsonl");
        fs::write(&path, body).expect("write trace");
        path
    }

    #[test]
    fn reads_back_written_fixture() {
        let tmp = TempDir::new().unwrap();
        let packets = load_fixture_suite("guard_pressure", 42).unwrap();
        let body: String = packets
            .iter()
            .map(|p| format!("{}\n", serde_json::to_string(p).unwrap()))
            .collect();
        let path = write_trace(&tmp, &body);

        let read = PacketReader::open(&path).unwrap().read_all().unwrap();
        assert_eq!(read, packets);
    }

    #[test]
    fn skips_blank_lines_and_ignores_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        let path = write_trace(
            &tmp,
            "\n{\"run_id\":\"r\",\"step\":0,\"schema_version\":\"0.2.2\",\"mdm\":{\"action\":\"HOLD\",\"extra\":1},\"final_action\":{\"action\":\"HOLD\"},\"latency_ms\":2,\"producer\":\"x\"}\n   \n",
        );
        let read = PacketReader::open(&path).unwrap().read_all().unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].mdm.action.as_deref(), Some(Action::Hold.as_str()));
        assert_eq!(read[0].latency_ms, Some(2.0));
    }

    #[test]
    fn missing_optional_fields_are_defaulted() {
        let tmp = TempDir::new().unwrap();
        let path = write_trace(&tmp, "{\"run_id\":\"r\",\"step\":4,\"mismatch\":null}\n");
        let p = &PacketReader::open(&path).unwrap().read_all().unwrap()[0];
        assert!(p.schema_version.is_empty());
        assert!(p.is_allowed());
        assert!(p.external.is_none());
        assert!(p.mismatch.is_none());
        assert!(p.latency_ms.is_none());
        assert!(p.mdm.confidence.is_none());
    }

    #[test]
    fn null_collections_read_as_empty() {
        let tmp = TempDir::new().unwrap();
        let path = write_trace(
            &tmp,
            "{\"run_id\":\"r\",\"step\":0,\"input\":null,\"mismatch\":{\"flags\":null,\"reason_codes\":null}}\n",
        );
        let p = &PacketReader::open(&path).unwrap().read_all().unwrap()[0];
        assert!(p.input.is_empty());
        let mismatch = p.mismatch.as_ref().expect("mismatch present");
        assert!(mismatch.flags.is_empty());
        assert!(mismatch.reason_codes.is_empty());
        assert!(!p.has_deny_flags());
    }

    #[test]
    fn invalid_json_reports_line_number() {
        let tmp = TempDir::new().unwrap();
        let path = write_trace(
            &tmp,
            "{\"run_id\":\"r\",\"step\":0}\n\ninvalid json\n",
        );
        let err = PacketReader::open(&path).unwrap().read_all().unwrap_err();
        match err {
            ReadError::InvalidPacket { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_required_field_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let path = write_trace(&tmp, "{\"step\":0}\n");
        let err = PacketReader::open(&path).unwrap().read_all().unwrap_err();
        assert!(err.to_string().contains("invalid packet at"));
        assert!(err.to_string().contains(":1:"));
    }

    #[test]
    fn missing_file_is_rejected_on_open() {
        let err = PacketReader::open("nonexistent.jsonl").err().unwrap();
        assert!(matches!(err, ReadError::NotFound(_)));
    }
}
