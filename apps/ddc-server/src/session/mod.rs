//! In-memory build and extract sessions
//!
//! - `store`: session records keyed by id, absolute TTL and a periodic sweep
//! - `builder`: descriptor + document upload, build, chunked card download
//! - `extractor`: chunked card upload, parse, document and signature download
//!
//! Every operation locks its record for its whole duration, scanner and
//! renderer calls included. Different sessions never wait on each other.

pub mod builder;
pub mod clock;
pub mod extractor;
pub mod store;
pub mod types;

pub use builder::BuilderSession;
pub use clock::{Clock, ManualClock, SystemClock};
pub use extractor::ExtractorSession;
pub use store::{SessionState, SessionStore};
pub use types::{Result, SessionError, SESSION_TTL, SWEEP_INTERVAL};

use crate::scanner::{ScanVerdict, Scanner};

/// Scan `data` and turn anything but a clean verdict into an error
pub(crate) async fn ensure_clean(scanner: &dyn Scanner, data: &[u8], what: &str) -> Result<()> {
    match scanner.scan(data).await? {
        ScanVerdict::Clean => Ok(()),
        ScanVerdict::Infected(detail) => {
            tracing::warn!(
                target_kind = what,
                bytes = data.len(),
                detail = %detail.trim_end(),
                "Antivirus scan rejected data"
            );
            Err(SessionError::ScanRejected(detail))
        }
    }
}

/// Sequential reader over a finished buffer
#[derive(Debug, Default)]
pub struct PartReader {
    bytes: Vec<u8>,
    cursor: usize,
}

impl PartReader {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Next part of at most `max` bytes; the flag is set once the cursor
    /// reaches the end of the buffer
    pub fn next_part(&mut self, max: usize) -> Result<(Vec<u8>, bool)> {
        if max == 0 {
            return Err(SessionError::Validation(
                "MaxPartSize must be positive".to_string(),
            ));
        }

        let end = self.cursor + max.min(self.remaining());
        let part = self.bytes[self.cursor..end].to_vec();
        self.cursor = end;

        Ok((part, self.cursor == self.bytes.len()))
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_reassemble_with_final_flag_on_last() {
        let data: Vec<u8> = (0..=24u8).collect();
        let mut reader = PartReader::new(data.clone());

        let mut out = Vec::new();
        let mut flags = Vec::new();
        loop {
            let (part, is_final) = reader.next_part(10).unwrap();
            out.extend(part);
            flags.push(is_final);
            if is_final {
                break;
            }
        }

        assert_eq!(out, data);
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn test_exact_multiple_ends_on_full_part() {
        let mut reader = PartReader::new(vec![1; 20]);
        assert_eq!(reader.next_part(10).unwrap().1, false);
        let (part, is_final) = reader.next_part(10).unwrap();
        assert_eq!(part.len(), 10);
        assert!(is_final);
    }

    #[test]
    fn test_reading_past_end_yields_empty_final_parts() {
        let mut reader = PartReader::new(vec![7; 3]);
        reader.next_part(5).unwrap();
        assert_eq!(reader.next_part(5).unwrap(), (Vec::new(), true));
    }

    #[test]
    fn test_rewind_restarts_from_zero() {
        let mut reader = PartReader::new(b"abcdef".to_vec());
        reader.next_part(4).unwrap();
        reader.rewind();
        assert_eq!(reader.next_part(3).unwrap(), (b"abc".to_vec(), false));
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn test_zero_max_is_rejected() {
        let mut reader = PartReader::new(b"abc".to_vec());
        assert!(matches!(reader.next_part(0), Err(SessionError::Validation(_))));
    }

    #[tokio::test]
    async fn test_ensure_clean_maps_verdicts() {
        let scanner = testing::MarkerScanner::default();
        assert!(ensure_clean(&scanner, b"fine", "test").await.is_ok());
        assert!(matches!(
            ensure_clean(&scanner, b"EICAR", "test").await,
            Err(SessionError::ScanRejected(_))
        ));

        let broken = testing::BrokenScanner;
        assert!(matches!(
            ensure_clean(&broken, b"fine", "test").await,
            Err(SessionError::ScanTransport(_))
        ));
    }
}
