//! Reassembles newline-delimited lines from arbitrary read chunks.
//!
//! A single read may carry several lines, a fragment of one, or both. Bytes
//! after the last newline stay buffered until a later read completes them.

use crate::error::ConnectionError;

/// Size of one socket read.
pub const READ_CHUNK: usize = 1024;

/// Longest partial line kept before the peer is considered broken.
pub const MAX_PENDING_LINE: usize = 64 * 1024;

#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every line they complete, without the
    /// delimiter. Blank lines are dropped. Invalid UTF-8 is replaced rather
    /// than rejected.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, ConnectionError> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.pending[start..end]);
            if !line.trim().is_empty() {
                lines.push(line.into_owned());
            }
            start = end + 1;
        }
        self.pending.drain(..start);

        if self.pending.len() > MAX_PENDING_LINE {
            return Err(ConnectionError::LineTooLong {
                limit: MAX_PENDING_LINE,
            });
        }
        Ok(lines)
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
