//! Reassembly of newline-delimited records from arbitrary byte chunks.

use crate::error::AssistError;

/// Largest partial line kept between reads.
pub const MAX_LINE_BUFFER_BYTES: usize = 4 * 1024 * 1024;

fn find_line_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.iter().position(|&b| b == b'\n')
}

fn drain_next_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = find_line_boundary(buffer)?;
    let mut line: Vec<u8> = buffer.drain(..=pos).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Buffers bytes and yields each complete line; a trailing partial line is
/// held until the next [`feed`](Self::feed) or [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every line they completed. Blank lines are
    /// dropped.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Vec<u8>>, AssistError> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(line) = drain_next_line(&mut self.buffer) {
            if !is_blank(&line) {
                lines.push(line);
            }
        }

        if self.buffer.len() > MAX_LINE_BUFFER_BYTES {
            self.buffer.clear();
            return Err(AssistError::LineTooLong(MAX_LINE_BUFFER_BYTES));
        }
        Ok(lines)
    }

    /// The unterminated last line, if the stream did not end with a newline.
    #[must_use]
    pub fn finish(self) -> Option<Vec<u8>> {
        let mut rest = self.buffer;
        if rest.last() == Some(&b'\r') {
            rest.pop();
        }
        (!is_blank(&rest)).then_some(rest)
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
