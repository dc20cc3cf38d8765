//! Incremental splitting of raw pipe output into lines.

/// Accumulates bytes and yields a line at every `\n`, `\r` or `\r\n`.
///
/// Bytes without a terminator stay pending until one arrives or the stream
/// ends, so multi-byte characters split across reads decode correctly.
#[derive(Debug, Default)]
pub(crate) struct LineSplitter {
    pending: Vec<u8>,
    after_cr: bool,
}

impl LineSplitter {
    /// Feeds a chunk and returns every line it completed.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            match byte {
                // The `\r` before it already ended the line.
                b'\n' if self.after_cr => self.after_cr = false,
                b'\n' | b'\r' => {
                    lines.push(self.take());
                    self.after_cr = byte == b'\r';
                }
                _ => {
                    self.pending.push(byte);
                    self.after_cr = false;
                }
            }
        }
        lines
    }

    /// Returns the unterminated tail, if any, at end of stream.
    pub(crate) fn finish(&mut self) -> Option<String> {
        (!self.pending.is_empty()).then(|| self.take())
    }

    fn take(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}
