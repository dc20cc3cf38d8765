//! Destinations for subprocess output lines.

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Receives subprocess output as it arrives.
pub trait OutputSink: Send {
    /// Handles one line, without its trailing newline.
    fn line(&mut self, stream: OutputStream, line: &str);
}

/// Echoes both pipes to the console's standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn line(&mut self, _stream: OutputStream, line: &str) {
        println!("{line}");
    }
}

/// Discards all output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn line(&mut self, _stream: OutputStream, _line: &str) {}
}

/// Keeps every line, for tests and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    lines: Vec<(OutputStream, String)>,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines from one stream.
    #[must_use]
    pub fn stream(&self, stream: OutputStream) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, l)| l.as_str())
            .collect()
    }
}

impl OutputSink for CollectingSink {
    fn line(&mut self, stream: OutputStream, line: &str) {
        self.lines.push((stream, line.to_string()));
    }
}
