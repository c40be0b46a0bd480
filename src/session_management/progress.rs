use std::io::{self, Write};

/// Running message counter shown on the diagnostic stream.
///
/// The counter is always kept; it is only rendered when display is enabled.
/// Writes go straight to the sink (stderr in the binary), never through the
/// logger and never to the trace output.
pub struct Progress {
    sink: Box<dyn Write + Send>,
    enabled: bool,
    count: u64,
}

impl Progress {
    pub fn new(sink: Box<dyn Write + Send>, enabled: bool) -> Self {
        Self {
            sink,
            enabled,
            count: 0,
        }
    }

    pub fn stderr(enabled: bool) -> Self {
        Self::new(Box::new(io::stderr()), enabled)
    }

    /// Discards all output; the count is still tracked.
    pub fn hidden() -> Self {
        Self::new(Box::new(io::sink()), false)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Bumps the counter and redraws `\r<label> #<n>` when enabled.
    pub fn tick(&mut self, label: &str) {
        self.count += 1;
        if self.enabled {
            // A broken diagnostic stream must not end the session.
            let _ = write!(self.sink, "\r{} #{}", label, self.count);
            let _ = self.sink.flush();
        }
    }

    /// Prints the final `\r<label> #<n>` line unconditionally.
    pub fn finish(&mut self, label: &str) {
        let _ = writeln!(self.sink, "\r{} #{}", label, self.count);
        let _ = self.sink.flush();
    }
}
