//! Console I/O seen by the task loop and the command handlers.

use core::fmt;

use super::channel::{ChannelWriter, ConsolePort, Exclusive, FaultPort};
use super::line_buffer::{ByteSource, ConsoleLine, LineReader};
use super::ConsoleError;

/// Text output that can be pushed to the wire mid-line.
pub trait ConsoleOut: fmt::Write {
    /// Equivalent of `fflush(stdout)`: send a partial line now.
    fn flush(&mut self);
}

/// Full duplex console: output plus blocking line input.
pub trait ConsoleIo: ConsoleOut {
    /// Flush pending output, then block for one line.
    fn read_line(&mut self, line: &mut ConsoleLine) -> Result<(), ConsoleError>;
}

impl<P, F, X> ConsoleOut for ChannelWriter<'_, P, F, X>
where
    P: ConsolePort,
    F: FaultPort,
    X: Exclusive,
{
    fn flush(&mut self) {
        ChannelWriter::flush(self);
    }
}

/// Console input and output bundled for the console task.
pub struct Terminal<'a, S, P, F, X> {
    reader: LineReader<S>,
    out: ChannelWriter<'a, P, F, X>,
}

impl<'a, S, P, F, X> Terminal<'a, S, P, F, X>
where
    S: ByteSource,
    P: ConsolePort,
    F: FaultPort,
    X: Exclusive,
{
    pub fn new(reader: LineReader<S>, out: ChannelWriter<'a, P, F, X>) -> Self {
        Self { reader, out }
    }
}

impl<S, P, F, X> fmt::Write for Terminal<'_, S, P, F, X>
where
    S: ByteSource,
    P: ConsolePort,
    F: FaultPort,
    X: Exclusive,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.write_str(s)
    }
}

impl<S, P, F, X> ConsoleOut for Terminal<'_, S, P, F, X>
where
    S: ByteSource,
    P: ConsolePort,
    F: FaultPort,
    X: Exclusive,
{
    fn flush(&mut self) {
        self.out.flush();
    }
}

impl<S, P, F, X> ConsoleIo for Terminal<'_, S, P, F, X>
where
    S: ByteSource,
    P: ConsolePort,
    F: FaultPort,
    X: Exclusive,
{
    fn read_line(&mut self, line: &mut ConsoleLine) -> Result<(), ConsoleError> {
        self.out.flush();
        self.reader.read_line(line, &mut self.out)
    }
}
