//! Serial test console
//!
//! Numeric menu over the console UART. Zero heap allocation - all
//! static buffers. Output goes through the shared [`ConsoleChannel`],
//! never directly to the UART.

pub mod channel;
pub mod commands;
pub mod console;
pub mod error;
pub mod io;
pub mod line_buffer;
pub mod parser;

pub use channel::{ChannelWriter, ConsoleChannel, ConsolePort, Exclusive, FaultPort};
pub use commands::{dispatch, find, print_menu, Command, HandlerContext, COMMANDS};
pub use console::{ConsoleState, ConsoleTask};
pub use error::ConsoleError;
pub use io::{ConsoleIo, ConsoleOut, Terminal};
pub use line_buffer::{ByteSource, ConsoleLine, LineDisplay, LineReader, LINE_CAPACITY, MAX_LINE_CHARS};
pub use parser::{parse_choice, parse_duty};
