//! Interactive command surface
//!
//! [`Command`]s are parsed from one input line each and run against a
//! [`ScanSession`]. Output is returned as lines so the binary decides where
//! it goes.

mod command;

pub use command::Command;

use crate::backend::MemoryBackend;
use crate::core::types::{MemoryError, MemoryResult, NumericType};
use crate::session::ScanSession;

/// Help text listing every command
pub const HELP: &str = "\
? - Show this message
q - Detach from process
qq - Detach from process and delete saved snapshots
t? - Show possible value types to use as 'type' args
s [value] [type] - Search for value from scratch
sc [value] [type] - Search for value using previously found addresses
su [type] - Search for unknown value from scratch
su> [type] - Search for unknown value > than previous
su< [type] - Search for unknown value < than previous
su= [type] - Search for unknown value = to previous
su!= [type] - Search for unknown value != to previous
r [addr(0x...)] [type] - Read value from address
w [addr(0x...)] [value] [type] - Write value to address
esr? - Show configured address range to search in
esr= [startAddr(0x...)] [endAddr(0x...)] - Set address range to search in
esr= [stack|heap] - Set address range to the process stack or heap";

/// What a command printed, and whether the session should end
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Reply {
            lines: lines.into_iter().map(Into::into).collect(),
            quit: false,
        }
    }

    fn line(line: impl Into<String>) -> Self {
        Reply::from_lines([line.into()])
    }

    fn quit(lines: Vec<String>) -> Self {
        Reply { lines, quit: true }
    }
}

/// Runs one command.
///
/// Conditions the operator can act on (no baseline, bad number, unknown
/// region) come back as an ordinary reply; other errors are returned.
pub async fn dispatch<B: MemoryBackend>(
    session: &mut ScanSession<B>,
    command: Command,
) -> MemoryResult<Reply> {
    match run(session, command).await {
        Err(e) if is_reportable(&e) => Ok(Reply::line(e.to_string())),
        other => other,
    }
}

fn is_reportable(error: &MemoryError) -> bool {
    error.is_missing_baseline()
        || matches!(
            error,
            MemoryError::NotANumber(_)
                | MemoryError::OutOfRange { .. }
                | MemoryError::Incomplete(_)
                | MemoryError::SnapshotMismatch(_)
                | MemoryError::RegionNotFound(_)
                | MemoryError::InvalidAddress(_)
        )
}

async fn run<B: MemoryBackend>(
    session: &mut ScanSession<B>,
    command: Command,
) -> MemoryResult<Reply> {
    let reply = match command {
        Command::Help => Reply::from_lines(HELP.lines()),
        Command::Quit => Reply::quit(Vec::new()),
        Command::QuitAndClean => {
            session.clear_storage().await?;
            Reply::quit(vec!["Cleaned up saved snapshots".to_string()])
        }
        Command::ListTypes => Reply::from_lines(NumericType::ALL.iter().map(|t| t.name())),
        Command::Search {
            value,
            value_type,
            refine,
        } => {
            let found = session.search_value(&value, value_type, refine).await?;
            let mut lines = vec![
                "Found addresses with value:".to_string(),
                "-------------------".to_string(),
            ];
            lines.extend(found.iter().map(ToString::to_string));
            lines.push("-------------------".to_string());
            Reply::from_lines(lines)
        }
        Command::ScanUnknown {
            value_type,
            predicate,
        } => {
            let report = session.scan_unknown(value_type, predicate).await?;
            Reply::line(report.to_string())
        }
        Command::Read {
            address,
            value_type,
        } => Reply::line(session.read_value(address, value_type).await?.to_string()),
        Command::Write {
            address,
            value,
            value_type,
        } => {
            let written = session.write_value(address, &value, value_type).await?;
            Reply::line(format!("Wrote value {} to address {}", written, address))
        }
        Command::ShowRange => Reply::line(format!("Search address range is {}", session.range())),
        Command::SetRange(range) => {
            session.set_range(range);
            Reply::line(format!("Set search address range as {}", range))
        }
        Command::SetRegion(kind) => {
            let range = session.set_region(kind)?;
            Reply::line(format!("Set search address range to {} {}", kind, range))
        }
    };
    Ok(reply)
}
