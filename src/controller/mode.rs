use std::io;

use crate::configuration::types::ModeSelection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Record,
    Play,
}

/// What standard input is connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdinKind {
    Pipe,
    RegularFile,
    /// Terminal, socket, character device or anything else.
    Other,
}

/// Picks the run mode: a pipe or regular file on stdin means there is a
/// trace to play, anything else means record.
pub fn resolve_mode(selection: ModeSelection, stdin: StdinKind) -> RunMode {
    match selection {
        ModeSelection::Record => RunMode::Record,
        ModeSelection::Play => RunMode::Play,
        ModeSelection::Auto => match stdin {
            StdinKind::Pipe | StdinKind::RegularFile => RunMode::Play,
            StdinKind::Other => RunMode::Record,
        },
    }
}

#[cfg(unix)]
pub fn stdin_kind() -> io::Result<StdinKind> {
    use std::os::fd::AsFd;
    use std::os::unix::fs::FileTypeExt;

    let fd = io::stdin().as_fd().try_clone_to_owned()?;
    let file_type = std::fs::File::from(fd).metadata()?.file_type();
    Ok(if file_type.is_fifo() {
        StdinKind::Pipe
    } else if file_type.is_file() {
        StdinKind::RegularFile
    } else {
        StdinKind::Other
    })
}

#[cfg(not(unix))]
pub fn stdin_kind() -> io::Result<StdinKind> {
    use std::io::IsTerminal;

    Ok(if io::stdin().is_terminal() {
        StdinKind::Other
    } else {
        StdinKind::Pipe
    })
}
