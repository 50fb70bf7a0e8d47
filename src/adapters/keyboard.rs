//! Keyboard command input.
//!
//! | Key | Command                        |
//! |-----|--------------------------------|
//! | `r` | toggle recording               |
//! | `s` | restart after a hardware fault |
//! | `q` | quit                           |
//!
//! A worker reads stdin line by line and forwards recognised keys over a
//! crossbeam channel; the frame loop drains it without blocking.  EOF on
//! stdin ends the worker quietly.

use std::io::{self, BufRead};

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info};

use crate::app::commands::AppCommand;
use crate::drivers::task::{WORKER_STACK_KB, spawn_worker};

/// Map one input line to a command.  Only the first non-blank character
/// counts; case is ignored.
pub fn parse_key(line: &str) -> Option<AppCommand> {
    match line.trim().chars().next()?.to_ascii_lowercase() {
        'r' => Some(AppCommand::ToggleRecording),
        's' => Some(AppCommand::Restart),
        'q' => Some(AppCommand::Shutdown),
        _ => None,
    }
}

/// Forward commands parsed from `input` until EOF, a read error, or the
/// receiver hangs up.
pub fn forward_commands(input: impl BufRead, tx: &Sender<AppCommand>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        match parse_key(&line) {
            Some(cmd) => {
                debug!("keyboard: {:?}", cmd);
                if tx.send(cmd).is_err() {
                    break;
                }
            }
            None if !line.trim().is_empty() => {
                info!("keyboard: unknown key {:?} (r = record, s = restart, q = quit)", line.trim());
            }
            None => {}
        }
    }
}

/// Start the stdin reader.  The sender side is returned as well so other
/// producers (tests, a future remote control) can inject commands.
pub fn spawn_stdin_reader() -> io::Result<(Sender<AppCommand>, Receiver<AppCommand>)> {
    let (tx, rx) = unbounded();
    let worker_tx = tx.clone();
    spawn_worker("chirp-keys", WORKER_STACK_KB, move || {
        forward_commands(io::stdin().lock(), &worker_tx);
        debug!("keyboard: input closed");
    })?;
    Ok((tx, rx))
}
