//! Process signal watcher.
//!
//! Runs a single-threaded tokio runtime on its own worker that waits for
//! Ctrl+C or SIGTERM and raises a shared stop flag.  The frame loop polls
//! the flag once per iteration and shuts the devices down on its way out.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::drivers::task::spawn_worker;

/// The runtime and signal driver need more room than the device workers.
const SIGNAL_STACK_KB: usize = 256;

/// Which signal ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    CtrlC,
    Terminate,
}

async fn shutdown_signal() -> io::Result<Interrupt> {
    use tokio::signal;

    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let terminate = term.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        res = ctrl_c => res.map(|()| Interrupt::CtrlC),
        _ = terminate => Ok(Interrupt::Terminate),
    }
}

/// Start the watcher.  The returned flag flips to `true` once on the first
/// signal and stays set.
pub fn install() -> io::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    spawn_worker("chirp-signal", SIGNAL_STACK_KB, move || {
        match runtime.block_on(shutdown_signal()) {
            Ok(Interrupt::CtrlC) => info!("signal: Ctrl+C received, shutting down"),
            Ok(Interrupt::Terminate) => info!("signal: SIGTERM received, shutting down"),
            Err(e) => {
                warn!("signal: handler could not be installed: {}", e);
                return;
            }
        }
        flag.store(true, Ordering::SeqCst);
    })?;

    Ok(stop)
}
