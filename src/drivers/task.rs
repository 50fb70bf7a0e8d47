//! Named worker thread spawning.
//!
//! Every long-running schedule (rotation loop, alarm cycles, keyboard reader,
//! signal watcher) is started through [`spawn_worker`] so threads carry a
//! readable name in panics and debuggers, and creation failures are
//! propagated instead of panicking.

use std::io;
use std::thread::JoinHandle;

/// Default stack for worker threads (KB).  None of them recurse or hold
/// frame buffers on the stack.
pub const WORKER_STACK_KB: usize = 64;

/// Spawn a named worker thread with an explicit stack size.
pub fn spawn_worker(
    name: &'static str,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    log::debug!("Spawning '{}' (stack={}KB)", name, stack_kb);

    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}
