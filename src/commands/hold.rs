//! Implementation of the `inhibitor hold` command.
//!
//! Takes an inhibit lock, runs a command, and lets the lock go when the
//! command exits. The client end of the pipe is held by this process (it is
//! close-on-exec, so the child never sees it); dropping it after the child
//! exits is what releases the lock.

use crate::cli::HoldArgs;
use crate::config::Config;
use crate::error::{InhibitError, Result};
use crate::event_loop::EventLoop;
use crate::inhibit::{InhibitLock, parse_what};
use nix::poll::PollTimeout;
use std::process::Command;

/// Event-loop rounds to wait for the hang-up once our client end is closed.
///
/// Another process holding a write end of the FIFO would otherwise keep
/// `hold` running after its command is done.
const RELEASE_WAIT_ROUNDS: u32 = 10;

/// Execute the `inhibitor hold` command.
pub fn cmd_hold(config: &Config, args: HoldArgs) -> Result<()> {
    let kinds = parse_what(&args.what)?;
    let Some((program, program_args)) = args.command.split_first() else {
        return Err(InhibitError::InvalidInput(
            "a command to run is required".to_string(),
        ));
    };

    let event_loop = EventLoop::new();
    let (lock, client) = InhibitLock::acquire(
        config.base_dir(),
        event_loop.clone(),
        &args.who,
        &args.what,
        &args.why,
    )?;

    eprintln!(
        "Holding inhibit lock for '{}' ({}): {}",
        args.who,
        kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        args.why
    );

    let status = Command::new(program).args(program_args).status();

    drop(client);
    let timeout = PollTimeout::from(config.poll_interval_ms);
    for _ in 0..RELEASE_WAIT_ROUNDS {
        if lock.is_released() {
            break;
        }
        event_loop.iteration(timeout)?;
    }
    if !lock.is_released() {
        tracing::warn!(
            who = %args.who,
            "inhibit pipe still has writers after the command exited; tearing down"
        );
    }
    drop(lock);

    let status = status
        .map_err(|e| InhibitError::Command(format!("failed to run '{}': {}", program, e)))?;
    if !status.success() {
        return Err(InhibitError::Command(format!("'{}' {}", program, status)));
    }

    Ok(())
}
