//! Implementation of the `inhibitor clear` command.

use crate::cli::ClearArgs;
use crate::config::Config;
use crate::error::Result;
use crate::inhibit;

/// Execute the `inhibitor clear` command.
///
/// Stale nodes block new locks for the same holder; clearing them is always
/// safe. Clearing a live node hides the lock from the filesystem while its
/// holder keeps running, so that needs `--force`.
pub fn cmd_clear(config: &Config, args: ClearArgs) -> Result<()> {
    let cleared = inhibit::clear_inhibitor(&config.base_dir(), &args.who, args.force)?;

    println!("Cleared inhibitor: {}", cleared.who);
    println!();
    println!("Inhibitor details:");
    println!("  Created:    {}", cleared.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Age:        {}", cleared.age_string());
    println!("  Status:     was {}", cleared.liveness);
    println!("  Path:       {}", cleared.path.display());

    Ok(())
}
