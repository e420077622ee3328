//! Implementation of the `inhibitor list` command.

use crate::cli::ListArgs;
use crate::config::Config;
use crate::error::{InhibitError, Result};
use crate::inhibit::{self, InhibitorEntry};

/// Execute the `inhibitor list` command.
pub fn cmd_list(config: &Config, args: ListArgs) -> Result<()> {
    let entries = inhibit::list_inhibitors(&config.base_dir())?;

    if args.json {
        println!("{}", render_json(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No active inhibitors.");
        return Ok(());
    }

    println!("Inhibitors ({}):", entries.len());
    println!();

    for entry in &entries {
        println!("  {}:", entry.who);
        println!("    Created:    {}", entry.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("    Age:        {}", entry.age_string());
        println!("    Status:     {}", entry.liveness);
        println!("    Path:       {}", entry.path.display());
        println!();
    }

    let stale_count = entries.iter().filter(|e| e.is_stale()).count();
    if stale_count > 0 {
        println!(
            "Note: {} inhibitor(s) are stale. Use `inhibitor clear <who>` to remove them.",
            stale_count
        );
    }

    Ok(())
}

fn render_json(entries: &[InhibitorEntry]) -> Result<String> {
    serde_json::to_string_pretty(entries)
        .map_err(|e| InhibitError::general("failed to serialize inhibitors", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::EventLoop;
    use crate::inhibit::InhibitLock;
    use crate::test_support::create_test_run_dir;

    #[test]
    fn list_without_directory_succeeds() {
        let (_temp, config) = create_test_run_dir();
        cmd_list(&config, ListArgs { json: false }).unwrap();
        cmd_list(&config, ListArgs { json: true }).unwrap();
    }

    #[test]
    fn json_contains_every_entry() {
        let (_temp, config) = create_test_run_dir();
        let event_loop = EventLoop::new();
        let (_a, _ca) =
            InhibitLock::acquire(config.base_dir(), event_loop.clone(), "A", "idle", "one")
                .unwrap();
        let (_b, _cb) =
            InhibitLock::acquire(config.base_dir(), event_loop.clone(), "B", "sleep", "two")
                .unwrap();

        let entries = inhibit::list_inhibitors(&config.base_dir()).unwrap();
        let rendered = render_json(&entries).unwrap();
        let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["who"], "A");
        assert_eq!(rows[1]["who"], "B");
        assert_eq!(rows[1]["liveness"], "live");
    }
}
