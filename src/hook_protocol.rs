//! Line protocol spoken by the external input hook
//!
//! The hook process writes one command per line to the daemon's stdin:
//!
//! | line | meaning |
//! |------|---------|
//! | `input` | local mouse or keyboard event |
//! | `peer <who> <0\|1>` | activity report from another instance |
//! | `suspend` / `resume` | suspend or resume activity monitoring |
//! | `idle` | force the monitor idle |
//! | `shift <secs>` | the clock jumped by `secs` seconds |
//! | `reset <timer>` | explicit reset, e.g. after a break was taken |
//! | `snooze <timer>` | postpone the next limit event |
//!
//! Empty lines and lines starting with `#` are ignored.

use anyhow::{anyhow, bail, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCommand {
    Input,
    Peer { who: String, active: bool },
    Suspend,
    Resume,
    Idle,
    Shift(i64),
    Reset(String),
    Snooze(String),
}

/// Parse one protocol line; `Ok(None)` for blank lines and comments
pub fn parse_line(line: &str) -> Result<Option<HookCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let command = match (verb, args.as_slice()) {
        ("input", []) => HookCommand::Input,
        ("suspend", []) => HookCommand::Suspend,
        ("resume", []) => HookCommand::Resume,
        ("idle", []) => HookCommand::Idle,
        ("peer", [who, act]) => HookCommand::Peer {
            who: who.to_string(),
            active: match *act {
                "1" => true,
                "0" => false,
                other => bail!("Peer activity must be 0 or 1, got '{}'", other),
            },
        },
        ("shift", [secs]) => HookCommand::Shift(
            secs.parse()
                .with_context(|| format!("Invalid shift '{}'", secs))?,
        ),
        ("reset", [id]) => HookCommand::Reset(id.to_string()),
        ("snooze", [id]) => HookCommand::Snooze(id.to_string()),
        _ => return Err(anyhow!("Unrecognized command: '{}'", line)),
    };
    Ok(Some(command))
}
