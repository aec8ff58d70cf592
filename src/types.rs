use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// What happens when a run is requested while a previous run is still going.
///
/// - `Queue`: keep the request and start it once the current run finishes
///   (default behaviour).
/// - `Cancel`: kill the in-flight process and start the new run right away.
/// - `Concurrent`: start every run immediately, in parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPolicy {
    #[default]
    Queue,
    Cancel,
    Concurrent,
}

impl FromStr for RunPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(RunPolicy::Queue),
            "cancel" => Ok(RunPolicy::Cancel),
            "concurrent" => Ok(RunPolicy::Concurrent),
            other => Err(format!(
                "invalid run_policy: {other} (expected \"queue\", \"cancel\" or \"concurrent\")"
            )),
        }
    }
}

impl fmt::Display for RunPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPolicy::Queue => "queue",
            RunPolicy::Cancel => "cancel",
            RunPolicy::Concurrent => "concurrent",
        };
        f.write_str(s)
    }
}

/// Outcome of one command run, as reported back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed(i32),
    /// Killed because a newer run replaced it (`RunPolicy::Cancel`).
    Cancelled,
    /// Dropped from a full queue before it ever started.
    Skipped,
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_policy_parses_case_insensitively() {
        assert_eq!("Queue".parse::<RunPolicy>(), Ok(RunPolicy::Queue));
        assert_eq!(" cancel ".parse::<RunPolicy>(), Ok(RunPolicy::Cancel));
        assert_eq!("CONCURRENT".parse::<RunPolicy>(), Ok(RunPolicy::Concurrent));
        assert!("later".parse::<RunPolicy>().is_err());
    }
}
