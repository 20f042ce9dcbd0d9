//! Per-host and fleet-wide collection outcomes.

use std::fmt::Write as _;
use std::time::Duration;

use super::spec::CommandSpec;
use crate::inventory::HostRecord;
use crate::parser::ParseResult;

/// Summary used when a host ran out of commands without a recorded error.
pub const NO_COMMAND_SUCCEEDED: &str = "no discovery command succeeded";

/// One command attempt that did not produce a usable result.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub spec: CommandSpec,
    pub stdout: String,
    pub stderr: String,
    pub exec_error: Option<String>,
    pub parse_error: Option<String>,
    pub elapsed: Duration,
}

/// A host whose discovery produced a parse result.
#[derive(Debug, Clone)]
pub struct CollectSuccess {
    pub host: HostRecord,
    pub spec_used: CommandSpec,
    pub parse_result: ParseResult,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// A host where every command failed, or none could be chosen.
#[derive(Debug, Clone)]
pub struct CollectFailure {
    pub host: HostRecord,
    /// Attempts in the order they ran.
    pub attempts: Vec<Attempt>,
    pub summary: String,
}

impl CollectFailure {
    /// Failure with no attempts, for hosts that never got to run a command.
    pub fn without_attempts(host: HostRecord, summary: impl Into<String>) -> Self {
        Self {
            host,
            attempts: Vec::new(),
            summary: summary.into(),
        }
    }

    /// Failure after exhausting `attempts`.
    ///
    /// The summary is the last exec error, else the last parse error, else
    /// [`NO_COMMAND_SUCCEEDED`].
    pub fn exhausted(host: HostRecord, attempts: Vec<Attempt>) -> Self {
        let summary = attempts
            .iter()
            .rev()
            .find_map(|a| a.exec_error.clone())
            .or_else(|| attempts.iter().rev().find_map(|a| a.parse_error.clone()))
            .unwrap_or_else(|| NO_COMMAND_SUCCEEDED.to_string());
        Self {
            host,
            attempts,
            summary,
        }
    }
}

/// Outcome of collecting one host.
#[derive(Debug, Clone)]
pub enum CollectOutcome {
    Success(CollectSuccess),
    Failure(CollectFailure),
    /// Cancellation stopped the host before it finished.
    Cancelled { host: HostRecord },
}

impl CollectOutcome {
    pub fn host(&self) -> &HostRecord {
        match self {
            CollectOutcome::Success(s) => &s.host,
            CollectOutcome::Failure(f) => &f.host,
            CollectOutcome::Cancelled { host } => host,
        }
    }
}

/// Aggregated result of a fleet run.
///
/// Without cancellation every target lands in exactly one of `successes`
/// and `failures`. With cancellation, hosts that were interrupted or never
/// started are listed in `unfinished` instead.
#[derive(Debug, Clone, Default)]
pub struct FleetOutcome {
    pub successes: Vec<CollectSuccess>,
    pub failures: Vec<CollectFailure>,
    pub cancelled: bool,
    /// Host keys that did not complete because of cancellation.
    pub unfinished: Vec<String>,
}

impl FleetOutcome {
    /// Total number of hosts that completed either way.
    pub fn completed(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Host keys of failed collections.
    pub fn failed_hosts(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|f| f.host.host_key.as_str())
            .collect()
    }

    /// One line per failed host, sorted by host key.
    pub fn failure_report(&self) -> String {
        let mut failures: Vec<&CollectFailure> = self.failures.iter().collect();
        failures.sort_by(|a, b| a.host.host_key.cmp(&b.host.host_key));

        let mut report = String::new();
        for failure in failures {
            let _ = write!(report, "{}: {}", failure.host.host_key, failure.summary);
            if !failure.attempts.is_empty() {
                let tried: Vec<&str> = failure
                    .attempts
                    .iter()
                    .map(|a| a.spec.name.as_str())
                    .collect();
                let _ = write!(report, " (tried {})", tried.join(", "));
            }
            report.push('\n');
        }
        if self.cancelled && !self.unfinished.is_empty() {
            let _ = writeln!(
                report,
                "cancelled before finishing: {}",
                self.unfinished.join(", ")
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::spec::DiscoveryProtocol;

    fn attempt(name: &str, exec_error: Option<&str>, parse_error: Option<&str>) -> Attempt {
        Attempt {
            spec: CommandSpec::new(name, "cmd", "p", DiscoveryProtocol::Lldp),
            stdout: String::new(),
            stderr: String::new(),
            exec_error: exec_error.map(str::to_string),
            parse_error: parse_error.map(str::to_string),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_summary_prefers_exec_error() {
        let failure = CollectFailure::exhausted(
            HostRecord::new("r1"),
            vec![
                attempt("a", Some("connection refused"), None),
                attempt("b", None, Some("bad json")),
            ],
        );
        assert_eq!(failure.summary, "connection refused");
    }

    #[test]
    fn test_summary_uses_last_parse_error() {
        let failure = CollectFailure::exhausted(
            HostRecord::new("r1"),
            vec![
                attempt("a", None, Some("first")),
                attempt("b", None, Some("second")),
            ],
        );
        assert_eq!(failure.summary, "second");
    }

    #[test]
    fn test_summary_generic() {
        let failure = CollectFailure::exhausted(HostRecord::new("r1"), vec![]);
        assert_eq!(failure.summary, NO_COMMAND_SUCCEEDED);
    }

    #[test]
    fn test_failure_report() {
        let outcome = FleetOutcome {
            failures: vec![
                CollectFailure::exhausted(
                    HostRecord::new("spine02"),
                    vec![attempt("lldp-json", Some("timed out"), None)],
                ),
                CollectFailure::without_attempts(HostRecord::new("leaf09"), "no device OS"),
            ],
            cancelled: true,
            unfinished: vec!["leaf10".to_string()],
            ..Default::default()
        };
        assert_eq!(
            outcome.failure_report(),
            "leaf09: no device OS\n\
             spine02: timed out (tried lldp-json)\n\
             cancelled before finishing: leaf10\n"
        );
        assert_eq!(outcome.failed_hosts(), vec!["spine02", "leaf09"]);
    }
}
