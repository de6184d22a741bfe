//! Console rendering of check results.
//!
//! Everything here returns text; `main` decides where it goes.

use crate::config::TransportKind;
use crate::verifier::{Outcome, RunReport, TestResult};

/// Header printed before the first payload is sent.
pub fn banner(transport: TransportKind, target: &str) -> String {
    let name = match transport {
        TransportKind::Stream => "TCP",
        TransportKind::ReqRep => "ZMQ",
    };
    format!(
        "Testing {name} Server...\nMake sure the {name} server is running on {target}\n{}\n",
        "=".repeat(60)
    )
}

/// Lines for one result, followed by a blank line.
pub fn render_result(result: &TestResult) -> String {
    let n = result.index;

    let mut out = match &result.outcome {
        Outcome::Passed => format!(
            "✓ Test {n} PASSED: MD5 hash matches\n  Sent: {}\n  Received hash: {}\n",
            result.payload, result.received
        ),
        Outcome::Failed => format!(
            "✗ Test {n} FAILED: MD5 hash mismatch\n  Expected: {}\n  Received: {}\n",
            result.expected, result.received
        ),
        Outcome::Error(e) => format!("✗ Test {n} ERROR: {e}\n"),
    };
    out.push('\n');
    out
}

/// Closing tally.
pub fn summary(report: &RunReport) -> String {
    format!(
        "{} passed, {} failed, {} errors",
        report.passed(),
        report.failed(),
        report.errors()
    )
}
