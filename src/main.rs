//! hash-echo-check: acceptance checker for hash-echo servers
//!
//! Sends each configured payload to a running server and verifies the reply
//! is a JSON object whose `hash` field is the MD5 of that payload.
//!
//! Features:
//! - Plain TCP transport, one connection per payload
//! - ZeroMQ REQ/REP transport, one socket per run
//! - Per-payload timeout; failures never abort the run
//! - Configuration via CLI arguments or TOML file

mod config;
mod digest;
mod error;
mod report;
mod transport;
mod verifier;

use config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;
use verifier::HashEchoVerifier;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging; stdout is reserved for the report
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        endpoint = %config.target,
        transport = ?config.transport,
        payloads = config.payloads.len(),
        timeout_ms = config.timeout.map_or(0, |t| t.as_millis() as u64),
        read_buffer_size = config.read_buffer_size,
        "Starting hash-echo check"
    );

    print!("{}", report::banner(config.transport, &config.target));

    let mut verifier = HashEchoVerifier::new(transport::from_config(&config));
    let run = verifier.run_with(&config.payloads, |result| {
        print!("{}", report::render_result(result));
    });

    println!("{}", report::summary(&run));
    info!(
        passed = run.passed(),
        failed = run.failed(),
        errors = run.errors(),
        "Check finished"
    );

    Ok(())
}
