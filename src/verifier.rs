//! Hash-echo verification loop.
//!
//! For every payload, in order: exchange it over the transport, decode the
//! reply as a JSON object, pull out its `hash` field and compare that to the
//! MD5 of the payload. Each payload gets exactly one `TestResult`; a failing
//! payload never stops the ones after it.

use serde_json::Value;
use tracing::debug;

use crate::digest::md5_hex;
use crate::error::CheckError;
use crate::transport::Transport;

/// Parsed server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    /// Empty when the reply has no string `hash` field.
    pub hash: String,
}

impl ServerResponse {
    /// Decode raw reply bytes: UTF-8, trimmed, JSON object.
    pub fn parse(reply: &[u8]) -> Result<Self, CheckError> {
        let text = std::str::from_utf8(reply)
            .map_err(|e| CheckError::Parse(format!("reply is not valid UTF-8: {e}")))?;

        let value: Value = serde_json::from_str(text.trim())
            .map_err(|e| CheckError::Parse(format!("reply is not valid JSON: {e}")))?;

        let object = value
            .as_object()
            .ok_or_else(|| CheckError::Parse("reply is not a JSON object".to_string()))?;

        Ok(Self {
            hash: object
                .get("hash")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// How a single payload fared.
#[derive(Debug)]
pub enum Outcome {
    Passed,
    /// Digest mismatch, including a missing `hash` field.
    Failed,
    Error(CheckError),
}

/// Result for one payload.
#[derive(Debug)]
pub struct TestResult {
    /// 1-based position in the payload list.
    pub index: usize,
    pub payload: String,
    pub expected: String,
    /// Empty when the exchange errored or the field was missing.
    pub received: String,
    pub outcome: Outcome,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }
}

/// All results of one run, in payload order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<TestResult>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed))
    }

    pub fn errors(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Error(_)))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Sends payloads over a transport and checks the echoed digests.
pub struct HashEchoVerifier<T> {
    transport: T,
}

impl<T: Transport> HashEchoVerifier<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Check every payload in order, calling `on_result` as soon as each
    /// one is decided.
    pub fn run_with<F>(&mut self, payloads: &[String], mut on_result: F) -> RunReport
    where
        F: FnMut(&TestResult),
    {
        let mut report = RunReport::default();
        for (i, payload) in payloads.iter().enumerate() {
            let result = self.check(i + 1, payload);
            on_result(&result);
            report.results.push(result);
        }
        report
    }

    /// Check a single payload.
    pub fn check(&mut self, index: usize, payload: &str) -> TestResult {
        let response = self
            .transport
            .exchange(payload.as_bytes())
            .and_then(|reply| ServerResponse::parse(&reply));

        // Recomputed for every payload, right before comparing.
        let expected = md5_hex(payload);

        let (received, outcome) = match response {
            Ok(response) if response.hash == expected => (response.hash, Outcome::Passed),
            Ok(response) => (response.hash, Outcome::Failed),
            Err(e) => {
                debug!(index, error = %e, "Payload check failed");
                (String::new(), Outcome::Error(e))
            }
        };

        TestResult {
            index,
            payload: payload.to_string(),
            expected,
            received,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::io;

    /// Replays canned replies, one per exchange, and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: VecDeque<Result<Vec<u8>, CheckError>>,
        sent: Vec<Vec<u8>>,
    }

    impl ScriptedTransport {
        fn reply(mut self, body: impl Into<Vec<u8>>) -> Self {
            self.replies.push_back(Ok(body.into()));
            self
        }

        fn fail(mut self, err: CheckError) -> Self {
            self.replies.push_back(Err(err));
            self
        }
    }

    impl Transport for ScriptedTransport {
        fn exchange(&mut self, payload: &[u8]) -> Result<Bytes, CheckError> {
            self.sent.push(payload.to_vec());
            self.replies
                .pop_front()
                .expect("no scripted reply left")
                .map(Bytes::from)
        }
    }

    /// Answers every payload with its correct digest.
    struct EchoingTransport;

    impl Transport for EchoingTransport {
        fn exchange(&mut self, payload: &[u8]) -> Result<Bytes, CheckError> {
            let text = std::str::from_utf8(payload).unwrap();
            Ok(Bytes::from(format!("{{\"hash\": \"{}\"}}\n", md5_hex(text))))
        }
    }

    fn payloads(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const LOGIN: &str = r#"{"user": "test", "action": "login", "success": true}"#;
    const LOGIN_MD5: &str = "27893b2f97c0b35ed659beda6530d9f1";

    #[test]
    fn test_matching_hash_passes() {
        let transport =
            ScriptedTransport::default().reply(format!("{{\"hash\": \"{LOGIN_MD5}\"}}\n"));
        let mut verifier = HashEchoVerifier::new(transport);

        let result = verifier.check(2, LOGIN);
        assert!(result.passed());
        assert_eq!(result.index, 2);
        assert_eq!(result.expected, LOGIN_MD5);
        assert_eq!(result.received, result.expected);
        assert_eq!(verifier.transport.sent, vec![LOGIN.as_bytes().to_vec()]);
    }

    #[test]
    fn test_wrong_hash_fails() {
        let transport = ScriptedTransport::default().reply(r#"{"hash": "0000"}"#);
        let mut verifier = HashEchoVerifier::new(transport);

        let result = verifier.check(1, LOGIN);
        assert!(matches!(result.outcome, Outcome::Failed));
        assert_eq!(result.received, "0000");
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        let upper = LOGIN_MD5.to_uppercase();
        let transport = ScriptedTransport::default().reply(format!("{{\"hash\": \"{upper}\"}}"));
        let mut verifier = HashEchoVerifier::new(transport);

        assert!(matches!(verifier.check(1, LOGIN).outcome, Outcome::Failed));
    }

    #[test]
    fn test_missing_hash_fails_not_errors() {
        let transport = ScriptedTransport::default().reply(r#"{"digest": "abc"}"#);
        let mut verifier = HashEchoVerifier::new(transport);

        let result = verifier.check(1, LOGIN);
        assert!(matches!(result.outcome, Outcome::Failed));
        assert_eq!(result.received, "");
    }

    #[test]
    fn test_invalid_json_errors_and_run_continues() {
        let transport = ScriptedTransport::default()
            .reply("not json")
            .reply(format!("{{\"hash\": \"{LOGIN_MD5}\"}}"));
        let mut verifier = HashEchoVerifier::new(transport);

        let report = verifier.run_with(&payloads(&["first", LOGIN]), |_| {});
        assert!(matches!(
            report.results[0].outcome,
            Outcome::Error(CheckError::Parse(_))
        ));
        assert!(report.results[1].passed());
        assert_eq!(verifier.transport.sent.len(), 2);
    }

    #[test]
    fn test_connection_error_does_not_abort_run() {
        let refused = || io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let transport = ScriptedTransport::default()
            .fail(CheckError::Connection(refused()))
            .fail(CheckError::Connection(refused()))
            .reply(format!("{{\"hash\": \"{LOGIN_MD5}\"}}"));
        let mut verifier = HashEchoVerifier::new(transport);

        let report = verifier.run_with(&payloads(&["a", "b", LOGIN]), |_| {});
        assert_eq!(report.errors(), 2);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 0);
        assert_eq!(
            report.results.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_run_with_reports_in_order() {
        let mut verifier = HashEchoVerifier::new(EchoingTransport);
        let mut seen = Vec::new();

        let report = verifier.run_with(&payloads(&["x", "y", "z"]), |r| seen.push(r.index));
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(report.passed(), 3);
    }

    #[test]
    fn test_repeat_runs_are_identical() {
        let list = payloads(&crate::config::DEFAULT_PAYLOADS);
        let mut verifier = HashEchoVerifier::new(EchoingTransport);

        let first = verifier.run_with(&list, |_| {});
        let second = verifier.run_with(&list, |_| {});
        assert_eq!(first.passed(), list.len());
        assert_eq!(second.passed(), list.len());
        for (a, b) in first.results.iter().zip(&second.results) {
            assert_eq!(a.received, b.received);
        }
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let response = ServerResponse::parse(b"  {\"hash\": \"abc\"}\r\n").unwrap();
        assert_eq!(response.hash, "abc");
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            ServerResponse::parse(b"[\"hash\"]"),
            Err(CheckError::Parse(_))
        ));
        assert!(matches!(
            ServerResponse::parse(b"\"hash\""),
            Err(CheckError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_utf8() {
        assert!(matches!(
            ServerResponse::parse(&[0xff, 0xfe, b'{', b'}']),
            Err(CheckError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_non_string_hash_is_empty() {
        let response = ServerResponse::parse(br#"{"hash": 42}"#).unwrap();
        assert_eq!(response.hash, "");
    }

    #[test]
    fn test_parse_empty_reply() {
        assert!(matches!(ServerResponse::parse(b""), Err(CheckError::Parse(_))));
    }
}
