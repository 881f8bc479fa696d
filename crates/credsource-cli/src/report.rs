//! Machine-readable results and exit codes.
//!
//! Success prints the response JSON and exits `0`, changed or not. Failure
//! prints `{"failed": true, "kind": ..., "msg": ...}` without any `changed`
//! key and exits with the code of its [`ErrorKind`].

use credsource_sdk::{ErrorKind, SdkError};
use serde_json::{json, Value};

/// Exit code for a failure of the given kind.
pub fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NotFound => 2,
        ErrorKind::Ambiguous => 3,
        ErrorKind::Unsupported => 4,
        ErrorKind::Conflict => 5,
        ErrorKind::Inconsistent => 6,
        ErrorKind::Unavailable => 7,
        ErrorKind::Validation | ErrorKind::Other => 1,
    }
}

/// Kind of an arbitrary failure; errors that did not come from the SDK
/// (unreadable request file, bad JSON) count as [`ErrorKind::Other`].
pub fn kind_of(err: &anyhow::Error) -> ErrorKind {
    err.downcast_ref::<SdkError>()
        .map_or(ErrorKind::Other, SdkError::kind)
}

/// Failure report and exit code for `err`.
pub fn failure(err: &anyhow::Error) -> (Value, u8) {
    let kind = kind_of(err);
    let report = json!({
        "failed": true,
        "kind": kind.to_string(),
        "msg": format!("{err:#}"),
    });
    (report, exit_code(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use strum::IntoEnumIterator;

    #[test]
    fn codes_are_distinct_for_actionable_kinds() {
        let codes: Vec<u8> = ErrorKind::iter().map(exit_code).collect();
        assert_eq!(codes, vec![2, 3, 4, 5, 6, 7, 1, 1]);
        assert!(codes.iter().all(|c| *c != 0));
    }

    #[test]
    fn sdk_failures_keep_their_kind() {
        let err = anyhow::Error::from(SdkError::Ambiguous {
            what: "credential shared".into(),
            candidates: vec!["4".into(), "9".into()],
        });
        let (report, code) = failure(&err);
        assert_eq!(code, 3);
        assert_eq!(report["failed"], true);
        assert_eq!(report["kind"], "ambiguous");
        assert!(report["msg"].as_str().unwrap().contains("4, 9"));
        assert!(report.get("changed").is_none());
    }

    #[test]
    fn context_does_not_hide_the_kind() {
        let err = Err::<(), _>(SdkError::Unavailable("connection refused".into()))
            .context("controller http://localhost:8013")
            .unwrap_err();
        let (report, code) = failure(&err);
        assert_eq!(code, 7);
        assert_eq!(report["kind"], "unavailable");
        assert!(report["msg"].as_str().unwrap().contains("connection refused"));
    }

    #[test]
    fn other_failures_exit_with_one() {
        let err = anyhow::anyhow!("cannot read request file");
        let (report, code) = failure(&err);
        assert_eq!(code, 1);
        assert_eq!(report["kind"], "other");
    }
}
