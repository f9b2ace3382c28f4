//! Output-aware success detection.
//!
//! The external tool's exit status is not trustworthy: it regularly exits
//! non-zero after writing complete output, and a zero exit says nothing about
//! whether anything was produced. A run is therefore judged on two
//! independent signals:
//!
//! 1. the captured log contains the tool's success marker, or
//! 2. every expected output directory exists and is non-empty.
//!
//! Either signal classifies the run as analyzed. With neither, the run failed,
//! whatever the exit code says. [`classify`] is pure; the probes that gather
//! [`Evidence`] from disk live alongside it.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::config::DetectionConfig;
use crate::registry::FinalStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Missing,
    Empty,
    Populated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputProbe {
    pub name: String,
    pub state: OutputState,
}

/// Everything known about a finished tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub log_has_marker: bool,
    pub outputs: Vec<OutputProbe>,
}

impl Evidence {
    /// All expected outputs present and non-empty. An empty expectation list
    /// never counts as complete.
    pub fn outputs_complete(&self) -> bool {
        !self.outputs.is_empty()
            && self
                .outputs
                .iter()
                .all(|probe| probe.state == OutputState::Populated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: FinalStatus,
    pub log_marker: bool,
    pub outputs_complete: bool,
    pub exit_code: Option<i32>,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        self.status == FinalStatus::Analyzed
    }

    /// Whether the verdict contradicts the process exit status.
    pub fn overrides_exit_code(&self) -> bool {
        let exited_cleanly = self.exit_code == Some(0);
        self.is_success() != exited_cleanly
    }

    /// One-line explanation suitable for logs and registry notes.
    pub fn describe(&self) -> String {
        let exit = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        match (self.log_marker, self.outputs_complete) {
            (true, true) => format!("success marker and expected outputs present ({})", exit),
            (true, false) => format!("success marker present ({})", exit),
            (false, true) => format!("expected outputs present ({})", exit),
            (false, false) => format!("no success marker and expected outputs missing ({})", exit),
        }
    }
}

/// Decide the outcome of a run. Either signal is sufficient; the exit code
/// alone never is.
pub fn classify(evidence: &Evidence) -> Verdict {
    let log_marker = evidence.log_has_marker;
    let outputs_complete = evidence.outputs_complete();
    let status = if log_marker || outputs_complete {
        FinalStatus::Analyzed
    } else {
        FinalStatus::Failed
    };
    Verdict {
        status,
        log_marker,
        outputs_complete,
        exit_code: evidence.exit_code,
    }
}

/// Scan a log for a literal marker, tolerating non-UTF-8 output.
pub fn log_contains_marker(log_path: &Path, marker: &str) -> io::Result<bool> {
    let mut reader = BufReader::new(File::open(log_path)?);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(false);
        }
        if String::from_utf8_lossy(&line).contains(marker) {
            return Ok(true);
        }
    }
}

/// Check each expected output directory under `root`.
pub fn probe_outputs(root: &Path, expected: &[String]) -> Vec<OutputProbe> {
    expected
        .iter()
        .map(|name| OutputProbe {
            name: name.clone(),
            state: probe_dir(&root.join(name)),
        })
        .collect()
}

fn probe_dir(path: &Path) -> OutputState {
    if !path.is_dir() {
        return OutputState::Missing;
    }
    match std::fs::read_dir(path) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                OutputState::Populated
            } else {
                OutputState::Empty
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read output directory");
            OutputState::Missing
        }
    }
}

/// Gather evidence for a finished run from its log and output candidate.
pub fn gather_evidence(
    exit_code: Option<i32>,
    log_path: &Path,
    output_root: &Path,
    config: &DetectionConfig,
) -> Evidence {
    let log_has_marker = match log_contains_marker(log_path, &config.success_marker) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(log = %log_path.display(), error = %e, "Cannot read tool log");
            false
        }
    };
    Evidence {
        exit_code,
        log_has_marker,
        outputs: probe_outputs(output_root, &config.expected_outputs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;

    fn probe(name: &str, state: OutputState) -> OutputProbe {
        OutputProbe {
            name: name.into(),
            state,
        }
    }

    fn evidence(exit_code: Option<i32>, marker: bool, outputs: Vec<OutputProbe>) -> Evidence {
        Evidence {
            exit_code,
            log_has_marker: marker,
            outputs,
        }
    }

    #[test]
    fn marker_overrides_nonzero_exit() {
        let verdict = classify(&evidence(Some(1), true, vec![]));
        assert_eq!(verdict.status, FinalStatus::Analyzed);
        assert!(verdict.overrides_exit_code());
    }

    #[test]
    fn complete_outputs_override_nonzero_exit() {
        let outputs = vec![
            probe("Documentation", OutputState::Populated),
            probe(".atx", OutputState::Populated),
        ];
        let verdict = classify(&evidence(Some(2), false, outputs));
        assert!(verdict.is_success());
    }

    #[test]
    fn zero_exit_alone_is_failure() {
        let verdict = classify(&evidence(Some(0), false, vec![]));
        assert_eq!(verdict.status, FinalStatus::Failed);
        assert!(verdict.overrides_exit_code());
    }

    #[test]
    fn partial_outputs_are_not_enough() {
        let outputs = vec![
            probe("Documentation", OutputState::Populated),
            probe(".atx", OutputState::Empty),
        ];
        assert!(!classify(&evidence(Some(0), false, outputs)).is_success());
    }

    #[test]
    fn signal_kill_without_signals_fails() {
        let verdict = classify(&evidence(None, false, vec![probe("d", OutputState::Missing)]));
        assert!(!verdict.is_success());
        assert!(verdict.describe().contains("terminated by signal"));
    }

    #[test]
    fn describe_names_the_signal() {
        let verdict = classify(&evidence(Some(1), true, vec![]));
        assert_eq!(verdict.describe(), "success marker present (exit code 1)");
    }

    #[test]
    fn finds_marker_in_log() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("r1_transform.log");
        fs::write(&log, b"step 1\n\xff\xfe binary noise\nTransformation completed successfully\n")
            .unwrap();
        assert!(log_contains_marker(&log, "Transformation completed successfully").unwrap());
        assert!(!log_contains_marker(&log, "never printed").unwrap());
    }

    #[test]
    fn classifies_output_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Documentation")).unwrap();
        fs::write(dir.path().join("Documentation").join("index.md"), "# r1").unwrap();
        fs::create_dir(dir.path().join(".atx")).unwrap();
        fs::write(dir.path().join("transform_output"), "not a dir").unwrap();

        let probes = probe_outputs(
            dir.path(),
            &[
                "Documentation".into(),
                ".atx".into(),
                "transform_output".into(),
                "absent".into(),
            ],
        );
        let states: Vec<_> = probes.iter().map(|p| p.state).collect();
        assert_eq!(
            states,
            vec![
                OutputState::Populated,
                OutputState::Empty,
                OutputState::Missing,
                OutputState::Missing
            ]
        );
    }

    #[test]
    fn unreadable_log_counts_as_no_marker() {
        let dir = tempfile::TempDir::new().unwrap();
        let evidence = gather_evidence(
            Some(0),
            &dir.path().join("missing.log"),
            dir.path(),
            &DetectionConfig::default(),
        );
        assert!(!evidence.log_has_marker);
        assert!(!classify(&evidence).is_success());
    }

    fn any_state() -> impl Strategy<Value = OutputState> {
        prop_oneof![
            Just(OutputState::Missing),
            Just(OutputState::Empty),
            Just(OutputState::Populated),
        ]
    }

    proptest! {
        #[test]
        fn success_iff_either_signal(
            exit_code in proptest::option::of(-1i32..256),
            marker in any::<bool>(),
            states in proptest::collection::vec(any_state(), 0..4),
        ) {
            let outputs: Vec<_> = states
                .iter()
                .enumerate()
                .map(|(i, s)| probe(&format!("out{}", i), *s))
                .collect();
            let complete = !states.is_empty() && states.iter().all(|s| *s == OutputState::Populated);
            let verdict = classify(&evidence(exit_code, marker, outputs));
            prop_assert_eq!(verdict.is_success(), marker || complete);
        }
    }
}
