//! Command output classification.
//!
//! # Responsibilities
//! - Map an exit code plus output to a mount status or a probe error
//! - Split the first output line into target, type, options and source
//!
//! # Design Decisions
//! - Exit code 1 means "not a mount point" and is a successful probe
//! - A short line fills what it can and never fails
//! - Output that is neither empty nor parseable is tolerated as an anomaly

use crate::probe::command::{CommandOutput, NOT_FOUND_EXIT_CODE};
use crate::probe::error::ProbeError;
use crate::probe::types::MountInfo;

/// Interpretation of one successful command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Mounted(MountInfo),
    NotMounted,
    /// Non-empty output whose first line carries nothing to parse.
    Anomaly,
}

/// Classify a finished invocation.
pub fn classify(output: &CommandOutput) -> Result<Classification, ProbeError> {
    match output.exit_code {
        Some(0) => Ok(classify_stdout(&String::from_utf8_lossy(&output.stdout))),
        Some(NOT_FOUND_EXIT_CODE) => Ok(Classification::NotMounted),
        Some(code) => Err(ProbeError::Execution(describe_failure(
            &format!("exit status {code}"),
            &output.stderr,
        ))),
        None => Err(ProbeError::Execution(describe_failure(
            "terminated by signal",
            &output.stderr,
        ))),
    }
}

fn classify_stdout(stdout: &str) -> Classification {
    if stdout.trim().is_empty() {
        return Classification::NotMounted;
    }

    let first = stdout.lines().next().unwrap_or_default().trim();
    if first.is_empty() {
        return Classification::Anomaly;
    }

    Classification::Mounted(parse_line(first))
}

/// Split a line into up to four fields; anything past the fourth is
/// joined back into the source.
pub fn parse_line(line: &str) -> MountInfo {
    let mut fields = line.split_whitespace();
    let mut next = || fields.next().unwrap_or_default().to_string();

    let target = next();
    let fs_type = next();
    let options = next();
    let source = fields.collect::<Vec<_>>().join(" ");

    MountInfo { target, fs_type, options, source }
}

fn describe_failure(status: &str, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {stderr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_line() {
        let info = parse_line("/data ext4 rw,relatime /dev/sdb1");
        assert_eq!(info.target, "/data");
        assert_eq!(info.fs_type, "ext4");
        assert_eq!(info.options, "rw,relatime");
        assert_eq!(info.source, "/dev/sdb1");
    }

    #[test]
    fn test_extra_fields_join_into_source() {
        let info = parse_line("/mnt/share   cifs  rw   //server/My Share  extra");
        assert_eq!(info.options, "rw");
        assert_eq!(info.source, "//server/My Share extra");
    }

    #[test]
    fn test_short_line_leaves_fields_empty() {
        let info = parse_line("/data ext4");
        assert_eq!(info.target, "/data");
        assert_eq!(info.fs_type, "ext4");
        assert!(info.options.is_empty());
        assert!(info.source.is_empty());
    }

    #[test]
    fn test_classify_mounted_uses_first_line() {
        let output = CommandOutput::success("/ ext4 rw /dev/sda1\n/ overlay rw overlay\n");
        match classify(&output).unwrap() {
            Classification::Mounted(info) => assert_eq!(info.source, "/dev/sda1"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_empty_output_not_mounted() {
        assert_eq!(classify(&CommandOutput::success("")).unwrap(), Classification::NotMounted);
        assert_eq!(classify(&CommandOutput::success(" \n\t\n")).unwrap(), Classification::NotMounted);
    }

    #[test]
    fn test_classify_blank_first_line_is_anomaly() {
        let output = CommandOutput::success("\n/data ext4 rw /dev/sdb1\n");
        assert_eq!(classify(&output).unwrap(), Classification::Anomaly);
    }

    #[test]
    fn test_classify_not_found_exit() {
        let output = CommandOutput::exit(NOT_FOUND_EXIT_CODE, "");
        assert_eq!(classify(&output).unwrap(), Classification::NotMounted);
    }

    #[test]
    fn test_classify_other_exit_is_execution_error() {
        let output = CommandOutput::exit(2, "findmnt: bad usage\n");
        assert_eq!(
            classify(&output).unwrap_err(),
            ProbeError::Execution("exit status 2: findmnt: bad usage".into())
        );

        let signalled = CommandOutput { exit_code: None, ..Default::default() };
        assert_eq!(
            classify(&signalled).unwrap_err(),
            ProbeError::Execution("terminated by signal".into())
        );
    }
}
