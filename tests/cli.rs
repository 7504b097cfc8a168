use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

fn tinylang() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tinylang"))
}

fn fixture(case: &str) -> String {
    Path::new("tests/programs")
        .join(case)
        .join(test_support::PROGRAM_FILE)
        .display()
        .to_string()
}

#[test]
fn prints_program_output_and_exits_zero() -> Result<()> {
    let output = tinylang()
        .arg(fixture("for_loop_counts"))
        .output()
        .context("Running tinylang")?;
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "0\n1\n2\n");
    assert!(output.stderr.is_empty());
    Ok(())
}

#[test]
fn reports_diagnostic_and_exits_one() -> Result<()> {
    let output = tinylang()
        .arg(fixture("division_by_zero"))
        .output()
        .context("Running tinylang")?;
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim_end(),
        "DivisionByZero: division by zero at line 1"
    );
    Ok(())
}

#[test]
fn missing_file_exits_two() -> Result<()> {
    let output = tinylang()
        .arg("tests/programs/does_not_exist.tl")
        .output()
        .context("Running tinylang")?;
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim_end(),
        "Error: File not found at 'tests/programs/does_not_exist.tl'"
    );
    Ok(())
}

#[test]
fn json_flag_prints_the_outcome_object() -> Result<()> {
    let output = tinylang()
        .arg("--json")
        .arg(fixture("hello_print"))
        .output()
        .context("Running tinylang")?;
    assert_eq!(output.status.code(), Some(0));
    let outcome: serde_json::Value =
        serde_json::from_slice(&output.stdout).context("Parsing JSON outcome")?;
    assert_eq!(
        outcome,
        serde_json::json!({"stdout": "5\n", "stderr": "", "exit_code": 0})
    );
    Ok(())
}

#[test]
fn zero_stack_size_is_a_usage_error() -> Result<()> {
    let output = tinylang()
        .args(["--stack-size-mb", "0"])
        .arg(fixture("hello_print"))
        .output()
        .context("Running tinylang")?;
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--stack-size-mb"));
    Ok(())
}

#[test]
fn small_stack_size_still_runs() -> Result<()> {
    let output = tinylang()
        .args(["--stack-size-mb", "1"])
        .arg(fixture("for_loop_counts"))
        .output()
        .context("Running tinylang")?;
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "0\n1\n2\n");
    Ok(())
}
