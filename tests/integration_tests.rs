use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use forestgen::parser::extract_rows;
use forestgen::runtime::is_rscript_on_path;
use forestgen::{estimate, synthesize, AxisType, LayoutStyle, OutcomeRow, PlotConfig};
use proptest::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

fn forestgen(args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_forestgen"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn forestgen");

    {
        let mut handle = child.stdin.take().expect("Failed to open stdin");
        if let Some(input) = stdin {
            handle
                .write_all(input.as_bytes())
                .expect("Failed to write to stdin");
        }
    }

    child.wait_with_output().expect("Failed to read output")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// =============================================================================
// Generate
// =============================================================================

#[test]
fn test_generate_from_stdin() {
    let csv = fs::read_to_string("test/trials.csv").expect("Failed to read test CSV");
    let output = forestgen(&["generate"], Some(&csv));
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let script = stdout(&output);
    assert!(script.starts_with("# Forest plot generated by forestgen\n"));
    assert!(script.contains("library(ggplot2)"));
    assert!(script.contains(r#""Trial 1", "Trial 2", "Trial 3", "Trial 4", "Trial 5""#));
    assert!(script.contains("geom_point"));
    assert!(script.contains("print(p)"));

    let err = stderr(&output);
    assert!(err.contains("Error: Row 4: Value must be a number"), "stderr: {}", err);
    assert!(
        err.contains("Error: Row 5: Lower CI cannot be greater than Upper CI"),
        "stderr: {}",
        err
    );
}

#[test]
fn test_generate_table_style_from_files() {
    let output = forestgen(
        &[
            "generate",
            "-i",
            "test/trials.json",
            "-c",
            "test/config_log.json",
        ],
        None,
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let script = stdout(&output);
    assert!(script.contains("library(meta)"));
    assert!(script.contains("library(grid)"));
    assert!(!script.contains("ggplot2"));
    assert!(script.contains("m <- metagen("));
    assert!(script.contains(r#"sm = "RR""#));
    assert!(script.contains("at = c(0.25, 0.5, 1, 2, 4)"));
    assert!(script.contains(r#""Bleeding (major)""#));
    assert!(script.contains(r#"Risk of \"event\""#));
}

#[test]
fn test_generate_style_override_and_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("plot.R");
    let output = forestgen(
        &[
            "generate",
            "-i",
            "test/trials.json",
            "--style",
            "table",
            "-o",
            out.to_str().unwrap(),
        ],
        None,
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).is_empty());

    let script = fs::read_to_string(&out).unwrap();
    assert!(script.contains("forest("));
    assert!(script.contains("Style: table"));
}

#[test]
fn test_generate_header_only_fails() {
    let output = forestgen(&["generate"], Some("outcome,value,ci_lower,ci_upper\n"));
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Dataset is empty"), "stderr: {}", stderr(&output));
}

#[test]
fn test_generate_missing_outcome_column() {
    let output = forestgen(&["generate"], Some("value,lower,upper\n1,0.5,2\n"));
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains(r#"Missing "outcome" or "study" column"#),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn test_generate_strict_requires_numbers() {
    let output = forestgen(&["generate", "--strict"], Some("study,value\nA,1.2\n"));
    assert!(!output.status.success());
    assert!(stderr(&output).contains(r#"Missing "ci_lower" or "lower" column"#));
}

#[test]
fn test_generate_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"xLimits": [2, 1]}"#).unwrap();

    let output = forestgen(
        &["generate", "-c", config.to_str().unwrap()],
        Some("study,value,lower,upper\nA,1.2,1,1.5\n"),
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("xLimits lower bound must be below upper bound"));
}

// =============================================================================
// Inspect
// =============================================================================

#[test]
fn test_inspect_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("plot.R");
    let output = forestgen(
        &["generate", "-i", "test/trials.json", "-o", script.to_str().unwrap()],
        None,
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = forestgen(&["inspect", script.to_str().unwrap()], None);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "outcome,value,ci_lower,ci_upper,weight\n\
         Mortality,0.82,0.7,0.96,41.5\n\
         Readmission,1.12,0.91,1.38,33\n\
         Stroke,0.65,0.44,0.97,\n\
         Bleeding (major),,,,\n"
    );
}

#[test]
fn test_inspect_rejects_foreign_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("other.R");
    fs::write(&script, "x <- 1\nprint(x)\n").unwrap();

    let output = forestgen(&["inspect", script.to_str().unwrap()], None);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("data.frame"));
}

// =============================================================================
// Render
// =============================================================================

#[test]
fn test_render_missing_rscript() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("plot.png");
    let output = forestgen(
        &[
            "render",
            "-i",
            "test/trials.json",
            "--png",
            png.to_str().unwrap(),
            "--rscript",
            "/nonexistent/Rscript",
        ],
        None,
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("R runtime is not available"));
    assert!(!png.exists());
}

#[test]
fn test_render_with_rscript() {
    if !is_rscript_on_path(Path::new("Rscript")) {
        eprintln!("Skipping: Rscript not found on PATH");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("plot.png");
    let output = forestgen(
        &["render", "-i", "test/trials.json", "--png", png.to_str().unwrap()],
        None,
    );
    if !output.status.success() && stderr(&output).contains("missing R packages") {
        eprintln!("Skipping: required R packages are not installed");
        return;
    }
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let bytes = fs::read(&png).unwrap();
    assert_eq!(&bytes[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
}

// =============================================================================
// Library round trip
// =============================================================================

fn label() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 \"'\\\\(),.-]{1,16}".prop_filter("label must not be blank", |s| {
        !s.trim().is_empty()
    })
}

fn outcome_row() -> impl Strategy<Value = OutcomeRow> {
    (
        label(),
        proptest::option::of(-50.0f64..50.0),
        proptest::option::of(-50.0f64..50.0),
        proptest::option::of(-50.0f64..50.0),
        proptest::option::of(0.0f64..100.0),
    )
        .prop_map(|(outcome, value, ci_lower, ci_upper, weight)| OutcomeRow {
            outcome,
            value,
            ci_lower,
            ci_upper,
            weight,
        })
}

proptest! {
    #[test]
    fn prop_embedded_table_reads_back(
        rows in proptest::collection::vec(outcome_row(), 1..8),
        table in any::<bool>(),
    ) {
        let config = PlotConfig {
            layout_style: if table { LayoutStyle::Table } else { LayoutStyle::Layered },
            axis_type: AxisType::Linear,
            ..PlotConfig::default()
        };
        let script = synthesize(&rows, &config, estimate(rows.len(), &config)).unwrap();
        let back = extract_rows(&script).unwrap();
        prop_assert_eq!(back, rows);
    }

    #[test]
    fn prop_synthesis_is_deterministic(rows in proptest::collection::vec(outcome_row(), 1..6)) {
        let config = PlotConfig::default();
        let dims = estimate(rows.len(), &config);
        let first = synthesize(&rows, &config, dims).unwrap();
        let second = synthesize(&rows, &config, dims).unwrap();
        prop_assert_eq!(first, second);
    }
}
