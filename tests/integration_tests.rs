use serde_json::Value;
use std::io::Write;
use std::process::{Command, Stdio};

const MTCARS: &str = include_str!("fixtures/mtcars.csv");
const MTCARS_COUNTS: &str = include_str!("fixtures/mtcars_counts.csv");
const PRICES: &str = include_str!("fixtures/prices.csv");

/// Helper function to run ggstats with arguments and CSV input
fn run_ggstats(args: &[&str], csv_content: &str) -> Result<Vec<u8>, String> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ggstats"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    // Write CSV to stdin
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(csv_content.as_bytes())
            .map_err(|e| format!("Failed to write to stdin: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to wait for process: {}", e))?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

fn run_json(args: &[&str], csv_content: &str) -> Value {
    let mut full: Vec<&str> = args.to_vec();
    full.extend(["--format", "json", "--seed", "1"]);
    let bytes = run_ggstats(&full, csv_content).expect("ggstats failed");
    serde_json::from_slice(&bytes).expect("Output is not valid JSON")
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

#[test]
fn test_end_to_end_pie_png() {
    let result = run_ggstats(&["pie", "--main", "am", "--condition", "cyl", "--seed", "1"], MTCARS);
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(is_valid_png(&result.unwrap()), "Output is not a valid PNG");
}

#[test]
fn test_end_to_end_dot_svg() {
    let result = run_ggstats(
        &["dot", "--x", "price", "--y", "brand", "--format", "svg", "--test-value-line"],
        PRICES,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    let svg = String::from_utf8(result.unwrap()).unwrap();
    assert!(svg.contains("<svg"));
}

#[test]
fn test_pie_contingency_subtitle() {
    let spec = run_json(&["pie", "--main", "am", "--condition", "cyl"], MTCARS);

    assert_eq!(spec["kind"], "pie");
    assert_eq!(spec["coord"]["type"], "polar");
    assert_eq!(spec["coord"]["theta"], "y");

    let subtitle = spec["labels"]["subtitle"].as_str().unwrap();
    assert!(
        subtitle.starts_with("χ²(2) = 8.74, p = 0.013, V = 0.52"),
        "{}",
        subtitle
    );
    assert!(subtitle.ends_with("n = 32"));

    let caption = spec["labels"]["caption"].as_str().unwrap();
    assert!(caption.starts_with("In favor of null: log_e(BF01) = "));

    let panels = spec["panels"].as_array().unwrap();
    let titles: Vec<&str> = panels.iter().map(|p| p["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["4", "6", "8"]);
    assert_eq!(spec["fill_scale"]["breaks"], serde_json::json!(["0", "1"]));
    assert_eq!(spec["labels"]["legend"], "am");
}

#[test]
fn test_pie_group_annotations() {
    let spec = run_json(&["pie", "--main", "am", "--condition", "cyl"], MTCARS);
    let panel = &spec["panels"][0];
    let layers = panel["layers"].as_array().unwrap();

    let bars = layers[0]["bars"].as_array().unwrap();
    assert_eq!(layers[0]["geom"], "col");
    assert_eq!(bars.len(), 2);
    assert!((bars[1]["ymax"].as_f64().unwrap() - 1.0).abs() < 1e-9);

    let text = layers
        .iter()
        .find(|l| l["geom"] == "text")
        .expect("Expected group annotation");
    let label = text["marks"][0]["text"].as_str().unwrap();
    assert!(label.contains("(n = 11)"), "{}", label);
}

#[test]
fn test_pie_counts_match_long_form() {
    let long = run_json(&["pie", "--main", "am", "--condition", "cyl"], MTCARS);
    let weighted = run_json(
        &["pie", "--main", "am", "--condition", "cyl", "--counts", "n"],
        MTCARS_COUNTS,
    );
    assert_eq!(long["panels"], weighted["panels"]);
    assert_eq!(long["labels"]["subtitle"], weighted["labels"]["subtitle"]);
}

#[test]
fn test_pie_goodness_of_fit_with_ratio() {
    let spec = run_json(&["pie", "--main", "am", "--ratio", "0.5,0.5"], MTCARS);
    let subtitle = spec["labels"]["subtitle"].as_str().unwrap();
    // 19 vs 13 against 16 vs 16
    assert!(subtitle.starts_with("χ²_gof(1) = 1.1"), "{}", subtitle);
    assert!(spec["panels"][0].get("title").is_none());
}

#[test]
fn test_pie_paired_has_no_bayes_caption() {
    let mut csv = String::from("before,after\n");
    for (pair, times) in [("yes,yes", 5), ("yes,no", 8), ("no,yes", 2), ("no,no", 5)] {
        for _ in 0..times {
            csv.push_str(pair);
            csv.push('\n');
        }
    }
    let spec = run_json(&["pie", "--main", "before", "--condition", "after", "--paired"], &csv);
    let subtitle = spec["labels"]["subtitle"].as_str().unwrap();
    assert!(subtitle.starts_with("χ²_McNemar(1) = "), "{}", subtitle);
    assert!(subtitle.ends_with("n_pairs = 20"), "{}", subtitle);
    assert!(spec["labels"].get("caption").is_none());
}

#[test]
fn test_dot_one_sample_t_test() {
    let spec = run_json(
        &["dot", "--x", "price", "--y", "brand", "--test-value", "10"],
        PRICES,
    );
    assert_eq!(spec["kind"], "dot");
    let subtitle = spec["labels"]["subtitle"].as_str().unwrap();
    assert!(subtitle.starts_with("t(4) = 2.09, p = "), "{}", subtitle);

    let points = spec["panels"][0]["layers"][0]["points"].as_array().unwrap();
    let labels: Vec<&str> = points.iter().map(|p| p["label"].as_str().unwrap()).collect();
    assert_eq!(labels, vec!["Fiat", "Audi", "Kia", "BMW", "Tesla"]);
    assert_eq!(spec["secondary_y_axis"]["labels"][0], "20%");
}

#[test]
fn test_dot_robust_type_alias() {
    let spec = run_json(&["dot", "--x", "price", "--y", "brand", "--type", "r"], PRICES);
    let subtitle = spec["labels"]["subtitle"].as_str().unwrap();
    assert!(subtitle.starts_with("M_robust = "), "{}", subtitle);
}

#[test]
fn test_missing_column_fails() {
    let result = run_ggstats(&["pie", "--main", "gear"], MTCARS);
    let err = result.expect_err("Expected failure for unknown column");
    assert!(err.contains("gear"), "{}", err);
}

#[test]
fn test_invalid_weight_fails() {
    let csv = "cyl,am,n\n4,0,3\n4,1,-2\n";
    let result = run_ggstats(&["pie", "--main", "am", "--counts", "n"], csv);
    assert!(result.is_err());
}

#[test]
fn test_messages_go_to_stderr() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ggstats"))
        .args(["pie", "--main", "am", "--format", "json", "--messages"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(MTCARS.as_bytes()).unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    serde_json::from_slice::<Value>(&output.stdout).expect("stdout must stay pure JSON");
    assert!(!output.stderr.is_empty());
}
