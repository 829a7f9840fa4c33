//! End-to-end tests for the invx binary. None of them reach a model API.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn invx() -> Command {
    let mut cmd = Command::cargo_bin("invx").unwrap();
    cmd.env_remove("INVX_API_KEY").env_remove("RUST_LOG");
    cmd
}

const INVOICE_JSON: &str = r#"{
    "header": {"number": "0000042", "series": "1C24TAA", "date": "2024-05-02"},
    "seller": {"name": "Công ty Cổ phần Văn phòng phẩm", "tax_id": "0312345678"},
    "buyer": {"name": "Nguyễn Văn A"},
    "items": [
        {"number": 1, "name": "Bút bi", "unit": "cây", "quantity": "3", "unit_price": "5000", "vat_rate": 10},
        {"number": 2, "name": "Vở", "unit": "quyển", "quantity": "2", "unit_price": "12500", "vat_rate": 5}
    ],
    "summary": {"subtotal": "0", "tax": "0", "total": "0"}
}"#;

#[test]
fn test_detect_reports_formats() {
    let dir = TempDir::new().unwrap();
    let pdf = dir.path().join("a.pdf");
    let xml = dir.path().join("b.xml");
    fs::write(&pdf, b"%PDF-1.4\n").unwrap();
    fs::write(&xml, b"<?xml version=\"1.0\"?><HDon/>").unwrap();

    invx()
        .arg("detect")
        .arg(&pdf)
        .arg(&xml)
        .assert()
        .success()
        .stdout(predicate::str::contains("a.pdf: pdf (9 bytes)"))
        .stdout(predicate::str::contains("b.xml: xml"));
}

#[test]
fn test_detect_json() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("notes.txt");
    fs::write(&file, b"hello").unwrap();

    invx()
        .args(["detect", "--json"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""format":"unknown""#))
        .stdout(predicate::str::contains(r#""bytes":5"#));
}

#[test]
fn test_calc_recomputes_totals() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("invoice.json");
    fs::write(&input, INVOICE_JSON).unwrap();

    // 3 × 5000 at 10% plus 2 × 12500 at 5%: 15000 + 1500 + 25000 + 1250.
    invx()
        .arg("calc")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""subtotal": "40000""#))
        .stdout(predicate::str::contains(r#""tax": "2750""#))
        .stdout(predicate::str::contains(r#""total": "42750""#))
        .stderr(predicate::str::contains("differs from computed total 42750"));
}

#[test]
fn test_calc_text_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("invoice.json");
    fs::write(&input, INVOICE_JSON).unwrap();

    invx()
        .args(["calc", "--format", "text"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Date: 02/05/2024"))
        .stdout(predicate::str::contains("  2. Vở - 2 quyển x 12500 = 26250 (VAT 5%)"));
}

#[test]
fn test_calc_rejects_bad_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("invoice.json");
    fs::write(&input, "{\"header\": 1}").unwrap();

    invx()
        .arg("calc")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid invoice JSON"));
}

#[test]
fn test_config_init_set_get() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("invx").join("config.json");

    invx().arg("--config").arg(&path).args(["config", "init"]).assert().success();
    assert!(path.exists());

    invx()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "pdf.render_dpi", "150"])
        .assert()
        .success();

    invx()
        .arg("--config")
        .arg(&path)
        .args(["config", "get", "pdf.render_dpi"])
        .assert()
        .success()
        .stdout("150\n");

    invx()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "llm.vision_prompt", "receipt"])
        .assert()
        .success();

    let saved = fs::read_to_string(&path).unwrap();
    assert!(saved.contains(r#""vision_prompt": "receipt""#));

    invx()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_set_rejects_unknown_key_and_bad_value() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    invx()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "pdf.nope", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found: pdf.nope"));

    invx()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "pdf.render_dpi", "high"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value for pdf.render_dpi"));

    assert!(!path.exists());
}

#[test]
fn test_process_pdf_without_api_key() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("scan.pdf");
    fs::write(&input, b"%PDF-1.4\n").unwrap();

    invx()
        .arg("--config")
        .arg(dir.path().join("missing.json"))
        .arg("process")
        .arg(&input)
        .assert()
        .failure();

    let config = dir.path().join("config.json");
    invx().arg("--config").arg(&config).args(["config", "init"]).assert().success();

    invx()
        .arg("--config")
        .arg(&config)
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("INVX_API_KEY is not set; model-based extraction of PDF and image input is disabled"))
        .stderr(predicate::str::contains("LLM extractor not configured - required for PDF processing"));
}

#[test]
fn test_process_missing_file() {
    invx()
        .args(["process", "does-not-exist.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_batch_summary_records_failures() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.xml"), b"<HDon><TTChung/></HDon>").unwrap();
    fs::write(dir.path().join("b.txt"), b"ignored").unwrap();
    let out = dir.path().join("out");
    let pattern = format!("{}/*", dir.path().display());

    invx()
        .args(["batch", &pattern, "--continue-on-error", "--summary", "--output-dir"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 files to process"))
        .stdout(predicate::str::contains("no parser registered for root element <HDon>"));

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    let mut lines = summary.lines();
    assert!(lines.next().unwrap().starts_with("filename,status,method,confidence"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("a.xml,error,"));
    assert!(row.contains(",xml_parse_failure,"));
    assert!(row.contains("no parser registered"));
}

#[test]
fn test_batch_stops_on_first_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.xml"), b"<HDon/>").unwrap();
    let pattern = format!("{}/*.xml", dir.path().display());

    invx()
        .args(["batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn test_mine_rejects_non_pdf() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("x.pdf");
    fs::write(&input, b"not a pdf").unwrap();

    invx()
        .arg("mine")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("PDF"));
}
