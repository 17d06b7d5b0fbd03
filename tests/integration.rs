use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn dt_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("dt");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let evidence_dir = root.join("evidence");
    fs::create_dir_all(&evidence_dir).unwrap();
    fs::write(
        evidence_dir.join("campana.txt"),
        "JOÃO DA SILVA saiu no veiculo ABC-1234.\nContato informado: (11) 98765-4321.",
    )
    .unwrap();
    fs::write(
        evidence_dir.join("vizinhos.txt"),
        "Vizinho relatou movimento na RUA DAS FLORES, 123 durante a noite.",
    )
    .unwrap();
    fs::write(evidence_dir.join("foto.jpg"), "not text").unwrap();

    fs::write(
        root.join("payload.json"),
        r#"{
  "case_id": "DT-2025-001",
  "title": "Fraude em cadastro",
  "labels": ["fraude"],
  "solicitante": {"name": "Ana Lima", "email": "ana@example.com"},
  "investigado": {"name": "João da Silva", "document": "529.982.247-25"}
}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/dt.sqlite"

[store]
max_reconnects = 2
reconnect_backoff_ms = 10

[graph]
min_confidence = 30
"#,
        root.display()
    );

    let config_path = config_dir.join("dt.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_dt(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = dt_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run dt binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn root_of(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().to_path_buf()
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_dt(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(root_of(&config_path).join("data/dt.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_dt(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_dt(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_intake_registers_case() {
    let (_tmp, config_path) = setup_test_env();
    let payload = root_of(&config_path).join("payload.json");

    let (stdout, stderr, success) = run_dt(&config_path, &["intake", payload.to_str().unwrap()]);
    assert!(success, "intake failed: stdout={}, stderr={}", stdout, stderr);

    let receipt: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(receipt["status"], "ok");
    assert_eq!(receipt["case_id"], "DT-2025-001");
    assert_eq!(receipt["generated_id"], false);
}

#[test]
fn test_ingest_directory_skips_unsupported_files() {
    let (_tmp, config_path) = setup_test_env();
    let evidence = root_of(&config_path).join("evidence");

    let (stdout, stderr, success) = run_dt(
        &config_path,
        &[
            "ingest",
            "DT-2025-001",
            evidence.to_str().unwrap(),
            "--target",
            "JOÃO DA SILVA",
        ],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files: 2"));
    assert!(stdout.contains("entities written: 3"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_ingest_memory_store_persists_nothing() {
    let (_tmp, config_path) = setup_test_env();
    let evidence = root_of(&config_path).join("evidence");

    let (stdout, _, success) = run_dt(
        &config_path,
        &[
            "ingest",
            "DT-2025-009",
            evidence.to_str().unwrap(),
            "--store",
            "memory",
        ],
    );
    assert!(success);
    assert!(stdout.contains("store: memory"));
    assert!(!root_of(&config_path).join("data/dt.sqlite").exists());
}

#[test]
fn test_graph_view_after_intake_and_ingest() {
    let (_tmp, config_path) = setup_test_env();
    let root = root_of(&config_path);

    run_dt(&config_path, &["intake", root.join("payload.json").to_str().unwrap()]);
    run_dt(
        &config_path,
        &[
            "ingest",
            "DT-2025-001",
            root.join("evidence/campana.txt").to_str().unwrap(),
            "--target",
            "JOÃO DA SILVA",
            "--person-document",
            "529.982.247-25",
        ],
    );

    let (stdout, stderr, success) = run_dt(&config_path, &["graph", "DT-2025-001"]);
    assert!(success, "graph failed: stdout={}, stderr={}", stdout, stderr);
    let view: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let nodes = view["nodes"].as_array().unwrap();
    let edges = view["edges"].as_array().unwrap();

    assert_eq!(nodes[0]["type"], "case");
    assert_eq!(nodes[0]["position"]["x"], 400.0);
    // requester, target (also the evidence person), document, phone, plate
    assert_eq!(nodes.len(), 6);
    assert!(nodes.iter().any(|n| n["type"] == "phone"));
    assert!(nodes.iter().any(|n| n["label"] == "ABC1234"));
    assert!(!edges.is_empty());
}

#[test]
fn test_graph_unknown_case_is_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_dt(&config_path, &["init"]);

    let (stdout, _, success) = run_dt(&config_path, &["graph", "DT-1999-001"]);
    assert!(success);
    let view: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(view["nodes"].as_array().unwrap().is_empty());
    assert!(view["edges"].as_array().unwrap().is_empty());
}

#[test]
fn test_node_details_and_missing_node() {
    let (_tmp, config_path) = setup_test_env();
    let root = root_of(&config_path);
    run_dt(&config_path, &["intake", root.join("payload.json").to_str().unwrap()]);

    let (stdout, _, success) = run_dt(&config_path, &["node", "1"]);
    assert!(success);
    let details: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(details["labels"][0], "Case");
    assert_eq!(details["properties"]["id"], "DT-2025-001");

    let (_, _, success) = run_dt(&config_path, &["node", "999"]);
    assert!(!success);
}

#[test]
fn test_delete_case_removes_edges() {
    let (_tmp, config_path) = setup_test_env();
    let root = root_of(&config_path);
    run_dt(&config_path, &["intake", root.join("payload.json").to_str().unwrap()]);

    let (stdout, _, success) = run_dt(&config_path, &["delete-case", "DT-2025-001"]);
    assert!(success);
    assert!(stdout.contains("edges removed: 2"));

    let (stdout, _, _) = run_dt(&config_path, &["graph", "DT-2025-001"]);
    let view: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(view["nodes"].as_array().unwrap().is_empty());
}

#[test]
fn test_parse_without_config() {
    let tmp = TempDir::new().unwrap();
    let dossier = tmp.path().join("dossie.txt");
    fs::write(&dossier, "Nome Completo\nMARIA SOUZA\nCPF\n52998224725\n").unwrap();
    let missing_config = tmp.path().join("missing.toml");

    let (stdout, stderr, success) =
        run_dt(&missing_config, &["parse", dossier.to_str().unwrap()]);
    assert!(success, "parse failed: stdout={}, stderr={}", stdout, stderr);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["identity"]["name"], "MARIA SOUZA");
    assert_eq!(report["meta"]["protocol"], "DT-CPF-52998224725");
}

#[test]
fn test_extract_prints_candidates() {
    let (_tmp, config_path) = setup_test_env();
    let file = root_of(&config_path).join("evidence/campana.txt");

    let (stdout, stderr, success) = run_dt(
        &config_path,
        &["extract", file.to_str().unwrap(), "--target", "JOÃO DA SILVA"],
    );
    assert!(success, "extract failed: stdout={}, stderr={}", stdout, stderr);
    let extraction: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(extraction["vehicles"][0]["value"], "ABC1234");
    assert_eq!(extraction["phones"][0]["confidence"], 100);
}

#[test]
fn test_extract_without_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("nota.txt");
    fs::write(&file, "Veiculo ABC-1234 estacionado.").unwrap();

    let (stdout, stderr, success) = run_dt(
        &tmp.path().join("missing.toml"),
        &["extract", file.to_str().unwrap()],
    );
    assert!(success, "extract failed: stdout={}, stderr={}", stdout, stderr);
    let extraction: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(extraction["vehicles"][0]["value"], "ABC1234");
}

#[test]
fn test_extract_rejects_malformed_config() {
    let (_tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[graph\nmin_confidence = ").unwrap();
    let file = root_of(&config_path).join("evidence/campana.txt");

    let (stdout, stderr, success) = run_dt(&config_path, &["extract", file.to_str().unwrap()]);
    assert!(!success, "extract accepted a malformed config: {}", stdout);
    assert!(stderr.contains("Failed to parse config file"));
}

#[test]
fn test_missing_config_fails_for_graph_commands() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_dt(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
