#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use csv::ReaderBuilder;
use serde_json::Value;
use tempfile::TempDir;

fn write_edges(dir: &Path) -> PathBuf {
    let path = dir.join("edges.csv");
    fs::write(
        &path,
        "src,dst,wgt\n0,1,1\n0,2,2\n0,3,3\n3,4,1\n4,5,1\n5,3,\n6,0,4\n",
    )
    .expect("write edges");
    path
}

#[test]
fn extract_writes_feature_table_and_json_summary() {
    let dir = TempDir::new().expect("tempdir");
    let edges = write_edges(dir.path());
    let out = dir.path().join("features.csv");

    let output = cargo_bin_cmd!("rolegraph")
        .args(["--format", "json", "extract", "--edges"])
        .arg(&edges)
        .arg("--out")
        .arg(&out)
        .args(["--rounds", "2"])
        .env("ROLEGRAPH_LOG", "warn")
        .output()
        .expect("run extract");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let summary: Value = serde_json::from_slice(&output.stdout).expect("json summary");
    assert_eq!(summary["graph"]["nodes"], 7);
    assert_eq!(summary["graph"]["links"], 7);
    assert_eq!(summary["graph"]["weighted"], true);
    let rounds = summary["rounds"].as_array().expect("rounds");
    assert!(!rounds.is_empty() && rounds.len() <= 3);
    assert_eq!(rounds[0]["generated"], 26);
    let features: Vec<String> = summary["features"]
        .as_array()
        .expect("features")
        .iter()
        .map(|f| f.as_str().expect("feature name").to_string())
        .collect();
    assert!(!features.is_empty());

    let mut reader = ReaderBuilder::new().from_path(&out).expect("open table");
    let header: Vec<String> = reader
        .headers()
        .expect("header")
        .iter()
        .map(str::to_string)
        .collect();
    assert_eq!(header[0], "node");
    assert_eq!(&header[1..], features.as_slice());
    assert_eq!(reader.records().count(), 7);
}

#[test]
fn extract_rejects_missing_columns() {
    let dir = TempDir::new().expect("tempdir");
    let edges = dir.path().join("edges.csv");
    fs::write(&edges, "from,to\n0,1\n").expect("write edges");

    let output = cargo_bin_cmd!("rolegraph")
        .arg("extract")
        .arg("--edges")
        .arg(&edges)
        .output()
        .expect("run extract");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("src"), "stderr: {stderr}");
}

#[test]
fn extract_rejects_bad_fraction() {
    let dir = TempDir::new().expect("tempdir");
    let edges = write_edges(dir.path());

    cargo_bin_cmd!("rolegraph")
        .arg("extract")
        .arg("--edges")
        .arg(&edges)
        .args(["--bin-fraction", "1.5"])
        .assert()
        .failure();
}
