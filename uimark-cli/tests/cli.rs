use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const TRANSCRIPT: &str = "---\nname: Pricing\nemoji: 💸\nversion: 0\nprompt: a pricing table\n---\n\nThree tiers, as asked.\n<index_html>\n<div class=\"bg-gray-50\"><img alt=\"team\" src=\"https://via.placeholder.com/640x480\"></div>\n</index_html>\n---\nversion: 1\nprompt: add a toggle\n---\n\n<index_html><button id=\"t\">Monthly</button></index_html>\n```javascript\ndocument.getElementById('t').onclick = () => {}\n```";

fn setup_transcript() -> (tempfile::TempDir, PathBuf) {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("pricing.md");
    fs::write(&path, TRANSCRIPT).expect("write");
    (temp, path)
}

fn uimark() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("uimark"));
    cmd.env_remove("UIMARK_ASSET_ORIGIN")
        .env_remove("UIMARK_MAX_IMAGES")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn default_output_is_markdown_overview() {
    let (_temp, path) = setup_transcript();

    uimark()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("# Item"))
        .stdout(predicate::str::contains("- Name: 💸 Pricing"))
        .stdout(predicate::str::contains("## 1. Version 0 (generation)"))
        .stdout(predicate::str::contains("- Prompt: a pricing table"))
        .stdout(predicate::str::contains("Three tiers, as asked."))
        .stdout(predicate::str::contains("## 2. Version 1 (generation)"));
}

#[test]
fn raw_outputs_chapter_json() {
    let (_temp, path) = setup_transcript();

    uimark()
        .arg(&path)
        .arg("--raw")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"latestVersion\": 1"))
        .stdout(predicate::str::contains("\"prompt\": \"add a toggle\""));
}

#[test]
fn html_prints_fixed_markup() {
    let (_temp, path) = setup_transcript();

    uimark()
        .arg(&path)
        .arg("--html")
        .arg("0")
        .assert()
        .success()
        .stdout(predicate::str::contains("bg-zinc-50"))
        .stdout(predicate::str::contains("https://placehold.co/640x480"))
        .stdout(predicate::str::contains("via.placeholder.com").not());
}

#[test]
fn payload_includes_scripts() {
    let (_temp, path) = setup_transcript();

    uimark()
        .arg(&path)
        .arg("--payload")
        .arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"scripts\""))
        .stdout(predicate::str::contains("\"type\": \"text/javascript\""))
        .stdout(predicate::str::contains("\"pureHtml\""));
}

#[test]
fn asset_origin_comes_from_env() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("audio.md");
    fs::write(
        &path,
        "<index_html><audio src=\"sounds/ding.wav\"></audio></index_html>",
    )
    .expect("write");

    uimark()
        .env("UIMARK_ASSET_ORIGIN", "https://preview.example/")
        .arg(&path)
        .arg("--html")
        .arg("0")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "<audio src=\"https://preview.example/openui/funky.mp3\"></audio>",
        ));
}

#[test]
fn edit_inserts_an_edit_chapter() {
    let (temp, path) = setup_transcript();
    let edit = temp.path().join("edit.html");
    fs::write(&edit, "<div>hand edited</div>\n").expect("write");

    uimark()
        .arg(&path)
        .arg("--edit")
        .arg("0")
        .arg("--from")
        .arg(&edit)
        .assert()
        .success()
        .stdout("1\n");

    let rewritten = fs::read_to_string(&path).expect("read");
    assert!(rewritten.contains("version: 0.1\nprompt: a pricing table"));
    assert!(rewritten.contains("<div>hand edited</div>"));

    uimark()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("## 2. Version 0.1 (edit)"))
        .stdout(predicate::str::contains("## 3. Version 1 (generation)"));
}

#[test]
fn empty_edit_file_is_reported_as_such() {
    let (temp, path) = setup_transcript();
    let edit = temp.path().join("edit.html");
    fs::write(&edit, "  \n").expect("write");

    uimark()
        .arg(&path)
        .arg("--edit")
        .arg("0")
        .arg("--from")
        .arg(&edit)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: edit file is empty"))
        .stderr(predicate::str::contains("edit.html"))
        .stderr(predicate::str::contains("transcript").not());

    assert_eq!(fs::read_to_string(&path).expect("read"), TRANSCRIPT);
}

#[test]
fn delete_rewrites_transcript() {
    let (_temp, path) = setup_transcript();

    uimark()
        .arg(&path)
        .arg("--delete")
        .arg("0")
        .assert()
        .success()
        .stdout(predicate::str::contains("version: 0\nprompt: add a toggle"));

    let rewritten = fs::read_to_string(&path).expect("read");
    assert!(!rewritten.contains("Three tiers"));
    assert!(rewritten.starts_with("---\nname: Pricing\nemoji: 💸\n"));
}

#[test]
fn out_of_range_chapter_fails() {
    let (_temp, path) = setup_transcript();

    uimark()
        .arg(&path)
        .arg("--html")
        .arg("7")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: chapter 7 out of range"));
}

#[test]
fn conflicting_modes_are_rejected() {
    let (_temp, path) = setup_transcript();

    uimark()
        .arg(&path)
        .arg("--raw")
        .arg("--html")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid mode"));

    uimark()
        .arg(&path)
        .arg("--edit")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--edit requires --from"));
}

#[test]
fn empty_transcript_fails() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("empty.md");
    fs::write(&path, "").expect("write");

    uimark()
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("transcript file is empty"));
}
