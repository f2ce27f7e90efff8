//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("syndic")
}

fn get_fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

#[test]
fn test_cli_decode_assigned_literal() {
    cmd()
        .args(["decode", &get_fixture_path("lark.html"), "--assignment", "GLOBAL_CONFIG.larkContent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<p>你好, syndic</p>"))
        .stdout(predicate::str::contains(r#"src="https://ucc.alicdn.com/pic/a.png""#))
        .stdout(predicate::str::contains(r#"referrerpolicy="no-referrer""#))
        .stdout(predicate::str::contains("ne-p").not())
        .stdout(predicate::str::contains("Teaser only").not());
}

#[test]
fn test_cli_decode_literal_without_hint() {
    cmd()
        .args(["decode", &get_fixture_path("lark.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("你好, syndic"));
}

#[test]
fn test_cli_decode_json_tree() {
    cmd()
        .args(["decode", &get_fixture_path("tree.json"), "--field", "/data/content"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<h2>Intro</h2><p><strong>Hello</strong> &amp; welcome</p>"));
}

#[test]
fn test_cli_decode_stdin_with_base() {
    let html = r#"<article><p class="x">Read <a href=" /more ">more</a></p><img src="img/a.png"></article>"#;
    cmd()
        .args(["decode", "-", "--base", "https://example.com/posts/1"])
        .write_stdin(html)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"href="https://example.com/more""#))
        .stdout(predicate::str::contains(r#"src="https://example.com/posts/img/a.png""#));
}

#[test]
fn test_cli_decode_output_file_and_config() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.toml");
    std::fs::write(&config, "[media]\nprotected_hosts = [\"alicdn.com\"]\n").unwrap();
    let output = tmp.path().join("out.html");

    cmd()
        .args([
            "decode",
            &get_fixture_path("lark.html"),
            "--proxy",
            "https://proxy.test/?url=",
            "--config",
            config.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("https://proxy.test/?url=https%3A%2F%2Fucc%2Ealicdn%2Ecom"), "{written}");
}

#[test]
fn test_cli_decode_unknown_shape_fails() {
    cmd()
        .args(["decode", "-"])
        .write_stdin("just some words")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No decodable content"));
}

#[test]
fn test_cli_decode_invalid_assignment() {
    cmd()
        .args(["decode", &get_fixture_path("lark.html"), "--assignment", "larkContent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OBJECT.FIELD"));
}

#[test]
fn test_cli_missing_file() {
    cmd()
        .args(["decode", "nonexistent.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_cli_invalid_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.toml");
    std::fs::write(&config, "[pipeline]\nthreads = 2\n").unwrap();

    cmd()
        .args(["decode", &get_fixture_path("tree.json"), "--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config file"));
}

#[test]
fn test_cli_feed_unknown_source() {
    cmd()
        .args(["feed", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown source"));
}

#[test]
fn test_cli_feed_requires_topic() {
    cmd()
        .args(["feed", "infoq-topic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires a topic id or alias"));
}

#[test]
fn test_cli_feed_rejects_bad_format() {
    cmd().args(["feed", "aliyun-blog", "-f", "atom"]).assert().failure();
}

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("feed"))
        .stdout(predicate::str::contains("decode"));
}

#[test]
fn test_cli_version() {
    cmd().arg("--version").assert().success().stdout(predicate::str::contains("syndic"));
}
