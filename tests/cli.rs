//! End-to-end runs of the `codepad` binary.

use std::process::Command;

fn codepad() -> Command {
    let dir = std::env::temp_dir().join("codepad-cli-tests");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_codepad"));
    // Keep the user's configuration out of the picture
    cmd.env("CODEPAD_CONFIG", dir.join("absent.toml"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_run_html_prints_document() {
    let output = codepad()
        .args(["run", "--language", "html", "--code", "<h1>hola</h1>"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("<body>"));
    assert!(stdout.contains("<h1>hola</h1>"));
}

#[test]
fn test_run_unknown_language_fails() {
    let output = codepad()
        .args(["run", "--language", "ruby", "--code", "puts 1"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end(), "❌ Error: unsupported language");
}

#[test]
fn test_run_json_format() {
    let output = codepad()
        .args([
            "--format", "json", "run", "--language", "html", "--code", "<p>x</p>",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "output");
    assert_eq!(json["render"], "markup");
}

#[cfg(feature = "js")]
#[test]
fn test_run_javascript_through_worker() {
    let output = codepad()
        .args(["run", "-l", "javascript", "--code", "console.log('hola')"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hola\n");
}

#[test]
fn test_languages_lists_every_tag() {
    let output = codepad()
        .args(["--format", "json", "languages"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let tags: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|info| info["tag"].as_str())
        .collect();
    assert_eq!(tags, ["script", "sandboxed", "managed", "compiled", "markup"]);
}

#[test]
fn test_new_prints_starter_snippet() {
    let output = codepad()
        .args(["new", "--language", "javascript"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "console.log('hola');\n");
}

#[cfg(feature = "js")]
#[test]
fn test_config_flag_loop_limit_reaches_worker() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[script]\nloop_iteration_limit = 10\n").unwrap();
    let source = "for (let i = 0; i < 1000; i++) {} 'done'";

    for tag in ["script", "javascript"] {
        let output = codepad()
            .arg("--config")
            .arg(&config)
            .args(["run", "-l", tag, "--code", source])
            .output()
            .unwrap();

        assert!(!output.status.success(), "{} ignored the loop limit", tag);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.starts_with("❌ Error:"), "{}: {}", tag, stdout);
    }
}
