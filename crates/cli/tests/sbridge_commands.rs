use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn sbridge_binary() -> PathBuf {
	let mut path = std::env::current_exe().expect("current_exe should resolve");
	path.pop();
	path.pop();
	path.push("sbridge");
	path
}

fn run_sbridge(workdir: &Path, args: &[&str]) -> (bool, Vec<Value>, String) {
	let output = Command::new(sbridge_binary())
		.current_dir(workdir)
		.env_remove("RUST_LOG")
		.args(args)
		.output()
		.expect("failed to execute sbridge");

	let stdout = String::from_utf8_lossy(&output.stdout).to_string();
	let stderr = String::from_utf8_lossy(&output.stderr).to_string();
	let lines = stdout
		.lines()
		.map(|line| serde_json::from_str(line).unwrap_or_else(|_| panic!("stdout line is not JSON: {line}")))
		.collect();
	(output.status.success(), lines, stderr)
}

/// Endpoint on a port nothing listens on.
fn dead_endpoint() -> String {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
	let addr = listener.local_addr().expect("local addr");
	format!("http://{addr}/process")
}

fn write_config(dir: &TempDir) -> PathBuf {
	let path = dir.path().join("bridge.json");
	std::fs::write(&path, r#"{"max_retries": 0, "retry_delay_ms": 0, "request_timeout_secs": 5}"#).expect("config should be written");
	path
}

#[test]
fn kinds_lists_every_session_tag() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let (success, lines, stderr) = run_sbridge(tmp.path(), &["kinds"]);
	assert!(success, "kinds failed: {stderr}");

	let tags: Vec<&str> = lines.iter().filter_map(|line| line["tag"].as_str()).collect();
	assert_eq!(
		tags,
		vec![
			"startLiveness",
			"startEnrollment",
			"startLivenessThenMatch",
			"startLivenessThenIdMatch",
			"startIdScanOnly",
			"startSecureIdPhoto",
		]
	);
	assert_eq!(lines[2]["referencePolicy"], "Require");
}

#[test]
fn unknown_tag_fails_without_output() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let (success, lines, stderr) = run_sbridge(tmp.path(), &["run", "startTeleport", "--payload", "x"]);
	assert!(!success);
	assert!(lines.is_empty());
	assert!(stderr.contains("startTeleport"), "stderr: {stderr}");
}

#[test]
fn verification_without_reference_is_refused() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let endpoint = dead_endpoint();
	let (success, lines, stderr) = run_sbridge(tmp.path(), &["run", "startLivenessThenMatch", "--payload", "x", "--endpoint", &endpoint]);
	assert!(!success);
	assert!(lines.is_empty(), "nothing should start: {lines:?}");
	assert!(stderr.contains("reference"), "stderr: {stderr}");
}

#[test]
fn unreachable_webservice_aborts_the_session() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let config = write_config(&tmp);
	let endpoint = dead_endpoint();
	let config_arg = config.to_string_lossy().to_string();

	let (success, lines, stderr) = run_sbridge(
		tmp.path(),
		&["run", "startEnrollment", "--payload", "request", "--config", &config_arg, "--endpoint", &endpoint],
	);
	assert!(!success, "an aborted session should exit non-zero");

	let events: Vec<&str> = lines.iter().filter_map(|line| line["event"].as_str()).collect();
	assert_eq!(events.first(), Some(&"started"), "stderr: {stderr}");
	assert!(events.contains(&"aborted"), "events: {events:?}");
	assert_eq!(events.last(), Some(&"exit"));

	let started = &lines[0];
	assert!(started["externalReferenceId"].as_str().is_some_and(|id| id.starts_with("sessionbridge_")));
	let exit = lines.last().expect("exit line");
	assert_eq!(exit["status"], "RequestAborted");
	assert!(exit["externalReferenceId"].is_null(), "failed sessions drop the reference");
}
