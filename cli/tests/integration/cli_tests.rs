//! Integration tests for the foreman-enc binary.
//!
//! Every test points `FOREMAN_ENC_SETTINGS` at a settings file inside a temp
//! directory, so no test reads `/etc/puppet*`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn foreman_enc() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("foreman-enc"));
    cmd.env("RUST_LOG", "info");
    cmd
}

/// A puppet directory with a settings file pointing at `url`.
struct Site {
    dir: TempDir,
    settings: PathBuf,
}

impl Site {
    fn new(url: &str) -> Self {
        let dir = TempDir::new().expect("temp dir");
        std::fs::create_dir_all(dir.path().join("yaml/facts")).unwrap();
        let settings = dir.path().join("foreman.yaml");
        std::fs::write(
            &settings,
            format!(
                "---\n:url: \"{url}\"\n:puppetdir: \"{}\"\n:timeout: 2\n:threads: 2\n",
                dir.path().display()
            ),
        )
        .unwrap();
        Self { dir, settings }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn run(&self) -> Command {
        let mut cmd = foreman_enc();
        cmd.env("FOREMAN_ENC_SETTINGS", &self.settings);
        cmd
    }
}

/// URL of a port nothing listens on.
fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    format!("http://{}", listener.local_addr().unwrap())
}

/// Answer `count` requests with `response`, returning their request lines.
fn stub_server(count: usize, response: &'static str) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let mut seen = Vec::new();
        for _ in 0..count {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line.trim_end().is_empty() {
                    break;
                }
                if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    length = v.trim().parse().unwrap();
                }
            }
            let mut body = vec![0; length];
            reader.read_exact(&mut body).unwrap();
            stream.write_all(response.as_bytes()).unwrap();
            seen.push(request_line.trim_end().to_string());
        }
        seen
    });
    (url, handle)
}

const CREATED: &str = "HTTP/1.1 201 Created\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

fn write_facts(dir: &Path, certname: &str) {
    std::fs::write(
        dir.join(format!("{certname}.yaml")),
        format!("--- !ruby/object:Puppet::Node::Facts\nname: {certname}\nvalues:\n  hostname: {certname}\n"),
    )
    .unwrap();
}

// --- Help and argument validation ---

#[test]
fn test_help_lists_push_flags() {
    foreman_enc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--push-facts-parallel"))
        .stdout(predicate::str::contains("--watch-facts"));
}

#[test]
fn test_version_flag_shows_version() {
    foreman_enc()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("foreman-enc"));
}

#[test]
fn test_watch_without_push_flag_fails() {
    foreman_enc()
        .arg("--watch-facts")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Cannot watch for facts without specifying --push-facts or --push-facts-parallel",
        ));
}

#[test]
fn test_no_certname_fails() {
    foreman_enc()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Must provide certname as an argument"));
}

// --- Settings ---

#[test]
fn test_missing_settings_file_fails() {
    let dir = TempDir::new().unwrap();
    foreman_enc()
        .arg("web01")
        .env("FOREMAN_ENC_SETTINGS", dir.path().join("absent.yaml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read settings file"));
}

#[test]
fn test_settings_without_url_fail() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("foreman.yaml");
    std::fs::write(&settings, ":puppetdir: /var/lib/puppet\n").unwrap();
    foreman_enc()
        .args(["--settings", settings.to_str().unwrap(), "web01"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Must provide URL in"));
}

// --- ENC ---

#[test]
fn test_enc_serves_cache_when_foreman_is_down() {
    let site = Site::new(&dead_url());
    std::fs::create_dir_all(site.path("yaml/foreman")).unwrap();
    std::fs::write(site.path("yaml/foreman/web01.yaml"), "---\nclasses: {}\n").unwrap();

    site.run()
        .arg("web01")
        .assert()
        .success()
        .stdout("---\nclasses: {}\n")
        .stderr(predicate::str::contains("Serving cached ENC"));
}

#[test]
fn test_enc_without_cache_fails() {
    let site = Site::new(&dead_url());
    site.run()
        .arg("web01")
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("Unable to read from Cache file"));
}

#[test]
fn test_enc_strips_environment_and_caches_result() {
    let (url, server) = stub_server(
        1,
        "HTTP/1.1 200 OK\r\nContent-Length: 47\r\nConnection: close\r\n\r\n---\nclasses:\n  ntp: {}\nenvironment: production\n",
    );
    let site = Site::new(&url);

    site.run()
        .args(["web01", "--no-environment"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ntp"))
        .stdout(predicate::str::contains("environment").not());

    assert_eq!(server.join().unwrap(), vec!["GET /node/web01?format=yml HTTP/1.1"]);
    let cached = std::fs::read_to_string(site.path("yaml/foreman/web01.yaml")).unwrap();
    assert!(!cached.contains("environment"));
}

// --- Fact push ---

#[test]
fn test_parallel_push_uploads_every_host_once() {
    let (url, server) = stub_server(3, CREATED);
    let site = Site::new(&url);
    for host in ["a", "b", "c"] {
        write_facts(&site.path("yaml/facts"), host);
    }

    site.run().arg("--push-facts-parallel").assert().success();

    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r == "POST /api/hosts/facts HTTP/1.1"));
    for host in ["a", "b", "c"] {
        let marker = std::fs::read_to_string(site.path(&format!("yaml/foreman/{host}-push-facts.yaml"))).unwrap();
        assert!(marker.starts_with("Facts from this host were last pushed to"));
    }
}

#[test]
fn test_push_of_unchanged_facts_makes_no_request() {
    let site = Site::new(&dead_url());
    write_facts(&site.path("yaml/facts"), "a");
    std::fs::create_dir_all(site.path("yaml/foreman")).unwrap();
    // Marker written after the fact file, so it is fresh.
    std::fs::write(site.path("yaml/foreman/a-push-facts.yaml"), "pushed\n").unwrap();
    let later = filetime::FileTime::from_unix_time(4_102_444_800, 0);
    filetime::set_file_mtime(site.path("yaml/foreman/a-push-facts.yaml"), later).unwrap();

    site.run().args(["--push-facts", "a"]).assert().success();
}

#[test]
fn test_push_failure_is_logged_not_fatal() {
    let site = Site::new(&dead_url());
    write_facts(&site.path("yaml/facts"), "a");

    site.run()
        .arg("--push-facts")
        .assert()
        .success()
        .stderr(predicate::str::contains("Could not send facts to Foreman"));
    assert!(!site.path("yaml/foreman/a-push-facts.yaml").exists());
}

// --- Reports ---

const REPORT: &str = "--- !ruby/object:Puppet::Transaction::Report
host: web01
time: 2024-03-01 10:00:00.000000000 +00:00
status: unchanged
logs: []
metrics:
  resources: !ruby/object:Puppet::Util::Metric
    values:
    - - total
      - Total
      - 4
";

#[test]
fn test_report_is_sent() {
    let (url, server) = stub_server(1, CREATED);
    let site = Site::new(&url);
    let report = site.path("report.yaml");
    std::fs::write(&report, REPORT).unwrap();

    site.run().arg("--report").arg(&report).assert().success();
    assert_eq!(server.join().unwrap(), vec!["POST /api/config_reports HTTP/1.1"]);
}

#[test]
fn test_report_delivery_failure_fails() {
    let site = Site::new(&dead_url());
    let report = site.path("report.yaml");
    std::fs::write(&report, REPORT).unwrap();

    site.run()
        .arg("--report")
        .arg(&report)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not send report to Foreman at"));
}
