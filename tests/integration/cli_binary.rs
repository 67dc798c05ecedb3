//! Tests that run the compiled binary

use assert_cmd::Command;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn harvester() -> Command {
    Command::cargo_bin("catalog-harvester").unwrap()
}

#[test]
fn test_help_lists_commands() {
    let output = harvester().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("download"));
    assert!(stdout.contains("list"));
}

#[test]
fn test_zero_workers_is_rejected() {
    harvester()
        .args(["download", "--workers", "0"])
        .assert()
        .failure();
}

#[test]
fn test_catalog_url_without_placeholder_fails() {
    harvester()
        .args(["--catalog-url", "https://c.example/api", "list"])
        .assert()
        .failure();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_prints_qualifying_entries_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plugins": [
                { "slug": "big", "version": "1.0", "download_link": "https://d.example/big.zip", "active_installs": 40000 },
                { "slug": "small", "version": "1.0", "download_link": "https://d.example/small.zip", "active_installs": 20 },
            ],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalog"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "plugins": [] })))
        .mount(&server)
        .await;

    let url = format!("{}/catalog?page={{page}}", server.uri());
    let output = tokio::task::spawn_blocking(move || {
        harvester()
            .args(["--output-format", "json", "--catalog-url", &url, "list"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let listing: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing["pages"], 1);
    assert_eq!(listing["qualifying"].as_array().unwrap().len(), 1);
    assert_eq!(listing["qualifying"][0]["slug"], "big");
}
