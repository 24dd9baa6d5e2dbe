use std::fs;

use simwatch_engine::{DownloadError, Downloader, EngineSettings, ReqwestDownloader};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader(server: &MockServer, output: &TempDir) -> ReqwestDownloader {
    ReqwestDownloader::new(EngineSettings {
        base_url: server.uri(),
        output_dir: output.path().join("artifacts"),
        ..EngineSettings::default()
    })
}

#[tokio::test]
async fn saves_artifact_into_output_dir() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/run-001.nc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'H', b'D', b'F']))
        .expect(1)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let saved = downloader(&server, &output)
        .download("run-001.nc")
        .await
        .expect("download ok");

    assert_eq!(saved, output.path().join("artifacts").join("run-001.nc"));
    assert_eq!(fs::read(&saved).unwrap(), vec![0x89, b'H', b'D', b'F']);
}

#[tokio::test]
async fn missing_artifact_reports_status_and_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/run-404.nc"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let err = downloader(&server, &output)
        .download("run-404.nc")
        .await
        .unwrap_err();

    assert_eq!(err, DownloadError::HttpStatus(404));
    assert!(!output.path().join("artifacts").join("run-404.nc").exists());
}

#[tokio::test]
async fn oversized_artifact_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/big.nc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let downloader = ReqwestDownloader::new(EngineSettings {
        base_url: server.uri(),
        output_dir: output.path().to_path_buf(),
        max_download_bytes: 16,
        ..EngineSettings::default()
    });

    let err = downloader.download("big.nc").await.unwrap_err();
    assert_eq!(err, DownloadError::TooLarge { max_bytes: 16 });
    assert!(!output.path().join("big.nc").exists());
}

#[tokio::test]
async fn path_like_names_are_refused_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let err = downloader(&server, &output)
        .download("../secrets.nc")
        .await
        .unwrap_err();

    assert_eq!(err, DownloadError::InvalidFilename("../secrets.nc".to_string()));
}
