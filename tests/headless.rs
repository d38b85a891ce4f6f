mod support;

use std::fs;

use linkprobe::app::runtime::{ExportTarget, run_headless};
use linkprobe::app::types::DataFormat;
use linkprobe::{ServiceError, TaskClient, TaskStatus};
use support::{ScriptedService, defect};

#[tokio::test(start_paused = true)]
async fn headless_run_exports_results_and_saves_report() {
    let service = ScriptedService::new();
    service
        .accept("https://site.test", "t1")
        .statuses("t1", vec![Ok(TaskStatus::Pending), Ok(TaskStatus::Success)])
        .results(Ok(vec![
            defect("https://site.test/", "https://site.test/a", 404, false),
            defect("https://site.test/b", "https://elsewhere.test/", 503, true),
        ]))
        .report(Ok(b"%PDF-1.4".to_vec()));

    let dir = tempfile::tempdir().unwrap();
    let export = ExportTarget {
        path: dir.path().join("links.csv").to_string_lossy().to_string(),
        format: DataFormat::Csv,
    };
    let reports = dir.path().join("reports");

    let mut client = TaskClient::new(service.clone());
    run_headless(&mut client, "https://site.test", Some(&export), true, &reports)
        .await
        .unwrap();

    let csv = fs::read_to_string(&export.path).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("https://elsewhere.test/,503,true,server_error"));
    assert_eq!(fs::read(reports.join("broken_links.pdf")).unwrap(), b"%PDF-1.4");
    assert_eq!(service.download_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn headless_run_reports_job_errors() {
    let service = ScriptedService::new();
    service.reject("not-a-url", 400, "invalid url");

    let dir = tempfile::tempdir().unwrap();
    let mut client = TaskClient::new(service.clone());
    let err = run_headless(&mut client, "not-a-url", None, true, dir.path())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "invalid url");
    assert_eq!(service.download_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn headless_download_failure_does_not_fail_run() {
    let service = ScriptedService::new();
    service
        .accept("https://site.test", "t2")
        .statuses("t2", vec![Ok(TaskStatus::Success)])
        .results(Ok(Vec::new()))
        .report(Err(ServiceError::Rejected {
            status: 404,
            message: "no report".to_string(),
        }));

    let dir = tempfile::tempdir().unwrap();
    let mut client = TaskClient::new(service.clone());
    run_headless(&mut client, "https://site.test", None, true, dir.path())
        .await
        .unwrap();

    assert!(!dir.path().join("broken_links.pdf").exists());
    assert!(client.state().results.is_empty());
}
