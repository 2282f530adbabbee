/// Integration tests for Python model submission through the OML4Py REST API
///
/// Run these tests with: cargo test --test python_job_tests

use std::time::Duration;

use dbt_oracle::python_submissions::{OmlClient, PythonJob, PythonModelConfig, OMLUSERS_OAUTH_API};
use dbt_oracle::{AdapterError, OracleCredentials};
use httpmock::prelude::*;
use serde_json::json;

const SCRIPT_PATH: &str = "/oml/api/py-scripts/v1/do-eval/sales_dbt_py_script";

fn creds(server: &MockServer) -> OracleCredentials {
    let mut c = OracleCredentials::new("oml_user", "secret", "oml_user");
    c.oml_cloud_service_url = Some(server.base_url());
    c
}

fn token_mock(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path(OMLUSERS_OAUTH_API)
            .json_body_partial(r#"{"grant_type": "password", "username": "oml_user"}"#);
        then.status(200).json_body(json!({ "accessToken": "tok-1", "expiresIn": 3600 }));
    })
}

fn async_config(timeout: u64) -> PythonModelConfig {
    PythonModelConfig {
        async_flag: true,
        timeout,
        ..Default::default()
    }
}

#[tokio::test]
async fn token_is_fetched_once_and_reused() {
    let server = MockServer::start();
    let token = token_mock(&server);

    let mut client = OmlClient::new(&server.base_url(), "oml_user", "secret").unwrap();
    assert_eq!(client.get_token().await.unwrap(), "tok-1");
    assert_eq!(client.get_token().await.unwrap(), "tok-1");
    token.assert_hits(1);
}

#[tokio::test]
async fn token_close_to_expiry_is_refreshed() {
    let server = MockServer::start();
    let _password = server.mock(|when, then| {
        when.method(POST).path(OMLUSERS_OAUTH_API).json_body_partial(r#"{"grant_type": "password"}"#);
        then.status(200).json_body(json!({ "accessToken": "short-lived", "expiresIn": 30 }));
    });
    let refresh = server.mock(|when, then| {
        when.method(POST)
            .path(OMLUSERS_OAUTH_API)
            .json_body_partial(r#"{"grant_type": "refresh_token", "token": "short-lived"}"#);
        then.status(200).json_body(json!({ "accessToken": "tok-2", "expiresIn": 3600 }));
    });

    let mut client = OmlClient::new(&server.base_url(), "oml_user", "secret").unwrap();
    assert_eq!(client.get_token().await.unwrap(), "short-lived");
    assert_eq!(client.get_token().await.unwrap(), "tok-2");
    refresh.assert_hits(1);
    println!("✓ token refreshed before expiry");
}

#[tokio::test]
async fn sync_job_succeeds() {
    let server = MockServer::start();
    let _token = token_mock(&server);
    let eval = server.mock(|when, then| {
        when.method(POST)
            .path(SCRIPT_PATH)
            .header("Authorization", "Bearer tok-1")
            .json_body(json!({ "service": "HIGH" }));
        then.status(200).json_body(json!({ "result": [] }));
    });

    let mut job = PythonJob::from_model("sales", PythonModelConfig::default(), &creds(&server)).unwrap();
    job.run().await.unwrap();
    eval.assert();
}

#[tokio::test]
async fn sync_job_error_message_fails_the_model() {
    let server = MockServer::start();
    let _token = token_mock(&server);
    let _eval = server.mock(|when, then| {
        when.method(POST).path(SCRIPT_PATH);
        then.status(200).json_body(json!({ "errorMessage": "name 'pd' is not defined" }));
    });

    let mut job = PythonJob::from_model("sales", PythonModelConfig::default(), &creds(&server)).unwrap();
    let err = job.run().await.unwrap_err();
    assert!(matches!(err, AdapterError::Runtime { ref message, .. } if message.contains("sales")), "got {:?}", err);
}

#[tokio::test]
async fn async_job_completes_after_redirect() {
    let server = MockServer::start();
    let _token = token_mock(&server);
    let job_url = format!("{}/oml/api/py-scripts/v1/jobs/job-42", server.base_url());
    let _schedule = server.mock(|when, then| {
        when.method(POST).path(SCRIPT_PATH).json_body_partial(r#"{"asyncFlag": true, "timeout": 60}"#);
        then.status(201).header("Location", format!("{}/", job_url));
    });
    let status = server.mock(|when, then| {
        when.method(GET).path("/oml/api/py-scripts/v1/jobs/job-42");
        then.status(302).header("Location", format!("{}/result", job_url));
    });
    let result = server.mock(|when, then| {
        when.method(GET).path("/oml/api/py-scripts/v1/jobs/job-42/result");
        then.status(200).json_body(json!({ "result": "ok" }));
    });

    let mut job = PythonJob::from_model("sales", async_config(60), &creds(&server))
        .unwrap()
        .with_poll_interval(Duration::from_millis(20));
    job.run().await.unwrap();
    status.assert_hits(1);
    result.assert_hits(1);
}

#[tokio::test]
async fn async_job_result_with_error_fails() {
    let server = MockServer::start();
    let _token = token_mock(&server);
    let job_url = format!("{}/oml/api/py-scripts/v1/jobs/job-7", server.base_url());
    let _schedule = server.mock(|when, then| {
        when.method(POST).path(SCRIPT_PATH);
        then.status(201).header("Location", job_url.clone());
    });
    let _status = server.mock(|when, then| {
        when.method(GET).path("/oml/api/py-scripts/v1/jobs/job-7");
        then.status(302);
    });
    let _result = server.mock(|when, then| {
        when.method(GET).path("/oml/api/py-scripts/v1/jobs/job-7/result");
        then.status(200).json_body(json!({ "errorMessage": "division by zero" }));
    });

    let mut job = PythonJob::from_model("sales", async_config(60), &creds(&server))
        .unwrap()
        .with_poll_interval(Duration::from_millis(20));
    assert!(matches!(job.run().await, Err(AdapterError::Runtime { .. })));
}

#[tokio::test]
async fn async_job_server_error_fails() {
    let server = MockServer::start();
    let _token = token_mock(&server);
    let job_url = format!("{}/oml/api/py-scripts/v1/jobs/job-9", server.base_url());
    let _schedule = server.mock(|when, then| {
        when.method(POST).path(SCRIPT_PATH);
        then.status(201).header("Location", job_url.clone());
    });
    let _status = server.mock(|when, then| {
        when.method(GET).path("/oml/api/py-scripts/v1/jobs/job-9");
        then.status(500).body("job crashed");
    });

    let mut job = PythonJob::from_model("sales", async_config(60), &creds(&server))
        .unwrap()
        .with_poll_interval(Duration::from_millis(20));
    match job.run().await {
        Err(AdapterError::Runtime { message, .. }) => assert_eq!(message, "Error running Python model sales"),
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

#[tokio::test]
async fn async_job_scheduling_rejected() {
    let server = MockServer::start();
    let _token = token_mock(&server);
    let _schedule = server.mock(|when, then| {
        when.method(POST).path(SCRIPT_PATH);
        then.status(400).body("timeout must be at least 1800");
    });

    let mut job = PythonJob::from_model("sales", async_config(60), &creds(&server)).unwrap();
    match job.run().await {
        Err(AdapterError::Runtime { message, .. }) => assert!(message.starts_with("Error scheduling")),
        other => panic!("expected a scheduling error, got {:?}", other),
    }
}

#[tokio::test]
async fn async_job_times_out_while_pending() {
    let server = MockServer::start();
    let _token = token_mock(&server);
    let job_url = format!("{}/oml/api/py-scripts/v1/jobs/slow", server.base_url());
    let _schedule = server.mock(|when, then| {
        when.method(POST).path(SCRIPT_PATH);
        then.status(201).header("Location", job_url.clone());
    });
    let status = server.mock(|when, then| {
        when.method(GET).path("/oml/api/py-scripts/v1/jobs/slow");
        then.status(202).json_body(json!({ "status": "job is still running" }));
    });

    let mut job = PythonJob::from_model("sales", async_config(1), &creds(&server))
        .unwrap()
        .with_poll_interval(Duration::from_millis(100));
    assert!(matches!(job.run().await, Err(AdapterError::Timeout(_))));
    assert!(status.hits() >= 2, "job status should be polled until the timeout");
}

#[test]
fn submit_runs_without_an_outer_runtime() {
    let server = MockServer::start();
    let _token = token_mock(&server);
    let _eval = server.mock(|when, then| {
        when.method(POST).path(SCRIPT_PATH);
        then.status(200).json_body(json!({ "result": [] }));
    });

    let job = PythonJob::from_model("sales", PythonModelConfig::default(), &creds(&server)).unwrap();
    job.submit().unwrap();
}
