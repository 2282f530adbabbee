//! Python models run through the OML4Py REST API of Autonomous Database.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::credentials::OracleCredentials;
use crate::error::{AdapterError, Result};

/// The OML REST API does not accept a shorter async timeout.
pub const DEFAULT_TIMEOUT_IN_SECONDS: u64 = 1800;
pub const DEFAULT_DELAY_BETWEEN_POLL_IN_SECONDS: u64 = 2;

pub const OMLUSERS_OAUTH_API: &str = "/omlusers/api/oauth2/v1/token";
pub const OML_DO_EVAL_API: &str = "/oml/api/py-scripts/v1/do-eval/";

#[derive(Deserialize)]
struct TokenResponse {
  #[serde(rename = "accessToken")] access_token: String,
  #[serde(rename = "expiresIn")] expires_in: i64,
}

pub struct OmlClient {
  client: Client,
  base_url: String,
  username: String,
  password: String,
  token: Option<String>,
  token_expires_at: Option<DateTime<Utc>>,
}

impl OmlClient {
  pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self> {
    // 302 is how the job API reports completion, so it must reach us
    let client = Client::builder().redirect(reqwest::redirect::Policy::none()).build()?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      username: username.to_string(),
      password: password.to_string(),
      token: None,
      token_expires_at: None,
    })
  }

  pub fn base_url(&self) -> &str { &self.base_url }

  pub fn token_url(&self) -> String { format!("{}{}", self.base_url, OMLUSERS_OAUTH_API) }

  /// Current access token. Refreshed when it expires within a minute,
  /// fetched with the user's password when there is none yet.
  pub async fn get_token(&mut self) -> Result<String> {
    if let Some(expires_at) = self.token_expires_at {
      if expires_at - Utc::now() < chrono::Duration::minutes(1) {
        return self.fetch_token(true).await;
      }
    }
    match &self.token {
      Some(token) => Ok(token.clone()),
      None => self.fetch_token(false).await,
    }
  }

  async fn fetch_token(&mut self, refresh: bool) -> Result<String> {
    let body = match (&self.token, refresh) {
      (Some(token), true) => json!({ "grant_type": "refresh_token", "token": token }),
      _ => json!({ "grant_type": "password", "username": self.username, "password": self.password }),
    };
    log::debug!("Requesting OML token ({})", if refresh { "refresh" } else { "password" });
    let res = self.client
      .post(self.token_url())
      .header(ACCEPT, "application/json")
      .header(CONTENT_TYPE, "application/json")
      .json(&body)
      .send()
      .await?
      .error_for_status()?;
    let token: TokenResponse = res.json().await?;
    self.token_expires_at = Some(Utc::now() + chrono::Duration::seconds(token.expires_in));
    self.token = Some(token.access_token.clone());
    Ok(token.access_token)
  }

  /// Sends an authenticated JSON request. `path` may be relative to the
  /// base URL or already absolute (as a job `Location` is).
  pub async fn request(&mut self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
    let url = if path.starts_with(&self.base_url) { path.to_string() } else { format!("{}{}", self.base_url, path) };
    let token = self.get_token().await?;
    let mut req = self.client
      .request(method, &url)
      .bearer_auth(token)
      .header(ACCEPT, "application/json")
      .header(CONTENT_TYPE, "application/json");
    if let Some(body) = body { req = req.body(body.to_string()); }
    Ok(req.send().await?)
  }
}

fn default_timeout() -> u64 { DEFAULT_TIMEOUT_IN_SECONDS }
fn default_service() -> String { "HIGH".to_string() }

/// The `config` block of a Python model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PythonModelConfig {
  #[serde(default)] pub conda_env_name: Option<String>,
  #[serde(default = "default_timeout")] pub timeout: u64,
  #[serde(default)] pub async_flag: bool,
  #[serde(default = "default_service")] pub service: String,
}

impl Default for PythonModelConfig {
  fn default() -> Self {
    Self { conda_env_name: None, timeout: default_timeout(), async_flag: false, service: default_service() }
  }
}

pub struct PythonJob {
  identifier: String,
  script_name: String,
  config: PythonModelConfig,
  client: OmlClient,
  poll_interval: Duration,
}

async fn body_text(res: Response) -> String {
  res.text().await.unwrap_or_default()
}

impl PythonJob {
  pub fn from_model(alias: &str, config: PythonModelConfig, credentials: &OracleCredentials) -> Result<Self> {
    let url = credentials.oml_cloud_service_url.as_deref().map(str::trim).filter(|u| !u.is_empty()).ok_or_else(|| {
      AdapterError::InvalidConfig("oml_cloud_service_url is required to run Python models".into())
    })?;
    Ok(Self {
      identifier: alias.to_string(),
      script_name: format!("{}_dbt_py_script", alias),
      config,
      client: OmlClient::new(url, &credentials.user, &credentials.password)?,
      poll_interval: Duration::from_secs(DEFAULT_DELAY_BETWEEN_POLL_IN_SECONDS),
    })
  }

  pub fn with_poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }

  pub fn script_name(&self) -> &str { &self.script_name }

  pub fn payload(&self) -> Value {
    let mut data = json!({ "service": self.config.service });
    if self.config.async_flag {
      data["asyncFlag"] = json!(true);
      data["timeout"] = json!(self.config.timeout);
    }
    if let Some(env) = self.config.conda_env_name.as_deref().filter(|e| !e.is_empty()) {
      data["envName"] = json!(env);
    }
    data
  }

  fn do_eval_path(&self) -> String { format!("{}{}", OML_DO_EVAL_API, self.script_name) }

  fn failed(&self) -> AdapterError {
    AdapterError::runtime(format!("Error running Python model {}", self.identifier))
  }

  pub async fn run(&mut self) -> Result<()> {
    let data = self.payload();
    if self.config.async_flag {
      self.schedule_async_job_and_wait_for_completion(&data).await
    } else {
      self.run_blocking(&data).await
    }
  }

  /// Runs the job on a private single-threaded runtime, for synchronous callers.
  pub fn submit(mut self) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .map_err(AdapterError::wrap)?;
    rt.block_on(self.run())
  }

  async fn run_blocking(&mut self, data: &Value) -> Result<()> {
    log::info!("Running Python model {} with args {}", self.identifier, data);
    let path = self.do_eval_path();
    let res = self.client.request(Method::POST, &path, Some(data)).await.map_err(|e| {
      log::error!("Error {} running Python model {}", e, self.identifier);
      self.failed()
    })?;
    let status = res.status();
    let result: Value = res.json().await.map_err(|e| {
      log::error!("Error {} running Python model {}", e, self.identifier);
      self.failed()
    })?;
    if result.get("errorMessage").is_some() {
      log::error!("FAILURE - Python model {} Job failure is: {}", self.identifier, result);
      return Err(self.failed());
    }
    if !status.is_success() {
      log::error!("Error HTTP {} running Python model {}", status, self.identifier);
      return Err(self.failed());
    }
    log::info!("SUCCESS - Python model {} Job result is: {}", self.identifier, result);
    Ok(())
  }

  async fn schedule_async_job_and_wait_for_completion(&mut self, data: &Value) -> Result<()> {
    log::info!("Running Python async job using {}", data);
    let scheduling_failed = AdapterError::runtime(format!("Error scheduling Python model {}", self.identifier));
    let path = self.do_eval_path();
    let res = match self.client.request(Method::POST, &path, Some(data)).await {
      Ok(res) => res,
      Err(e) => {
        log::error!("Error {} scheduling async Python job for model {}", e, self.identifier);
        return Err(scheduling_failed);
      }
    };

    let status = res.status();
    if !status.is_success() {
      if status == StatusCode::BAD_REQUEST || status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("{}", body_text(res).await);
      }
      log::error!("Error HTTP {} scheduling async Python job for model {}", status, self.identifier);
      return Err(scheduling_failed);
    }

    let job_location = res
      .headers()
      .get(LOCATION)
      .and_then(|v| v.to_str().ok())
      .map(|s| s.trim_end_matches('/').to_string())
      .ok_or_else(|| AdapterError::runtime(format!("Missing Location header scheduling Python model {}", self.identifier)))?;
    log::info!("Started async job {}", job_location);

    let status_failed = || AdapterError::runtime(format!("Error checking status for job {}", job_location));
    let timeout = Duration::from_secs(self.config.timeout);
    let started = tokio::time::Instant::now();

    while started.elapsed() < timeout {
      log::debug!("Checking Job status for : {}", job_location);
      let job_status = self.client.request(Method::GET, &job_location, None).await.map_err(|e| {
        log::error!("Error {} checking status of Python job {} for model {}", e, job_location, self.identifier);
        status_failed()
      })?;
      let code = job_status.status();
      log::debug!("Job status code is: {}", code);

      if code == StatusCode::FOUND {
        log::info!("Job {} completed", job_location);
        let result_path = format!("{}/result", job_location);
        let job_result = self.client.request(Method::GET, &result_path, None).await.map_err(|_| status_failed())?;
        let result_status = job_result.status();
        let result: Value = job_result.json().await.map_err(|_| status_failed())?;
        if result.get("errorMessage").is_some() {
          log::error!("FAILURE - Python model {} Job failure is: {}", self.identifier, result);
          return Err(self.failed());
        }
        if !result_status.is_success() {
          return Err(status_failed());
        }
        log::info!("SUCCESS - Python model {} Job result is: {}", self.identifier, result);
        return Ok(());
      } else if code == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("FAILURE - Job status is: {}", body_text(job_status).await);
        return Err(self.failed());
      } else if !code.is_success() {
        log::error!("Error HTTP {} checking status of Python job {} for model {}", code, job_location, self.identifier);
        return Err(status_failed());
      }
      log::debug!("Python model {} job status is: {}", self.identifier, body_text(job_status).await);

      tokio::time::sleep(self.poll_interval).await;
    }

    log::error!("Timeout error for Python model {}", self.identifier);
    Err(AdapterError::Timeout(format!("Timeout error for Python model {}", self.identifier)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn creds(url: Option<&str>) -> OracleCredentials {
    let mut c = OracleCredentials::new("oml_user", "secret", "oml_user");
    c.oml_cloud_service_url = url.map(str::to_string);
    c
  }

  #[test]
  fn payload_for_sync_job() {
    let job = PythonJob::from_model("sales", PythonModelConfig::default(), &creds(Some("https://adb.example.com"))).unwrap();
    assert_eq!(job.script_name(), "sales_dbt_py_script");
    assert_eq!(job.payload(), json!({ "service": "HIGH" }));
  }

  #[test]
  fn payload_for_async_job_with_env() {
    let config = PythonModelConfig { conda_env_name: Some("dbt_env".into()), timeout: 3600, async_flag: true, service: "LOW".into() };
    let job = PythonJob::from_model("sales", config, &creds(Some("https://adb.example.com"))).unwrap();
    assert_eq!(job.payload(), json!({ "service": "LOW", "asyncFlag": true, "timeout": 3600, "envName": "dbt_env" }));
  }

  #[test]
  fn config_defaults_from_json() {
    let config: PythonModelConfig = serde_json::from_value(json!({ "async_flag": true })).unwrap();
    assert_eq!(config.timeout, DEFAULT_TIMEOUT_IN_SECONDS);
    assert_eq!(config.service, "HIGH");
  }

  #[test]
  fn missing_service_url_is_rejected() {
    let err = PythonJob::from_model("sales", PythonModelConfig::default(), &creds(None)).err().unwrap();
    assert!(matches!(err, AdapterError::InvalidConfig(_)));
  }
}
