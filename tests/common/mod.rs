// Scripted in-memory driver shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use dbt_oracle::driver::{Bindings, ConnectParams, Driver, DriverConnection, DriverMode, NetConfig, Row};
use dbt_oracle::{ConnectionFactory, OracleConnectionManager, OracleCredentials, OracleError};

/// What the fake database will answer, and a log of what it was asked.
#[derive(Default)]
pub struct Script {
    pub connect_error: Option<OracleError>,
    pub execute_results: VecDeque<Result<u64, OracleError>>,
    pub query_results: VecDeque<Result<Vec<Row>, OracleError>>,
    pub close_error: Option<OracleError>,
    pub break_error: Option<OracleError>,
    pub events: Vec<String>,
    pub binds: Vec<Vec<(String, String)>>,
}

pub type Shared = Arc<Mutex<Script>>;

pub struct ScriptedDriver {
    pub script: Shared,
}

impl Driver for ScriptedDriver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn DriverConnection>, OracleError> {
        let mut script = self.script.lock().unwrap();
        if let Some(err) = script.connect_error.take() {
            return Err(err);
        }
        script.events.push(format!("connect {} as {}", params.dsn, params.user));
        Ok(Box::new(ScriptedConnection { script: self.script.clone() }))
    }
}

pub struct ScriptedConnection {
    script: Shared,
}

impl ScriptedConnection {
    fn record(&self, event: String, bindings: Bindings<'_>) {
        let mut script = self.script.lock().unwrap();
        script.events.push(event);
        script
            .binds
            .push(bindings.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect());
    }
}

impl DriverConnection for ScriptedConnection {
    fn execute(&mut self, sql: &str, bindings: Bindings<'_>) -> Result<u64, OracleError> {
        self.record(format!("execute {}", sql), bindings);
        self.script.lock().unwrap().execute_results.pop_front().unwrap_or(Ok(0))
    }

    fn query(&mut self, sql: &str, bindings: Bindings<'_>) -> Result<Vec<Row>, OracleError> {
        self.record(format!("query {}", sql), bindings);
        self.script.lock().unwrap().query_results.pop_front().unwrap_or(Ok(Vec::new()))
    }

    fn commit(&mut self) -> Result<(), OracleError> {
        self.script.lock().unwrap().events.push("commit".into());
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), OracleError> {
        self.script.lock().unwrap().events.push("rollback".into());
        Ok(())
    }

    fn break_execution(&mut self) -> Result<(), OracleError> {
        let mut script = self.script.lock().unwrap();
        script.events.push("break".into());
        script.break_error.take().map_or(Ok(()), Err)
    }

    fn close(&mut self) -> Result<(), OracleError> {
        let mut script = self.script.lock().unwrap();
        script.events.push("close".into());
        script.close_error.take().map_or(Ok(()), Err)
    }
}

pub fn credentials() -> OracleCredentials {
    let mut creds = OracleCredentials::new("dbt_test", "secret", "dbt_test");
    creds.host = Some("localhost".into());
    creds.service = Some("freepdb1".into());
    creds.database = Some("FREEPDB1".into());
    creds
}

pub fn factory(script: &Shared, mode: DriverMode, net: NetConfig) -> ConnectionFactory {
    ConnectionFactory::new(mode, net, Arc::new(ScriptedDriver { script: script.clone() }))
}

pub fn manager(script: Script) -> (OracleConnectionManager, Shared) {
    let shared: Shared = Arc::new(Mutex::new(script));
    let factory = factory(&shared, DriverMode::Thin, NetConfig::default());
    (OracleConnectionManager::new(factory, credentials(), "model.test"), shared)
}

pub fn events(script: &Shared) -> Vec<String> {
    script.lock().unwrap().events.clone()
}

pub fn row(pairs: &[(&str, Option<&str>)]) -> Row {
    Row::from_pairs(pairs.iter().copied())
}
