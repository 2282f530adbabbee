/// Oracle connection management
///
/// Holds one physical connection per worker, brackets statements with
/// begin/commit and turns driver failures into adapter errors.

use std::fmt;
use std::time::Instant;

use serde::Serialize;

use crate::credentials::OracleCredentials;
use crate::driver::{Bindings, ConnectionFactory, DriverConnection, Row};
use crate::error::{AdapterError, Result};

/// SQL longer than this is cut in debug logs when abridging is requested.
const ABRIDGED_SQL_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Init,
    Open,
    Closed,
    Fail,
}

/// A named logical connection and the driver handle behind it.
pub struct Connection {
    pub name: String,
    pub state: ConnectionState,
    pub transaction_open: bool,
    handle: Option<Box<dyn DriverConnection>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("transaction_open", &self.transaction_open)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}

impl Connection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ConnectionState::Init,
            transaction_open: false,
            handle: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterResponse {
    pub message: String,
    pub rows_affected: u64,
}

impl AdapterResponse {
    pub fn ok(rows_affected: u64) -> Self {
        Self {
            message: "OK".to_string(),
            rows_affected,
        }
    }
}

impl fmt::Display for AdapterResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn abridge(sql: &str) -> String {
    if sql.chars().count() > ABRIDGED_SQL_LEN {
        let head: String = sql.chars().take(ABRIDGED_SQL_LEN).collect();
        format!("{}...", head)
    } else {
        sql.to_string()
    }
}

#[derive(Debug)]
pub struct OracleConnectionManager {
    factory: ConnectionFactory,
    credentials: OracleCredentials,
    connection: Connection,
}

impl OracleConnectionManager {
    pub const TYPE: &'static str = "oracle";

    pub fn new(factory: ConnectionFactory, credentials: OracleCredentials, name: impl Into<String>) -> Self {
        Self {
            factory,
            credentials,
            connection: Connection::new(name),
        }
    }

    pub fn credentials(&self) -> &OracleCredentials {
        &self.credentials
    }

    pub fn credentials_mut(&mut self) -> &mut OracleCredentials {
        &mut self.credentials
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Opens the driver connection. Does nothing when already open.
    pub fn open(&mut self) -> Result<&Connection> {
        if self.connection.state == ConnectionState::Open && self.connection.handle.is_some() {
            log::debug!("Connection is already open, skipping open.");
            return Ok(&self.connection);
        }

        let params = self.credentials.connect_params()?;
        log::debug!("Opening connection '{}' to {}", self.connection.name, params.dsn);
        match self.factory.connect(&params) {
            Ok(handle) => {
                self.connection.handle = Some(handle);
                self.connection.state = ConnectionState::Open;
                self.connection.transaction_open = false;
                Ok(&self.connection)
            }
            Err(e) => {
                log::debug!("Got an error when attempting to open an oracle connection: '{}'", e);
                if let Some(hint) = &e.hint {
                    log::info!("{}", hint);
                }
                self.connection.handle = None;
                self.connection.state = ConnectionState::Fail;
                Err(AdapterError::FailedToConnect(e.to_string()))
            }
        }
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.connection.state != ConnectionState::Open || self.connection.handle.is_none() {
            self.open()?;
        }
        Ok(())
    }

    /// Interrupts the running statement and drops the connection.
    pub fn cancel(&mut self) -> Result<()> {
        let name = self.connection.name.clone();
        log::info!("Cancelling query '{}'", name);

        if let Some(handle) = self.connection.handle.as_deref_mut() {
            let outcome = handle.break_execution().and_then(|_| handle.close());
            if let Err(e) = outcome {
                log::error!("Error closing connection for cancel request");
                self.connection.handle = None;
                self.connection.state = ConnectionState::Closed;
                return Err(AdapterError::runtime(e.to_string()));
            }
        }

        self.connection.handle = None;
        self.connection.state = ConnectionState::Closed;
        self.connection.transaction_open = false;
        log::info!("Canceled query '{}'", name);
        Ok(())
    }

    pub fn begin(&mut self) -> Result<()> {
        if self.connection.transaction_open {
            return Err(AdapterError::runtime(format!(
                "Tried to begin a new transaction on connection \"{}\", but it already had one open!",
                self.connection.name
            )));
        }
        self.ensure_open()?;
        // Oracle starts transactions implicitly with the first DML
        log::debug!("On {}: BEGIN", self.connection.name);
        self.connection.transaction_open = true;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        if !self.connection.transaction_open {
            return Err(AdapterError::runtime(format!(
                "Tried to commit transaction on connection \"{}\", but it does not have one open!",
                self.connection.name
            )));
        }
        log::debug!("On {}: COMMIT", self.connection.name);
        self.exception_handler("COMMIT", |handle| Ok(handle.commit()?))?;
        self.connection.transaction_open = false;
        Ok(())
    }

    pub fn rollback_if_open(&mut self) -> Result<()> {
        if !self.connection.transaction_open {
            return Ok(());
        }
        log::debug!("On {}: ROLLBACK", self.connection.name);
        self.exception_handler("ROLLBACK", |handle| Ok(handle.rollback()?))?;
        self.connection.transaction_open = false;
        Ok(())
    }

    /// Closes the driver handle and marks the connection closed.
    pub fn release(&mut self) -> Result<()> {
        self.connection.transaction_open = false;
        self.connection.state = ConnectionState::Closed;
        match self.connection.handle.take() {
            Some(mut handle) => handle.close().map_err(AdapterError::from),
            None => Ok(()),
        }
    }

    /// Runs `f` against the open handle and maps whatever it returns.
    ///
    /// Database errors release the connection and surface trimmed. Runtime
    /// errors release and pass through. Anything else is wrapped as runtime.
    pub fn exception_handler<T>(
        &mut self,
        sql: &str,
        f: impl FnOnce(&mut dyn DriverConnection) -> Result<T>,
    ) -> Result<T> {
        let result = match self.connection.handle.as_deref_mut() {
            Some(handle) => f(handle),
            None => Err(AdapterError::runtime(format!(
                "Connection '{}' is not open",
                self.connection.name
            ))),
        };

        result.map_err(|err| {
            log::debug!("Error running SQL: {}", abridge(sql));
            self.handle_failure(err)
        })
    }

    fn release_after_failure(&mut self) {
        if let Err(e) = self.release() {
            log::info!("Failed to release connection! {}", e);
        }
    }

    fn handle_failure(&mut self, err: AdapterError) -> AdapterError {
        match err {
            AdapterError::Database(message) => {
                log::info!("Oracle error: {}", message);
                self.release_after_failure();
                AdapterError::Database(message.trim().to_string())
            }
            err @ AdapterError::Runtime { .. } => {
                log::info!("Rolling back transaction.");
                self.release_after_failure();
                err
            }
            other => {
                log::info!("Rolling back transaction.");
                self.release_after_failure();
                AdapterError::wrap(other)
            }
        }
    }

    /// Executes one statement and commits it.
    pub fn add_query(
        &mut self,
        sql: &str,
        bindings: Bindings<'_>,
        auto_begin: bool,
        abridge_sql_log: bool,
    ) -> Result<AdapterResponse> {
        if auto_begin && !self.connection.transaction_open {
            self.begin()?;
        } else {
            self.ensure_open()?;
        }

        let name = self.connection.name.clone();
        log::debug!("Using {} connection \"{}\".", Self::TYPE, name);
        let log_sql = if abridge_sql_log { abridge(sql) } else { sql.to_string() };
        log::debug!("On {}: {}", name, log_sql);

        let started = Instant::now();
        let rows_affected = self.exception_handler(sql, |handle| {
            let rows = handle.execute(sql, bindings)?;
            handle.commit()?;
            Ok(rows)
        })?;
        log::debug!(
            "SQL status: OK in {:.2} seconds",
            started.elapsed().as_secs_f64()
        );

        Ok(AdapterResponse::ok(rows_affected))
    }

    /// Runs a query and returns every row.
    pub fn fetch(&mut self, sql: &str, bindings: Bindings<'_>) -> Result<Vec<Row>> {
        self.ensure_open()?;
        let name = self.connection.name.clone();
        log::debug!("On {}: {}", name, abridge(sql));

        let started = Instant::now();
        let rows = self.exception_handler(sql, |handle| Ok(handle.query(sql, bindings)?))?;
        log::debug!(
            "SQL status: OK ({} rows) in {:.2} seconds",
            rows.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(rows)
    }

    /// `add_query` or `fetch`, returning a response either way.
    pub fn execute(&mut self, sql: &str, auto_begin: bool, fetch: bool) -> Result<(AdapterResponse, Vec<Row>)> {
        if fetch {
            let rows = self.fetch(sql, &[])?;
            Ok((AdapterResponse::ok(rows.len() as u64), rows))
        } else {
            let response = self.add_query(sql, &[], auto_begin, false)?;
            Ok((response, Vec::new()))
        }
    }
}
