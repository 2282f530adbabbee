//! ODPI-C backend built on the `oracle` crate

use oracle::sql_type::ToSql;
use oracle::{Connection, Connector};

use super::{Bindings, ConnectParams, Driver, DriverConnection, Purity, Row};
use crate::error::OracleError;

#[derive(Debug, Default, Clone, Copy)]
pub struct OdpiDriver;

impl Driver for OdpiDriver {
    fn name(&self) -> &'static str {
        "odpi"
    }

    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn DriverConnection>, OracleError> {
        let mut connector = Connector::new(params.user.as_str(), params.password.as_str(), params.dsn.as_str());
        if let Some(cclass) = &params.connection_class {
            connector.connection_class(cclass.as_str());
        }
        match params.purity {
            Some(Purity::New) => {
                connector.purity(oracle::conn::Purity::New);
            }
            Some(Purity::Reuse) => {
                connector.purity(oracle::conn::Purity::Self_);
            }
            Some(Purity::Default) | None => {}
        }
        if !params.sharding_key.is_empty() || !params.super_sharding_key.is_empty() {
            log::warn!("Sharding keys are not supported by the {} driver and will be ignored", self.name());
        }

        log::info!("Attempting to connect to Oracle database: {}", params.dsn);
        let conn = connector.connect()?;
        log::info!("Successfully connected to {}", params.dsn);
        Ok(Box::new(OdpiConnection { conn }))
    }
}

pub struct OdpiConnection {
    conn: Connection,
}

fn owned_bindings(bindings: Bindings<'_>) -> Vec<(String, String)> {
    bindings
        .iter()
        .map(|(k, v)| (k.trim_start_matches(':').to_string(), v.to_string()))
        .collect()
}

impl DriverConnection for OdpiConnection {
    fn execute(&mut self, sql: &str, bindings: Bindings<'_>) -> Result<u64, OracleError> {
        let owned = owned_bindings(bindings);
        let params: Vec<(&str, &dyn ToSql)> = owned.iter().map(|(k, v)| (k.as_str(), v as &dyn ToSql)).collect();
        let stmt = self.conn.execute_named(sql, &params)?;
        Ok(stmt.row_count()?)
    }

    fn query(&mut self, sql: &str, bindings: Bindings<'_>) -> Result<Vec<Row>, OracleError> {
        let owned = owned_bindings(bindings);
        let params: Vec<(&str, &dyn ToSql)> = owned.iter().map(|(k, v)| (k.as_str(), v as &dyn ToSql)).collect();
        let result_set = self.conn.query_named(sql, &params)?;
        let columns: Vec<String> = result_set
            .column_info()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut rows = Vec::new();
        for row_result in result_set {
            let row = row_result?;
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(row.get::<usize, Option<String>>(i)?);
            }
            rows.push(Row::new(columns.clone(), values));
        }
        Ok(rows)
    }

    fn commit(&mut self) -> Result<(), OracleError> {
        Ok(self.conn.commit()?)
    }

    fn rollback(&mut self) -> Result<(), OracleError> {
        Ok(self.conn.rollback()?)
    }

    fn break_execution(&mut self) -> Result<(), OracleError> {
        Ok(self.conn.break_execution()?)
    }

    fn close(&mut self) -> Result<(), OracleError> {
        Ok(self.conn.close()?)
    }
}
