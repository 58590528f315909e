//! Command handlers for `rst`.

pub mod assign;
pub mod history;
pub mod init;
pub mod position;
pub mod stats;
pub mod unit;

use std::path::Path;

use rusqlite::Connection;

use crate::output::{CliError, OutputMode, render_error};

/// Open the store, rendering a structured error if that fails.
pub(crate) fn open_store(path: &Path, output: OutputMode) -> anyhow::Result<Connection> {
    match roster_core::db::open_store(path) {
        Ok(conn) => Ok(conn),
        Err(err) => {
            render_error(
                output,
                &CliError::new(format!("cannot open store {}: {err:#}", path.display())),
            )?;
            Err(err)
        }
    }
}

/// Render a domain failure and convert it into the command's error.
pub(crate) fn domain_fail(
    output: OutputMode,
    err: roster_core::DomainError,
) -> anyhow::Error {
    let _ = render_error(output, &CliError::from_domain(&err));
    anyhow::Error::new(err)
}
