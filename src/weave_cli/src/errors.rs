//! CLI-boundary error reporting: the library layers return typed
//! `thiserror` errors (`weave_il::IlError`, `weave_core::WeaveError`);
//! this crate is the only place that logs one before it unwinds out to
//! the shell, matching how `bsharp_cli`'s commands wrap library errors in
//! `anyhow::Context` rather than logging inside the libraries themselves.

use anyhow::{Context, Result};
use std::fmt::Display;

pub fn report<T, E: Display>(result: std::result::Result<T, E>, context: &str) -> Result<T> {
    result
        .map_err(|e| {
            log::error!("{context}: {e}");
            anyhow::anyhow!("{e}")
        })
        .context(context.to_string())
}
