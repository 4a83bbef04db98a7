//! # minirpc CLI
//!
//! Command-line interface for minirpc:
//!
//! - `minirpc serve`: run a server exposing the [`demo`] methods
//! - `minirpc call`: make one call and print the raw JSON result
//!
//! The argument helpers live here so they can be tested without the binary.

pub mod demo;

use anyhow::{anyhow, Result};
use minirpc_common::protocol::{RpcArgs, RpcKwargs};
use serde_json::Value;

/// Parses the `--args` option: a JSON array of positional arguments.
pub fn parse_positional(raw: &str) -> Result<RpcArgs> {
    match serde_json::from_str(raw).map_err(|e| anyhow!("Invalid JSON in args: {}", e))? {
        Value::Array(args) => Ok(args),
        other => Err(anyhow!("args must be a JSON array, got: {}", other)),
    }
}

/// Parses the `--kwargs` option: a JSON object of keyword arguments.
pub fn parse_keywords(raw: &str) -> Result<RpcKwargs> {
    match serde_json::from_str(raw).map_err(|e| anyhow!("Invalid JSON in kwargs: {}", e))? {
        Value::Object(kwargs) => Ok(kwargs),
        other => Err(anyhow!("kwargs must be a JSON object, got: {}", other)),
    }
}
