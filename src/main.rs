//! openapi-from-idl - Command-line tool for generating OpenAPI documentation.
//!
//! Reads a parsed IDL model (services, methods and structs with their annotations) and
//! writes the OpenAPI 3.0.3 document described by its annotations.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-idl [OPTIONS] <INPUT>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation into `docs/openapi.yaml`:
//! ```bash
//! openapi-from-idl ./idl/hello.yaml -o docs
//! ```
//!
//! Generate JSON documentation from a directory of model dumps:
//! ```bash
//! openapi-from-idl ./idl -f json -o docs
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-idl ./idl -v
//! ```

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;
use openapi_from_idl::cli;

fn main() -> Result<()> {
    // The verbose flag decides the log level, so parse before the logger exists
    let args_for_verbose = cli::CliArgs::parse();

    cli::logger_builder(
        args_for_verbose.verbose,
        Env::default().default_filter_or("info"),
    )
    .init();

    info!("openapi-from-idl starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
