use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;

/// Generate an OpenAPI 3.0.3 document from an annotated IDL model
#[derive(Parser, Debug)]
#[command(name = "openapi-from-idl")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// IDL model dump (.json/.yaml/.yml) or a directory of dumps
    #[arg(value_name = "INPUT")]
    pub input_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output directory (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Name of the file written into the output directory
    pub fn file_name(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "openapi.yaml",
            OutputFormat::Json => "openapi.json",
        }
    }
}

/// Logger configured from `env` (`RUST_LOG` in the binary); `--verbose` raises the
/// global level to debug
pub fn logger_builder(verbose: bool, env: Env<'_>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_env(env);
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.input_path.exists() {
        anyhow::bail!("Input path does not exist: {}", args.input_path.display());
    }
    if let Some(dir) = &args.output_dir {
        if dir.is_file() {
            anyhow::bail!("Output path is not a directory: {}", dir.display());
        }
    }

    info!("Input: {}", args.input_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_dir {
        Some(dir) => info!("Output directory: {}", dir.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    use crate::loader::ModelLoader;
    use crate::serializer::{serialize_json, serialize_yaml, write_to_file};

    info!("Loading IDL model...");
    let loaded = ModelLoader::new(args.input_path.clone())
        .load()
        .with_context(|| format!("Failed to load IDL model from {}", args.input_path.display()))?;

    info!("Generating OpenAPI document...");
    let result = crate::generate(&loaded.model);
    let document = &result.document;

    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(document)?,
        OutputFormat::Json => serialize_json(document)?,
    };

    if let Some(output_dir) = &args.output_dir {
        let output_path = output_dir.join(args.output_format.file_name());
        write_to_file(&content, &output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Model files: {}", loaded.files.len());
    info!("  - Services: {}", loaded.model.services.len());
    info!("  - Structs: {}", loaded.model.structs.len());
    info!("  - Paths: {}", document.paths.len());
    info!("  - Schemas: {}", document.components.schemas.len());
    info!(
        "  - Warnings: {}",
        loaded.warnings.len() + result.warnings.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MODEL: &str = r#"
services:
  - name: Greeter
    methods:
      - name: Hello
        annotations: { api.get: ["/hello/:name"] }
"#;

    #[test]
    fn test_parse_defaults() {
        let args = CliArgs::try_parse_from(["openapi-from-idl", "model.yaml"]).unwrap();

        assert_eq!(args.input_path, PathBuf::from("model.yaml"));
        assert_eq!(args.output_format, OutputFormat::Yaml);
        assert!(args.output_dir.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_parse_all_options() {
        let args = CliArgs::try_parse_from([
            "openapi-from-idl",
            "idl",
            "-o",
            "out",
            "-f",
            "json",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert_eq!(args.output_format, OutputFormat::Json);
        assert!(args.verbose);
    }

    #[test]
    fn test_logger_keeps_env_filter_unless_verbose() {
        let env = || Env::new().filter_or("OPENAPI_FROM_IDL_UNSET_LOG", "warn");

        assert_eq!(logger_builder(false, env()).build().filter(), log::LevelFilter::Warn);
        assert_eq!(logger_builder(true, env()).build().filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_rejects_missing_input() {
        let args =
            CliArgs::try_parse_from(["openapi-from-idl", "/definitely/not/here.yaml"]).unwrap();
        assert!(parse_args_from_parsed(args).is_err());
    }

    #[test]
    fn test_run_writes_document_into_output_dir() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("model.yaml");
        fs::write(&input, MODEL).unwrap();
        let output_dir = temp_dir.path().join("out");

        let args = CliArgs {
            input_path: input,
            output_format: OutputFormat::Json,
            output_dir: Some(output_dir.clone()),
            verbose: false,
        };
        run(args).unwrap();

        let written = fs::read_to_string(output_dir.join("openapi.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert!(value["paths"]["/hello/{name}"]["get"].is_object());
    }

    #[test]
    fn test_run_fails_without_model() {
        let temp_dir = TempDir::new().unwrap();
        let args = CliArgs {
            input_path: temp_dir.path().to_path_buf(),
            output_format: OutputFormat::Yaml,
            output_dir: None,
            verbose: false,
        };

        assert!(run(args).is_err());
    }
}
