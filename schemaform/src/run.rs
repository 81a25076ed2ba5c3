//! Command line driver.
//!
//! Loads a schema and a model, applies `--set` assignments through the field
//! tree, optionally saves the model and prints either the model or the field
//! tree snapshot.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde_json::Value;

use crate::{
    data::{FormData, default_schema_by_model, form_data::DEFAULT_MODEL_PATH, read_document},
    descriptor::Descriptor,
    parser::{ParserConfig, ParserRegistry},
};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "schemaform",
    version,
    about = "Parse a JSON Schema into a form field tree and edit its model"
)]
pub struct Cli {
    /// Schema document (.json or .toml); derived from the model path when omitted.
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Model document to load and save.
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Presentation descriptor document.
    #[arg(short, long)]
    pub descriptor: Option<PathBuf>,

    /// Parser configuration (.toml or .json).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Assign a field, e.g. `--set address.city=Paris`. Repeatable.
    #[arg(long = "set", value_name = "PATH=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// What to print.
    #[arg(short, long, value_enum, default_value_t = Output::Value)]
    pub output: Output,

    /// Write the model back when it changed.
    #[arg(long)]
    pub save: bool,

    /// Print the JSON Schema of the parser configuration and exit.
    #[arg(long)]
    pub config_schema: bool,
}

/// Output selector.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// The model value.
    Value,
    /// The field tree with live attributes.
    Tree,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(path, value)| (path.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected PATH=VALUE, got `{s}`"))
}

/// Read a parser configuration document.
pub fn load_config(path: &Path) -> anyhow::Result<ParserConfig> {
    let document = read_document(path)?;
    serde_json::from_value(document)
        .with_context(|| format!("Invalid parser configuration {}", path.display()))
}

/// Run the command line workflow and return the text to print.
///
/// # Errors
///
/// Returns errors when a document cannot be read or parsed, when a `--set`
/// path names no field, or when saving fails.
pub fn run(cli: &Cli) -> anyhow::Result<String> {
    if cli.config_schema {
        let schema = schemars::schema_for!(ParserConfig);
        return Ok(serde_json::to_string_pretty(&schema)?);
    }

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ParserConfig::default(),
    };
    let registry = Arc::new(ParserRegistry::with_config(config));

    let descriptor = match &cli.descriptor {
        Some(path) => Some(Descriptor::from_value(&read_document(path)?)?),
        None => None,
    };

    let schema_path = match &cli.schema {
        Some(path) => path.clone(),
        None => default_schema_by_model(cli.model.as_deref().unwrap_or(Path::new(DEFAULT_MODEL_PATH))),
    };
    let schema = read_document(&schema_path)?;

    let mut data = FormData::new_with_options(cli.model.as_ref(), &schema, descriptor, registry)?;
    for (path, value) in &cli.set {
        data.set(path, value)?;
    }
    if cli.save && data.save()? {
        info!("saved {}", data.model_path.display());
    }

    let out = match cli.output {
        Output::Value => data.value().cloned().unwrap_or(Value::Null),
        Output::Tree => data.tree.snapshot_root()?.unwrap_or(Value::Null),
    };
    Ok(serde_json::to_string_pretty(&out)?)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("schemaform").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("a.b[0]=x=y").unwrap(),
            ("a.b[0]".to_string(), "x=y".to_string())
        );
        assert!(parse_assignment("nothing").is_err());
        assert!(Cli::try_parse_from(["schemaform", "--set", "nothing"]).is_err());
    }

    #[test]
    fn test_run_sets_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("app-schema.json");
        let model = dir.path().join("app.json");
        fs::write(
            &schema,
            json!({
                "type": "object",
                "properties": {
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "level": {"type": "string", "enum": ["low", "high"]},
                },
            })
            .to_string(),
        )
        .unwrap();
        fs::write(&model, r#"{"tags": ["a", "b"]}"#).unwrap();
        let model_arg = model.to_string_lossy().into_owned();

        let out = run(&cli(&[
            "-m",
            model_arg.as_str(),
            "--set",
            "tags[1]=c",
            "--set",
            "level=high",
            "--save",
        ])).unwrap();
        let out: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out, json!({"tags": ["a", "c"], "level": "high"}));
        assert_eq!(read_document(&model).unwrap(), out);

        let tree = run(&cli(&["-m", model_arg.as_str(), "-o", "tree"])).unwrap();
        let tree: Value = serde_json::from_str(&tree).unwrap();
        assert_eq!(tree["fields"]["level"]["children"][1]["attrs"]["input"]["checked"], json!(true));
    }

    #[test]
    fn test_run_with_config() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("schema.toml");
        let config = dir.path().join("parser.toml");
        fs::write(&schema, "type = \"string\"\nenum = [\"a\", \"b\", \"c\"]\n").unwrap();
        fs::write(&config, "enum_list_threshold = 2\n").unwrap();

        let schema_arg = schema.to_string_lossy().into_owned();
        let config_arg = config.to_string_lossy().into_owned();
        let model_arg = dir.path().join("model.json").to_string_lossy().into_owned();

        let out = run(&cli(&[
            "-s",
            schema_arg.as_str(),
            "-c",
            config_arg.as_str(),
            "-m",
            model_arg.as_str(),
            "-o",
            "tree",
        ]))
        .unwrap();
        let out: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out["kind"], json!("list"));
    }

    #[test]
    fn test_config_schema() {
        let out = run(&cli(&["--config-schema"])).unwrap();
        let schema: Value = serde_json::from_str(&out).unwrap();
        assert!(schema["properties"]["enum_list_threshold"].is_object());
    }
}
