use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::SystemTime,
};

use anyhow::{Context, bail};
use schemars::JsonSchema;
use serde_json::Value;

use crate::{
    descriptor::Descriptor,
    field::FieldId,
    parser::{ParserOptions, ParserRegistry},
    schema::Schema,
    tree::FieldTree,
};

/// Model file used when none is given.
pub const DEFAULT_MODEL_PATH: &str = ".config.toml";

/// Derive a default schema path from a model path: `config.toml` →
/// `config-schema.json`.
pub fn default_schema_by_model(model: &Path) -> PathBuf {
    let file_name = model
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut parts = file_name.split('.').collect::<Vec<_>>();
    if parts.len() > 1 {
        parts.pop();
    }
    let name = format!("{}-schema.json", parts.join("."));

    match model.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Parse a JSON or TOML document, picked by file extension.
pub fn parse_document(content: &str, ext: &str) -> anyhow::Result<Value> {
    match ext {
        "json" => Ok(serde_json::from_str(content)?),
        "toml" | "tml" => {
            let value: toml::Value = toml::from_str(content)?;
            Ok(serde_json::to_value(value)?)
        }
        _ => bail!("Unsupported document extension: {ext:?}"),
    }
}

/// Read a JSON or TOML document from disk.
pub fn read_document(path: &Path) -> anyhow::Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_document(&content, extension(path))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|s| s.to_str()).unwrap_or("")
}

/// A field tree bound to a model file.
pub struct FormData {
    /// The parsed form.
    pub tree: FieldTree,
    /// Where the model is read from and saved to.
    pub model_path: PathBuf,
    needs_save: Arc<AtomicBool>,
}

impl FormData {
    /// Load a form from a schema file and an optional model file.
    ///
    /// When `schema` is not given it is derived from the model path.
    pub fn new(
        model: Option<impl AsRef<Path>>,
        schema: Option<impl AsRef<Path>>,
    ) -> anyhow::Result<Self> {
        let model_path = Self::model_path(model);
        let schema_path = match schema {
            Some(schema) => schema.as_ref().to_path_buf(),
            None => default_schema_by_model(&model_path),
        };
        if !schema_path.exists() {
            bail!("Schema file does not exist: {}", schema_path.display());
        }
        let schema = read_document(&schema_path)?;
        Self::new_with_schema(Some(model_path), &schema)
    }

    /// Load a form for the schema of the Rust type `C`.
    pub fn for_type<C: JsonSchema>(model: Option<impl AsRef<Path>>) -> anyhow::Result<Self> {
        let schema = Schema::for_type::<C>()?;
        Self::build(
            Self::model_path(model),
            schema,
            None,
            Arc::new(ParserRegistry::new()),
        )
    }

    /// Load a form from a schema document and an optional model file.
    pub fn new_with_schema(
        model: Option<impl AsRef<Path>>,
        schema: &Value,
    ) -> anyhow::Result<Self> {
        Self::new_with_options(model, schema, None, Arc::new(ParserRegistry::new()))
    }

    /// Load a form with a presentation descriptor and a custom registry.
    pub fn new_with_options(
        model: Option<impl AsRef<Path>>,
        schema: &Value,
        descriptor: Option<Descriptor>,
        registry: Arc<ParserRegistry>,
    ) -> anyhow::Result<Self> {
        let schema = Schema::from_value(schema)?;
        Self::build(Self::model_path(model), schema, descriptor, registry)
    }

    fn model_path(model: Option<impl AsRef<Path>>) -> PathBuf {
        model
            .map(|path| path.as_ref().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH))
    }

    fn build(
        model_path: PathBuf,
        schema: Schema,
        descriptor: Option<Descriptor>,
        registry: Arc<ParserRegistry>,
    ) -> anyhow::Result<Self> {
        let model = if model_path.exists() {
            let content = fs::read_to_string(&model_path)?;
            if content.trim().is_empty() {
                None
            } else {
                Some(parse_document(&content, extension(&model_path))?)
            }
        } else {
            None
        };

        let needs_save = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&needs_save);
        let mut tree = FieldTree::new(registry).on_change(move |_, _| {
            flag.store(true, Ordering::SeqCst);
        });

        let mut options = ParserOptions::new(schema)
            .with_model(model)
            .with_id("form");
        if let Some(descriptor) = descriptor {
            options = options.with_descriptor(descriptor);
        }
        if tree.parse(options)?.is_none() {
            bail!("Schema has no `type`, nothing to edit");
        }
        // the initial value is not a change
        needs_save.store(false, Ordering::SeqCst);

        Ok(FormData {
            tree,
            model_path,
            needs_save,
        })
    }

    /// Whether the model changed since it was loaded or last saved.
    pub fn needs_save(&self) -> bool {
        self.needs_save.load(Ordering::SeqCst)
    }

    /// The current model.
    pub fn value(&self) -> Option<&Value> {
        self.tree.value()
    }

    /// Handle of the field at `path`; an empty path is the root.
    pub fn field_id(&self, path: &str) -> anyhow::Result<FieldId> {
        let root = self.tree.root().context("Form has no root field")?;
        self.tree
            .find(root, path)
            .with_context(|| format!("No field at `{path}`"))
    }

    /// Set the field at `path` from text: valid JSON is taken as is, anything
    /// else as a string.
    pub fn set(&mut self, path: &str, raw: &str) -> anyhow::Result<()> {
        let id = self.field_id(path)?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        debug!("set `{path}` = {value}");
        self.tree.set_value(id, Some(value), true)?;
        Ok(())
    }

    /// Write the model back in its file format, keeping a timestamped backup
    /// of the previous file. Returns `false` when there was nothing to save.
    pub fn save(&mut self) -> anyhow::Result<bool> {
        if !self.needs_save() {
            return Ok(false);
        }
        let ext = extension(&self.model_path).to_string();
        let value = self.tree.value().cloned().unwrap_or(Value::Null);

        let content = match ext.as_str() {
            "toml" | "tml" => toml::to_string_pretty(&value)?,
            "json" => serde_json::to_string_pretty(&value)?,
            _ => bail!("Unsupported model file extension: {ext:?}"),
        };

        if self.model_path.exists() {
            let backup = format!(
                "bk-{:?}.{ext}",
                SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)?
                    .as_secs()
            );
            let backup_path = self.model_path.with_extension(backup);
            fs::copy(&self.model_path, &backup_path)?;
            debug!("backup written to {}", backup_path.display());
        }
        fs::write(&self.model_path, content)
            .with_context(|| format!("Failed to write {}", self.model_path.display()))?;
        self.needs_save.store(false, Ordering::SeqCst);
        Ok(true)
    }
}
