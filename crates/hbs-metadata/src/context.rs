//! Loaded metadata documents and library defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use hbs_model::{ClassificationType, Year};

use crate::defaults::{Defaults, SETTINGS_FILE};
use crate::error::{MetadataError, Result};
use crate::layers::{merge_deep, merge_top_level, parse_yaml, read_yaml};
use crate::placeholder::interpolate;
use crate::versioned::{ResolveOptions, resolve, version_years};

/// Environment variable overriding the base metadata directory.
pub const METADATA_DIR_ENV_VAR: &str = "HBS_METADATA_DIR";

/// Document describing the layout of household IDs.
pub const ID_INFORMATION: &str = "id_information";

const DEFAULT_METADATA_DIR: &str = "metadata";

/// Directories searched for metadata, lowest precedence first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPaths {
    pub base: PathBuf,
    pub package: Option<PathBuf>,
    pub local: Option<PathBuf>,
}

impl MetadataPaths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            package: None,
            local: None,
        }
    }

    /// Base directory from `HBS_METADATA_DIR`, falling back to `./metadata`.
    pub fn from_env() -> Self {
        let base = std::env::var_os(METADATA_DIR_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_METADATA_DIR));
        Self::new(base)
    }

    #[must_use]
    pub fn with_package(mut self, package: impl Into<PathBuf>) -> Self {
        self.package = Some(package.into());
        self
    }

    #[must_use]
    pub fn with_local(mut self, local: impl Into<PathBuf>) -> Self {
        self.local = Some(local.into());
        self
    }

    /// Layer directories in order of increasing precedence.
    pub fn layers(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.base.as_path())
            .chain(self.package.as_deref())
            .chain(self.local.as_deref())
    }
}

/// Metadata documents and defaults for one decoding session.
///
/// Built explicitly and passed to decoders. Documents are only re-read from
/// disk through [`MetadataContext::reload`] or
/// [`MetadataContext::reload_document`].
#[derive(Debug, Clone)]
pub struct MetadataContext {
    defaults: Defaults,
    documents: BTreeMap<String, Value>,
    paths: Option<MetadataPaths>,
}

impl MetadataContext {
    /// Loads settings and every configured document from `paths`.
    pub fn load(paths: MetadataPaths) -> Result<Self> {
        let defaults = load_defaults(&paths)?;
        let mut context = Self {
            defaults,
            documents: BTreeMap::new(),
            paths: Some(paths),
        };
        context.reload_documents()?;
        tracing::info!(
            documents = context.documents.len(),
            years = context.defaults.years.len(),
            "loaded metadata"
        );
        Ok(context)
    }

    /// Builds a context from in-memory documents.
    pub fn from_documents(
        defaults: Defaults,
        documents: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        Self {
            defaults,
            documents: documents.into_iter().collect(),
            paths: None,
        }
    }

    /// Re-reads settings and all documents from disk.
    ///
    /// A context built from in-memory documents has nothing to reload.
    pub fn reload(&mut self) -> Result<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };
        self.defaults = load_defaults(paths)?;
        self.reload_documents()
    }

    /// Re-reads a single document from disk.
    pub fn reload_document(&mut self, name: &str) -> Result<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };
        let document = load_document(paths, name)?;
        self.documents.insert(name.to_string(), document);
        Ok(())
    }

    fn reload_documents(&mut self) -> Result<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };
        let mut documents = BTreeMap::new();
        for name in &self.defaults.metadata_documents {
            documents.insert(name.clone(), load_document(paths, name)?);
        }
        self.documents = documents;
        Ok(())
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn document(&self, name: &str) -> Result<&Value> {
        self.documents
            .get(name)
            .ok_or_else(|| MetadataError::MissingDocument {
                name: name.to_string(),
            })
    }

    /// A top-level entry of a document.
    pub fn entry(&self, document: &str, key: &str) -> Result<&Value> {
        self.document(document)?
            .get(key)
            .ok_or_else(|| MetadataError::MissingKey {
                document: document.to_string(),
                key: key.to_string(),
            })
    }

    /// The versioned definition of a named classification.
    pub fn classification(&self, kind: ClassificationType, name: &str) -> Result<&Value> {
        self.entry(kind.metadata_document(), name)
    }

    pub fn id_information(&self) -> Result<&Value> {
        self.document(ID_INFORMATION)
    }

    /// Resolves a whole document, or a chain of nested keys within it, for
    /// one year.
    pub fn resolve(
        &self,
        document: &str,
        keys: &[&str],
        year: Year,
        options: ResolveOptions,
    ) -> Result<Option<Value>> {
        Ok(resolve(self.nested(document, keys)?, year, options))
    }

    /// Years at which the value under `keys` changes, oldest first.
    ///
    /// Empty for values that do not vary by year.
    pub fn version_years(&self, document: &str, keys: &[&str]) -> Result<Vec<Year>> {
        Ok(version_years(self.nested(document, keys)?))
    }

    fn nested(&self, document: &str, keys: &[&str]) -> Result<&Value> {
        let mut value = self.document(document)?;
        let mut path = document.to_string();
        for key in keys {
            path.push('.');
            path.push_str(key);
            value = value.get(*key).ok_or_else(|| MetadataError::MissingKey {
                document: document.to_string(),
                key: path.clone(),
            })?;
        }
        Ok(value)
    }
}

fn load_defaults(paths: &MetadataPaths) -> Result<Defaults> {
    let mut settings = Defaults::builtin_value()?;
    for layer in paths.layers() {
        let path = layer.join(SETTINGS_FILE);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "merging settings layer");
            settings = merge_deep(settings, read_yaml(&path)?);
        }
    }
    Defaults::from_value(settings)
}

fn load_document(paths: &MetadataPaths, name: &str) -> Result<Value> {
    let interpolated = name == ClassificationType::Commodity.metadata_document();
    let mut document = Mapping::new();
    let mut found = false;
    for layer in paths.layers() {
        let path = layer.join(format!("{name}.yaml"));
        if !path.is_file() {
            continue;
        }
        tracing::debug!(document = name, path = %path.display(), "reading metadata layer");
        let mut text = read_text(&path)?;
        if interpolated {
            text = interpolate(&text, &document, &path)?;
        }
        match parse_yaml(&text, &path)? {
            Value::Mapping(layer_document) => merge_top_level(&mut document, layer_document),
            _ => {
                return Err(MetadataError::NotAMapping {
                    path: path.to_path_buf(),
                });
            }
        }
        found = true;
    }
    if !found {
        tracing::warn!(document = name, "metadata document not found in any layer");
    }
    Ok(Value::Mapping(document))
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| MetadataError::io(path, e))
}
