use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use blockdoc::{
    BigNumber, Block, BlockId, Blocks, Content, DocumentMeta, LeafContent, NodePath, OutputMode,
    Payload, Untyped,
};

/// A report described in TOML.
///
/// ```toml
/// title = "Quarterly numbers"
/// mode = "attached"
/// blocks = [
///     "Plain text becomes Markdown",
///     { type = "code", language = "rust", code = "fn main() {}" },
///     { type = "group", blocks = ["nested", { type = "media", path = "logo.png" }] },
/// ]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mode: OutputMode,
    #[serde(default)]
    pub blocks: Vec<toml::Value>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("block at {path}: {source}")]
    Block {
        path: NodePath,
        #[source]
        source: toml::de::Error,
    },

    #[error("block at {path}: {source}")]
    Json {
        path: NodePath,
        #[source]
        source: serde_json::Error,
    },

    #[error("block at {path}: {message}")]
    Invalid { path: NodePath, message: String },
}

// ---------------------------------------------------------------------------
// Block tables
// ---------------------------------------------------------------------------

/// One table in a `blocks` array, selected by its `type` key.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum BlockSpec {
    Group {
        id: Option<String>,
        #[serde(default)]
        blocks: Vec<toml::Value>,
    },
    Markdown {
        id: Option<String>,
        text: Option<String>,
        path: Option<PathBuf>,
    },
    Code {
        id: Option<String>,
        language: String,
        code: Option<String>,
        path: Option<PathBuf>,
    },
    Html {
        id: Option<String>,
        html: Option<String>,
        path: Option<PathBuf>,
    },
    BigNumber {
        id: Option<String>,
        heading: String,
        value: String,
        change: Option<String>,
        prev_value: Option<String>,
        is_upward_change: Option<bool>,
        is_positive_intent: Option<bool>,
    },
    Media {
        id: Option<String>,
        path: PathBuf,
        name: Option<String>,
        mime: Option<String>,
        caption: Option<String>,
    },
    Plot {
        id: Option<String>,
        spec: Option<toml::Value>,
        path: Option<PathBuf>,
        caption: Option<String>,
        #[serde(default = "default_responsive")]
        responsive: bool,
    },
    File {
        id: Option<String>,
        name: Option<String>,
        mime: Option<String>,
        path: Option<PathBuf>,
        text: Option<String>,
        json: Option<toml::Value>,
    },
    Table {
        id: Option<String>,
        html: Option<String>,
        path: Option<PathBuf>,
        caption: Option<String>,
    },
    DataTable {
        id: Option<String>,
        csv: Option<String>,
        path: Option<PathBuf>,
        caption: Option<String>,
        #[serde(default)]
        can_pivot: bool,
    },
}

fn default_responsive() -> bool {
    true
}

impl Manifest {
    pub fn from_toml(source: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let source = read_to_string(path)?;
        Manifest::from_toml(&source)
    }

    pub fn meta(&self) -> DocumentMeta {
        DocumentMeta {
            title: self.title.clone(),
            description: self.description.clone(),
            mode: self.mode,
        }
    }

    /// Turn the `blocks` array into authored content. Relative `path` keys
    /// resolve against `base_dir`.
    pub fn into_blocks(self, base_dir: &Path) -> Result<Vec<Content>, ManifestError> {
        let loader = Loader { base_dir };
        loader.values(self.blocks, &NodePath::root())
    }
}

struct Loader<'a> {
    base_dir: &'a Path,
}

impl Loader<'_> {
    fn values(&self, values: Vec<toml::Value>, parent: &NodePath) -> Result<Vec<Content>, ManifestError> {
        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| self.value(value, &parent.child(index)))
            .collect()
    }

    fn value(&self, value: toml::Value, path: &NodePath) -> Result<Content, ManifestError> {
        match value {
            toml::Value::String(text) => Ok(Content::Text(text)),
            toml::Value::Table(table) => {
                let spec: BlockSpec = toml::Value::Table(table)
                    .try_into::<BlockSpec>()
                    .map_err(|source| ManifestError::Block {
                        path: path.clone(),
                        source,
                    })?;
                self.block(spec, path)
            }
            // Left for the compiler to reject with its own error.
            other => Ok(Content::Untyped(Untyped::new(other.type_str(), other.to_string()))),
        }
    }

    fn block(&self, spec: BlockSpec, path: &NodePath) -> Result<Content, ManifestError> {
        let (id, content) = match spec {
            BlockSpec::Group { id, blocks } => {
                let group = Blocks {
                    id: id.map(BlockId::from),
                    blocks: self.values(blocks, path)?,
                };
                return Ok(Content::Group(group));
            }
            BlockSpec::Markdown { id, text, path: file } => {
                let text = self.text(text, file, path, "text")?;
                (id, LeafContent::Markdown { text: Payload::Text(text) })
            }
            BlockSpec::Code {
                id,
                language,
                code,
                path: file,
            } => {
                let code = self.text(code, file, path, "code")?;
                (
                    id,
                    LeafContent::Code {
                        language,
                        code: Payload::Text(code),
                    },
                )
            }
            BlockSpec::Html { id, html, path: file } => {
                let html = self.text(html, file, path, "html")?;
                (id, LeafContent::Html { html: Payload::Text(html) })
            }
            BlockSpec::BigNumber {
                id,
                heading,
                value,
                change,
                prev_value,
                is_upward_change,
                is_positive_intent,
            } => (
                id,
                LeafContent::BigNumber(BigNumber {
                    heading,
                    value,
                    change,
                    prev_value,
                    is_upward_change,
                    is_positive_intent,
                }),
            ),
            BlockSpec::Media {
                id,
                path: file,
                name,
                mime,
                caption,
            } => {
                let data = self.read(&file)?;
                let mime = mime.unwrap_or_else(|| guess_mime(&file).to_string());
                let name = name.or_else(|| file_name(&file));
                (
                    id,
                    LeafContent::Media {
                        name,
                        mime,
                        caption,
                        data: Payload::Bytes(data),
                    },
                )
            }
            BlockSpec::Plot {
                id,
                spec,
                path: file,
                caption,
                responsive,
            } => {
                let spec = match (spec, file) {
                    (Some(spec), None) => self.json(&spec, path)?.to_string().into_bytes(),
                    (None, Some(file)) => self.read(&file)?,
                    _ => return Err(exactly_one(path, "spec", "path")),
                };
                (
                    id,
                    LeafContent::Plot {
                        caption,
                        responsive,
                        spec: Payload::Bytes(spec),
                    },
                )
            }
            BlockSpec::File {
                id,
                name,
                mime,
                path: file,
                text,
                json,
            } => {
                let (data, default_name, default_mime) = match (file, text, json) {
                    (Some(file), None, None) => {
                        let mime = guess_mime(&file);
                        (self.read(&file)?, file_name(&file), mime)
                    }
                    (None, Some(text), None) => (text.into_bytes(), None, "text/plain"),
                    (None, None, Some(json)) => (
                        self.json(&json, path)?.to_string().into_bytes(),
                        Some("data.json".to_string()),
                        "application/json",
                    ),
                    _ => {
                        return Err(ManifestError::Invalid {
                            path: path.clone(),
                            message: "a file needs exactly one of `path`, `text` or `json`"
                                .to_string(),
                        });
                    }
                };
                let name = name.or(default_name).ok_or_else(|| ManifestError::Invalid {
                    path: path.clone(),
                    message: "a file built from `text` needs a `name`".to_string(),
                })?;
                (
                    id,
                    LeafContent::File {
                        name,
                        mime: mime.unwrap_or_else(|| default_mime.to_string()),
                        data: Payload::Bytes(data),
                    },
                )
            }
            BlockSpec::Table {
                id,
                html,
                path: file,
                caption,
            } => {
                let html = self.text(html, file, path, "html")?;
                (
                    id,
                    LeafContent::Table {
                        caption,
                        html: Payload::Text(html),
                    },
                )
            }
            BlockSpec::DataTable {
                id,
                csv,
                path: file,
                caption,
                can_pivot,
            } => {
                let data = match (csv, file) {
                    (Some(csv), None) => csv.into_bytes(),
                    (None, Some(file)) => self.read(&file)?,
                    _ => return Err(exactly_one(path, "csv", "path")),
                };
                (
                    id,
                    LeafContent::DataTable {
                        caption,
                        can_pivot,
                        data: Payload::Bytes(data),
                    },
                )
            }
        };

        let block = Block::new(content);
        Ok(Content::Leaf(match id {
            Some(id) => block.with_id(id),
            None => block,
        }))
    }

    /// Body given inline under `key` or loaded from `path`.
    fn text(
        &self,
        inline: Option<String>,
        file: Option<PathBuf>,
        at: &NodePath,
        key: &str,
    ) -> Result<String, ManifestError> {
        match (inline, file) {
            (Some(text), None) => Ok(text),
            (None, Some(file)) => read_to_string(&self.base_dir.join(file)),
            _ => Err(exactly_one(at, key, "path")),
        }
    }

    fn read(&self, file: &Path) -> Result<Vec<u8>, ManifestError> {
        let path = self.base_dir.join(file);
        std::fs::read(&path).map_err(|source| ManifestError::Io { path, source })
    }

    fn json(&self, value: &toml::Value, at: &NodePath) -> Result<serde_json::Value, ManifestError> {
        serde_json::to_value(value).map_err(|source| ManifestError::Json {
            path: at.clone(),
            source,
        })
    }
}

fn read_to_string(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn exactly_one(path: &NodePath, first: &str, second: &str) -> ManifestError {
    ManifestError::Invalid {
        path: path.clone(),
        message: format!("exactly one of `{}` or `{}` is required", first, second),
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        Some("html" | "htm") => "text/html",
        Some("md") => "text/markdown",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
