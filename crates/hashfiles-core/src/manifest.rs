//! Graph Manifest - JSON description of assets and relations
//!
//! ```json
//! {
//!   "root": "dist",
//!   "assets": [
//!     { "url": "index.html", "initial": true, "text": "<html><head>" },
//!     { "url": "main.css" },
//!     { "id": "inline-style", "type": "Css", "text": "body{background:" },
//!     { "url": "bg.png" }
//!   ],
//!   "relations": [
//!     { "from": "index.html", "to": "main.css", "type": "HtmlStyle" },
//!     { "from": "index.html", "to": "inline-style", "type": "HtmlStyle", "after": "</head>" },
//!     { "from": "inline-style", "to": "bg.png", "type": "CssImage", "after": "}" }
//!   ]
//! }
//! ```
//!
//! Relations are appended to their source's content in manifest order, each
//! followed by its optional `after` text. Loaded file assets without `text`
//! are read from disk below the root.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::asset::{AssetId, AssetSpec, AssetType};
use crate::error::{Error, Result};
use crate::graph::AssetGraph;
use crate::relation::{ReferenceStyle, RelationType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Build root: a directory URL, or a path relative to the manifest.
    pub root: String,
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
    #[serde(default)]
    pub relations: Vec<RelationEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    /// Location relative to the root. Absent for inline assets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Key used by relations; defaults to `url`. Required for inline assets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Inferred from the file name when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<AssetType>,
    #[serde(default)]
    pub initial: bool,
    #[serde(default)]
    pub fragment: bool,
    #[serde(default)]
    pub redirect: bool,
    #[serde(default = "default_true")]
    pub loaded: bool,
    /// Leading literal content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationEntry {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    #[serde(default)]
    pub reference_style: ReferenceStyle,
    /// Literal content following the reference in the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl AssetEntry {
    fn key(&self) -> Option<&str> {
        self.id.as_deref().or(self.url.as_deref())
    }

    fn spec(&self) -> AssetSpec {
        let asset_type = self.asset_type.unwrap_or_else(|| {
            self.url
                .as_deref()
                .map(AssetType::from_file_name)
                .unwrap_or(AssetType::Other)
        });

        let mut spec = match &self.url {
            Some(url) => AssetSpec::file(url.clone(), asset_type),
            None => AssetSpec::inline(asset_type),
        };
        if self.initial {
            spec = spec.initial();
        }
        if self.fragment {
            spec = spec.fragment();
        }
        if self.redirect {
            spec = spec.redirect();
        }
        if !self.loaded {
            spec = spec.unloaded();
        }
        if let Some(text) = &self.text {
            spec = spec.body(text.as_bytes());
        }
        spec
    }
}

impl Manifest {
    /// Read a manifest from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Build the graph. A relative `root` is taken relative to `base_dir`.
    pub fn into_graph(&self, base_dir: impl AsRef<Path>) -> Result<AssetGraph> {
        let mut graph = self.new_graph(base_dir.as_ref())?;
        let mut keys: HashMap<&str, AssetId> = HashMap::new();

        for entry in &self.assets {
            let Some(key) = entry.key() else {
                return Err(Error::MissingUrl);
            };

            let mut spec = entry.spec();
            if entry.text.is_none() && entry.loaded {
                if let Some(url) = &entry.url {
                    spec = spec.body(read_body(&graph, url)?);
                }
            }

            let id = graph.add_asset(spec)?;
            keys.insert(key, id);
        }

        for entry in &self.relations {
            let from = lookup(&graph, &keys, &entry.from)?;
            let to = lookup(&graph, &keys, &entry.to)?;
            graph.add_relation_with(from, to, entry.relation_type, entry.reference_style);
            if let Some(after) = &entry.after {
                graph.push_text(from, after);
            }
        }

        tracing::debug!(
            "Loaded {} assets and {} relations under {}",
            graph.asset_count(),
            graph.relation_count(),
            graph.root()
        );
        Ok(graph)
    }

    fn new_graph(&self, base_dir: &Path) -> Result<AssetGraph> {
        if url::Url::parse(&self.root).is_ok() {
            return AssetGraph::new(&self.root);
        }

        let dir = base_dir.join(&self.root);
        let dir = dir.canonicalize().unwrap_or(dir);
        AssetGraph::with_root_dir(dir)
    }
}

/// Load a manifest file and build its graph.
pub fn load_graph(path: impl AsRef<Path>) -> Result<AssetGraph> {
    let path = path.as_ref();
    let manifest = Manifest::load(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    manifest.into_graph(base_dir)
}

fn lookup(graph: &AssetGraph, keys: &HashMap<&str, AssetId>, key: &str) -> Result<AssetId> {
    keys.get(key)
        .copied()
        .or_else(|| graph.find_by_url(key))
        .ok_or_else(|| Error::UnknownAsset(key.to_string()))
}

/// Bytes of a file asset living under a `file:` root. Anything else (CDN
/// URLs, `http:` roots) has no local body.
fn read_body(graph: &AssetGraph, url: &str) -> Result<Vec<u8>> {
    let url = graph.resolve(url)?;
    if url.scheme() != "file" || !graph.is_under_root(&url) {
        return Ok(Vec::new());
    }

    let Ok(path) = url.to_file_path() else {
        return Ok(Vec::new());
    };
    std::fs::read(&path).map_err(|source| Error::Read { path, source })
}
