//! Assets - file-level resources and inline fragments of the build graph

use serde::{Deserialize, Serialize};
use std::fmt;
use url::{Position, Url};

use crate::relation::RelationId;

/// Stable identity of an asset within one [`crate::AssetGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub(crate) usize);

impl AssetId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// Closed set of asset categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    Html,
    JavaScript,
    Css,
    Image,
    Flash,
    SourceMap,
    CacheManifest,
    Rss,
    Atom,
    Htc,
    Json,
    Text,
    Other,
}

impl AssetType {
    /// Syndication feeds (RSS and Atom).
    pub const FEEDS: &'static [AssetType] = &[AssetType::Rss, AssetType::Atom];

    /// Guess the type from a file name, for manifests that omit it.
    pub fn from_file_name(file_name: &str) -> Self {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "html" | "htm" | "xhtml" => AssetType::Html,
            "js" | "mjs" | "cjs" => AssetType::JavaScript,
            "css" => AssetType::Css,
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "avif" | "ico" | "bmp" => {
                AssetType::Image
            }
            "swf" => AssetType::Flash,
            "map" => AssetType::SourceMap,
            "appcache" | "manifest" => AssetType::CacheManifest,
            "rss" => AssetType::Rss,
            "atom" => AssetType::Atom,
            "htc" => AssetType::Htc,
            "json" => AssetType::Json,
            "txt" => AssetType::Text,
            _ => AssetType::Other,
        }
    }

    pub fn is_in(self, set: &[AssetType]) -> bool {
        set.contains(&self)
    }
}

/// A piece of an asset's serialized content.
#[derive(Debug, Clone)]
pub(crate) enum Chunk {
    Raw(Vec<u8>),
    Reference(RelationId),
}

/// An asset as stored in the graph.
///
/// Only the URL, the dirty marker and (indirectly, through its relations)
/// the serialized bytes ever change after the graph has been built.
#[derive(Debug, Clone)]
pub struct Asset {
    pub(crate) url: Option<Url>,
    pub(crate) asset_type: AssetType,
    pub(crate) is_loaded: bool,
    pub(crate) is_redirect: bool,
    pub(crate) is_fragment: bool,
    pub(crate) is_initial: bool,
    pub(crate) parent: Option<AssetId>,
    pub(crate) content: Vec<Chunk>,
    pub(crate) dirty: bool,
}

impl Asset {
    /// Location of the asset; `None` for inline assets.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn is_inline(&self) -> bool {
        self.url.is_none()
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn is_redirect(&self) -> bool {
        self.is_redirect
    }

    /// Markup without a root `<html>` element.
    pub fn is_fragment(&self) -> bool {
        self.is_fragment
    }

    /// Loaded directly by the build rather than discovered via a reference.
    pub fn is_initial(&self) -> bool {
        self.is_initial
    }

    /// Serialized bytes changed since the asset was last written.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The asset owning this inline asset, if any.
    pub fn parent(&self) -> Option<AssetId> {
        self.parent
    }

    /// Last path segment of the URL, or `""` for inline assets.
    pub fn file_name(&self) -> &str {
        self.url
            .as_ref()
            .and_then(|url| url.path_segments())
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
    }

    /// File name up to (not including) its last dot.
    pub fn base_name(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(dot) => &name[..dot],
            None => name,
        }
    }

    /// File name from its last dot onwards (`.js`), or `""`.
    pub fn extension(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(dot) => &name[dot..],
            None => "",
        }
    }

    /// `?query#fragment` part of the URL, verbatim.
    pub fn query_and_fragment(&self) -> &str {
        self.url
            .as_ref()
            .map(|url| &url[Position::AfterPath..])
            .unwrap_or("")
    }
}

/// Description of an asset to add to a graph.
#[derive(Debug, Clone)]
pub struct AssetSpec {
    pub(crate) url: Option<String>,
    pub(crate) asset_type: AssetType,
    pub(crate) is_loaded: bool,
    pub(crate) is_redirect: bool,
    pub(crate) is_fragment: bool,
    pub(crate) is_initial: bool,
    pub(crate) body: Vec<u8>,
}

impl AssetSpec {
    /// A loaded file asset; relative URLs resolve against the graph root.
    pub fn file(url: impl Into<String>, asset_type: AssetType) -> Self {
        Self {
            url: Some(url.into()),
            asset_type,
            is_loaded: true,
            is_redirect: false,
            is_fragment: false,
            is_initial: false,
            body: Vec::new(),
        }
    }

    /// An inline asset, addressable only through its parent.
    pub fn inline(asset_type: AssetType) -> Self {
        Self {
            url: None,
            ..Self::file(String::new(), asset_type)
        }
    }

    pub fn initial(mut self) -> Self {
        self.is_initial = true;
        self
    }

    pub fn fragment(mut self) -> Self {
        self.is_fragment = true;
        self
    }

    pub fn redirect(mut self) -> Self {
        self.is_redirect = true;
        self
    }

    pub fn unloaded(mut self) -> Self {
        self.is_loaded = false;
        self
    }

    /// Leading literal content; relations added later are appended after it.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_asset(url: &str) -> Asset {
        Asset {
            url: Some(Url::parse(url).unwrap()),
            asset_type: AssetType::Other,
            is_loaded: true,
            is_redirect: false,
            is_fragment: false,
            is_initial: false,
            parent: None,
            content: Vec::new(),
            dirty: false,
        }
    }

    #[test]
    fn test_name_parts() {
        let asset = file_asset("file:///site/js/main.js.map?v=1#top");
        assert_eq!(asset.file_name(), "main.js.map");
        assert_eq!(asset.base_name(), "main.js");
        assert_eq!(asset.extension(), ".map");
        assert_eq!(asset.query_and_fragment(), "?v=1#top");
    }

    #[test]
    fn test_name_without_extension() {
        let asset = file_asset("file:///site/LICENSE");
        assert_eq!(asset.base_name(), "LICENSE");
        assert_eq!(asset.extension(), "");
        assert_eq!(asset.query_and_fragment(), "");
    }

    #[test]
    fn test_inline_asset_has_no_name() {
        let mut asset = file_asset("file:///site/a.css");
        asset.url = None;
        assert!(asset.is_inline());
        assert_eq!(asset.file_name(), "");
        assert_eq!(asset.extension(), "");
    }

    #[test]
    fn test_type_from_file_name() {
        assert_eq!(AssetType::from_file_name("index.HTML"), AssetType::Html);
        assert_eq!(AssetType::from_file_name("app.mjs"), AssetType::JavaScript);
        assert_eq!(AssetType::from_file_name("main.js.map"), AssetType::SourceMap);
        assert_eq!(AssetType::from_file_name("turtle.jpg"), AssetType::Image);
        assert_eq!(AssetType::from_file_name("foo.swf"), AssetType::Flash);
        assert_eq!(AssetType::from_file_name("Makefile"), AssetType::Other);
    }
}
