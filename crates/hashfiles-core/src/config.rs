//! Options - placement settings, loadable from `hashfiles.json`
//!
//! Options are plain serde data; [`Options::resolve`] validates them against
//! a build root before anything in the graph is touched.

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::error::{Error, Result};

/// Config file looked up next to a manifest when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "hashfiles.json";

/// User-facing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Destination subdirectory for relocated, non-CDN assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Absolute (`https://cdn.example.com/`) or protocol-relative
    /// (`//cdn.example.com/`) origin for CDN placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn_root: Option<String>,
    /// Allow Flash assets onto the CDN.
    #[serde(default)]
    pub cdn_flash: bool,
    /// Allow Html assets onto the CDN.
    #[serde(default)]
    pub cdn_html: bool,
}

fn default_static_dir() -> String {
    "static".to_string()
}

impl Default for Options {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
            cdn_root: None,
            cdn_flash: false,
            cdn_html: false,
        }
    }
}

/// A parsed CDN origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnRoot {
    /// Base URL, always ending in `/`. Protocol-relative roots are stored
    /// with an `https` scheme.
    pub base: Url,
    /// References to CDN assets are written without a scheme.
    pub protocol_relative: bool,
}

/// Options validated against a build root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// `{root}{static_dir}/`
    pub static_base: Url,
    pub cdn: Option<CdnRoot>,
    pub cdn_flash: bool,
    pub cdn_html: bool,
}

impl Options {
    /// Load options from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let options: Options = serde_json::from_str(&content)?;
        Ok(options)
    }

    /// Save options as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!("Options saved to {:?}", path);
        Ok(())
    }

    /// Validate against the build root.
    pub fn resolve(&self, root: &Url) -> Result<ResolvedOptions> {
        Ok(ResolvedOptions {
            static_base: resolve_static_dir(root, &self.static_dir)?,
            cdn: match self.cdn_root.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(cdn_root) => Some(parse_cdn_root(cdn_root)?),
            },
            cdn_flash: self.cdn_flash,
            cdn_html: self.cdn_html,
        })
    }
}

fn resolve_static_dir(root: &Url, static_dir: &str) -> Result<Url> {
    let invalid = || Error::InvalidStaticDir(static_dir.to_string());
    if static_dir.starts_with("//") {
        return Err(invalid());
    }

    let dir = static_dir.trim_matches('/');
    if dir.is_empty()
        || dir.contains(['?', '#', '\\', ':'])
        || dir.split('/').any(|segment| matches!(segment, "" | "." | ".."))
    {
        return Err(invalid());
    }

    let base = root.join(&format!("{dir}/")).map_err(|_| invalid())?;
    if !base.as_str().starts_with(root.as_str()) {
        return Err(invalid());
    }
    Ok(base)
}

fn parse_cdn_root(cdn_root: &str) -> Result<CdnRoot> {
    let invalid = || Error::InvalidCdnRoot(cdn_root.to_string());

    let (parsed, protocol_relative) = match cdn_root.strip_prefix("//") {
        Some(rest) => (Url::parse(&format!("https://{rest}")), true),
        None => (Url::parse(cdn_root), false),
    };
    let mut base = parsed.map_err(|_| invalid())?;

    if base.cannot_be_a_base()
        || base.host_str().is_none()
        || base.query().is_some()
        || base.fragment().is_some()
    {
        return Err(invalid());
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    Ok(CdnRoot {
        base,
        protocol_relative,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root() -> Url {
        Url::parse("file:///site/").unwrap()
    }

    fn with_cdn(cdn_root: &str) -> Options {
        Options {
            cdn_root: Some(cdn_root.to_string()),
            ..Options::default()
        }
    }

    #[test]
    fn test_defaults() {
        let options: Options = serde_json::from_str("{}").unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.static_dir, "static");

        let resolved = options.resolve(&root()).unwrap();
        assert_eq!(resolved.static_base.as_str(), "file:///site/static/");
        assert!(resolved.cdn.is_none());
    }

    #[test]
    fn test_camel_case_keys() {
        let options: Options =
            serde_json::from_str(r#"{"staticDir":"assets/v1","cdnRoot":"https://cdn.example.com","cdnHtml":true}"#)
                .unwrap();
        assert!(options.cdn_html);
        assert!(!options.cdn_flash);

        let resolved = options.resolve(&root()).unwrap();
        assert_eq!(resolved.static_base.as_str(), "file:///site/assets/v1/");
        let cdn = resolved.cdn.unwrap();
        assert_eq!(cdn.base.as_str(), "https://cdn.example.com/");
        assert!(!cdn.protocol_relative);
    }

    #[test]
    fn test_cdn_root_forms() {
        let cdn = with_cdn("//cdn.example.com/assets")
            .resolve(&root())
            .unwrap()
            .cdn
            .unwrap();
        assert!(cdn.protocol_relative);
        assert_eq!(cdn.base.as_str(), "https://cdn.example.com/assets/");

        assert!(with_cdn("").resolve(&root()).unwrap().cdn.is_none());

        for bad in ["cdn.example.com", "mailto:cdn@example.com", "https://cdn.example.com/?v=1"] {
            let err = with_cdn(bad).resolve(&root()).unwrap_err();
            assert!(matches!(err, Error::InvalidCdnRoot(_)), "{bad}");
            assert!(err.is_config());
        }
    }

    #[test]
    fn test_invalid_static_dir() {
        for bad in ["", "/", "../out", "a/../../b", "x?y", "//evil.example.com", "c:/tmp"] {
            let options = Options {
                static_dir: bad.to_string(),
                ..Options::default()
            };
            let err = options.resolve(&root()).unwrap_err();
            assert!(matches!(err, Error::InvalidStaticDir(_)), "{bad:?}");
        }

        let options = Options {
            static_dir: "/static/".to_string(),
            ..Options::default()
        };
        assert_eq!(
            options.resolve(&root()).unwrap().static_base.as_str(),
            "file:///site/static/"
        );
    }

    #[test]
    fn test_load_and_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        assert_eq!(Options::load(&path).unwrap(), Options::default());

        let options = Options {
            static_dir: "s".to_string(),
            cdn_root: Some("//cdn.example.com".to_string()),
            cdn_flash: true,
            cdn_html: false,
        };
        options.save(&path).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("\"cdnRoot\""));
        assert_eq!(Options::load(&path).unwrap(), options);
    }
}
