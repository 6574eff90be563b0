//! Output - write the processed graph to disk
//!
//! Files under the build root keep their path relative to it. Files moved to
//! another origin (the CDN) go to `_cdn/<host>/<path>` so they can be synced
//! separately. Path segments are percent-decoded, so `my%20file.css` is
//! written as `my file.css`, the name a browser requests.

use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

use crate::asset::AssetId;
use crate::error::{Error, Result};
use crate::graph::AssetGraph;

/// Directory holding files that live outside the build root.
pub const CDN_DIR: &str = "_cdn";

/// Path of `id` relative to the output directory, or `None` for assets that
/// are not written (inline, unloaded, or with a path escaping the output
/// directory).
pub fn output_path(graph: &AssetGraph, id: AssetId) -> Option<PathBuf> {
    let asset = graph.asset(id);
    if !asset.is_loaded() {
        return None;
    }

    let mut url: Url = asset.url()?.clone();
    url.set_query(None);
    url.set_fragment(None);

    let mut path = PathBuf::new();
    let relative = if graph.is_under_root(&url) {
        url.as_str()[graph.root().as_str().len()..].to_string()
    } else {
        path.push(CDN_DIR);
        path.push(url.host_str().unwrap_or("local"));
        url.path().trim_start_matches('/').to_string()
    };

    for segment in relative.split('/') {
        let segment = percent_decode_str(segment).decode_utf8_lossy();
        match segment.as_ref() {
            "" | "." => {}
            ".." => return None,
            name if name.contains(['/', '\\']) => return None,
            name => path.push(name),
        }
    }

    Some(path)
}

/// Write every loaded file asset's serialized bytes below `out_dir`.
///
/// Returns the written paths in asset order. Assets whose URLs differ only
/// by query or fragment share an output file; that is an
/// [`Error::OutputCollision`] and nothing is written.
pub fn write_output(graph: &AssetGraph, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let out_dir = out_dir.as_ref();

    let mut targets: Vec<(AssetId, PathBuf)> = Vec::new();
    let mut owners: HashMap<PathBuf, AssetId> = HashMap::new();
    for id in graph.file_assets() {
        let Some(relative) = output_path(graph, id) else {
            continue;
        };
        if let Some(&first) = owners.get(&relative) {
            return Err(collision(graph, relative, first, id));
        }
        owners.insert(relative.clone(), id);
        targets.push((id, relative));
    }

    let mut written = Vec::with_capacity(targets.len());
    for (id, relative) in targets {
        let path = out_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, graph.serialize(id))?;

        tracing::debug!("Wrote {:?}", path);
        written.push(path);
    }

    tracing::info!("Wrote {} files to {:?}", written.len(), out_dir);
    Ok(written)
}

fn collision(graph: &AssetGraph, path: PathBuf, first: AssetId, second: AssetId) -> Error {
    let url = |id: AssetId| graph.asset(id).url().cloned().unwrap_or_else(|| graph.root().clone());
    let err = Error::OutputCollision {
        path,
        first: url(first),
        second: url(second),
    };
    tracing::warn!("{}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetSpec, AssetType};
    use crate::relation::RelationType;
    use tempfile::TempDir;

    #[test]
    fn test_output_paths() {
        let mut graph = AssetGraph::new("file:///site/").unwrap();
        let css = graph
            .add_asset(AssetSpec::file("static/a.css?v=1", AssetType::Css))
            .unwrap();
        let cdn = graph
            .add_asset(AssetSpec::file("https://cdn.example.com/x/b.js", AssetType::JavaScript))
            .unwrap();
        let inline = graph.add_asset(AssetSpec::inline(AssetType::Css)).unwrap();
        let remote = graph
            .add_asset(AssetSpec::file("c.png", AssetType::Image).unloaded())
            .unwrap();

        assert_eq!(output_path(&graph, css), Some(PathBuf::from("static/a.css")));
        assert_eq!(
            output_path(&graph, cdn),
            Some(PathBuf::from("_cdn/cdn.example.com/x/b.js"))
        );
        assert_eq!(output_path(&graph, inline), None);
        assert_eq!(output_path(&graph, remote), None);
    }

    #[test]
    fn test_write_output() {
        let mut graph = AssetGraph::new("file:///site/").unwrap();
        let html = graph
            .add_asset(AssetSpec::file("index.html", AssetType::Html).body("<p>"))
            .unwrap();
        let css = graph
            .add_asset(AssetSpec::file("css/a.css", AssetType::Css).body("p{}"))
            .unwrap();
        graph.add_relation(html, css, RelationType::HtmlStyle);

        let dir = TempDir::new().unwrap();
        let written = write_output(&graph, dir.path()).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("index.html")).unwrap(),
            "<p><link rel=\"stylesheet\" href=\"css/a.css\">"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("css").join("a.css")).unwrap(),
            "p{}"
        );
    }

    #[test]
    fn test_encoded_names_are_decoded_on_disk() {
        let mut graph = AssetGraph::new("file:///site/").unwrap();
        let html = graph
            .add_asset(AssetSpec::file("index.html", AssetType::Html))
            .unwrap();
        let css = graph
            .add_asset(AssetSpec::file("my%20file.css", AssetType::Css).body("p{}"))
            .unwrap();
        let sneaky = graph
            .add_asset(AssetSpec::file("a%2F..%2Fb.css", AssetType::Css))
            .unwrap();
        graph.add_relation(html, css, RelationType::HtmlStyle);

        assert_eq!(output_path(&graph, css), Some(PathBuf::from("my file.css")));
        assert_eq!(output_path(&graph, sneaky), None);

        let dir = TempDir::new().unwrap();
        write_output(&graph, dir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("my file.css")).unwrap(),
            "p{}"
        );
        assert!(!dir.path().join("my%20file.css").exists());
    }

    #[test]
    fn test_query_only_difference_is_a_collision() {
        let mut graph = AssetGraph::new("file:///site/").unwrap();
        graph
            .add_asset(AssetSpec::file("a.css?v=1", AssetType::Css).body("one"))
            .unwrap();
        graph
            .add_asset(AssetSpec::file("a.css?v=2", AssetType::Css).body("two"))
            .unwrap();

        let dir = TempDir::new().unwrap();
        let err = write_output(&graph, dir.path()).unwrap_err();

        let Error::OutputCollision { path, first, second } = err else {
            panic!("expected an output collision");
        };
        assert_eq!(path, PathBuf::from("a.css"));
        assert_eq!(first.query(), Some("v=1"));
        assert_eq!(second.query(), Some("v=2"));
        assert!(!dir.path().join("a.css").exists());
    }
}
