//! Hashfiles CLI - content-addressed renaming of build output
//!
//! Commands:
//! - hashfiles run <manifest>    - Relocate and fingerprint, optionally write output
//! - hashfiles order <manifest>  - Show the processing batches (dry run)
//! - hashfiles check <manifest>  - Show which assets may move, and why not

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hashfiles_core::{
    fixed_reason, load_graph, plan, process, write_output, AssetGraph, AssetId, Options, Report,
    Warning, DEFAULT_CONFIG_FILE,
};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Hashfiles - cache-busting renames for static site builds
#[derive(Parser)]
#[command(name = "hashfiles", version, about = "Content-addressed renaming of build output")]
struct Cli {
    /// Print debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relocate and fingerprint every movable asset
    Run {
        /// Graph manifest (JSON)
        manifest: PathBuf,
        #[command(flatten)]
        options: OptionArgs,
        /// Write processed files to this directory
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Write the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Show the batches the placement pass would process
    Order {
        /// Graph manifest (JSON)
        manifest: PathBuf,
    },
    /// Show which assets may be renamed
    Check {
        /// Graph manifest (JSON)
        manifest: PathBuf,
    },
}

#[derive(Args, Default)]
struct OptionArgs {
    /// Options file (default: hashfiles.json next to the manifest)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Subdirectory for relocated assets
    #[arg(long)]
    static_dir: Option<String>,
    /// CDN origin, e.g. https://cdn.example.com or //cdn.example.com
    #[arg(long)]
    cdn_root: Option<String>,
    /// Allow Flash assets onto the CDN
    #[arg(long, overrides_with = "no_cdn_flash")]
    cdn_flash: bool,
    /// Keep Flash assets off the CDN, even if the options file allows them
    #[arg(long, overrides_with = "cdn_flash")]
    no_cdn_flash: bool,
    /// Allow Html assets onto the CDN
    #[arg(long, overrides_with = "no_cdn_html")]
    cdn_html: bool,
    /// Keep Html assets off the CDN, even if the options file allows them
    #[arg(long, overrides_with = "cdn_html")]
    no_cdn_html: bool,
}

impl OptionArgs {
    /// Options file merged with command line flags; flags win.
    fn load(&self, manifest: &Path) -> Result<Options> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => manifest_dir(manifest).join(DEFAULT_CONFIG_FILE),
        };
        let options = Options::load(&path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?;
        Ok(self.apply(options))
    }

    fn apply(&self, mut options: Options) -> Options {
        if let Some(static_dir) = &self.static_dir {
            options.static_dir = static_dir.clone();
        }
        if let Some(cdn_root) = &self.cdn_root {
            options.cdn_root = Some(cdn_root.clone());
        }
        if let Some(cdn_flash) = switch(self.cdn_flash, self.no_cdn_flash) {
            options.cdn_flash = cdn_flash;
        }
        if let Some(cdn_html) = switch(self.cdn_html, self.no_cdn_html) {
            options.cdn_html = cdn_html;
        }
        options
    }
}

/// `--flag` / `--no-flag` pair; `None` when neither was given.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            manifest,
            options,
            out,
            report,
        } => {
            let options = options.load(&manifest)?;
            run(&manifest, &options, out.as_deref(), report.as_deref())?;
        }

        Commands::Order { manifest } => {
            let graph = open(&manifest)?;
            show_order(&graph);
        }

        Commands::Check { manifest } => {
            let graph = open(&manifest)?;
            show_check(&graph);
        }
    }

    Ok(())
}

fn manifest_dir(manifest: &Path) -> &Path {
    manifest.parent().unwrap_or_else(|| Path::new("."))
}

fn open(manifest: &Path) -> Result<AssetGraph> {
    load_graph(manifest).with_context(|| format!("Failed to load {}", manifest.display()))
}

/// Process a manifest, print a summary, optionally write files and report.
fn run(
    manifest: &Path,
    options: &Options,
    out: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<()> {
    println!("🔨 hashfiles run {}", manifest.display());
    let start = Instant::now();

    let mut graph = open(manifest)?;
    println!(
        "📦 {} assets, {} relations",
        graph.asset_count(),
        graph.relation_count()
    );

    let report = process(&mut graph, options)?;
    print_report(&graph, &report);

    if let Some(out) = out {
        let written = write_output(&graph, out)
            .with_context(|| format!("Failed to write output to {}", out.display()))?;
        println!("💾 Wrote {} files to {}", written.len(), out.display());
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report_json(&report))?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("📝 Report written to {}", path.display());
    }

    println!();
    let warnings = report.warnings().count();
    if warnings == 0 {
        println!("✅ Done in {:?}", start.elapsed());
    } else {
        println!("⚠️  Done with {} warnings in {:?}", warnings, start.elapsed());
    }

    Ok(())
}

fn print_report(graph: &AssetGraph, report: &Report) {
    for pass in report.passes() {
        println!();
        println!(
            "🔁 {} pass: {} moved in {} batches",
            pass.pass,
            pass.moved.len(),
            pass.batches
        );
        for moved in &pass.moved {
            println!("   • {} → {}", moved.from, moved.to);
        }
        for warning in &pass.warnings {
            println!("   ⚠️  {}", describe_warning(graph, warning));
        }
    }
}

fn describe_warning(graph: &AssetGraph, warning: &Warning) -> String {
    match warning {
        Warning::CyclicDependency { relations, .. } => {
            let edges: Vec<String> = relations
                .iter()
                .map(|&id| {
                    let relation = graph.relation(id);
                    format!(
                        "{} → {}",
                        asset_label(graph, relation.from),
                        asset_label(graph, relation.to)
                    )
                })
                .collect();
            format!("{}: {}", warning, edges.join(", "))
        }
        Warning::UrlConflict { .. } => warning.to_string(),
    }
}

fn asset_label(graph: &AssetGraph, id: AssetId) -> String {
    let owner = graph.non_inline_ancestor(id).unwrap_or(id);
    match graph.asset(owner).url() {
        Some(url) => url.to_string(),
        None => id.to_string(),
    }
}

/// Report plus the composed rename map.
fn report_json(report: &Report) -> serde_json::Value {
    serde_json::json!({
        "renames": report.rename_map(),
        "placement": report.placement,
        "hashing": report.hashing,
    })
}

fn show_order(graph: &AssetGraph) {
    println!("🕸️  Placement order (dependencies first):");
    let order = plan(graph);

    for (i, batch) in order.batches.iter().enumerate() {
        println!("   {}. {}", i + 1, join_labels(graph, batch.iter().copied()));
    }

    if let Some(cycle) = &order.cycle {
        println!();
        println!("⚠️  Cyclic dependency, left unprocessed:");
        println!("   {}", join_labels(graph, cycle.assets.iter().copied()));
    }
}

fn join_labels(graph: &AssetGraph, ids: impl Iterator<Item = AssetId>) -> String {
    ids.map(|id| asset_label(graph, id)).collect::<Vec<_>>().join(", ")
}

fn show_check(graph: &AssetGraph) {
    println!("🔍 Eligibility under {}:", graph.root());
    for id in graph.file_assets() {
        let label = asset_label(graph, id);
        match fixed_reason(graph, id) {
            None => println!("   ✓ {}", label),
            Some(reason) => println!("   ✗ {} ({})", label, reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("graph.json");
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            r#"{ "staticDir": "assets", "cdnRoot": "https://old.example.com", "cdnFlash": true }"#,
        )
        .unwrap();

        let args = OptionArgs {
            cdn_root: Some("//cdn.example.com".to_string()),
            cdn_html: true,
            ..OptionArgs::default()
        };
        let options = args.load(&manifest).unwrap();

        assert_eq!(options.static_dir, "assets");
        assert_eq!(options.cdn_root.as_deref(), Some("//cdn.example.com"));
        assert!(options.cdn_flash);
        assert!(options.cdn_html);
    }

    #[test]
    fn test_no_flags_turn_off_config_file_switches() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("graph.json");
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            r#"{ "cdnFlash": true, "cdnHtml": true }"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from(["hashfiles", "run", "graph.json", "--no-cdn-flash"]).unwrap();
        let Commands::Run { options: args, .. } = cli.command else {
            panic!("expected the run command");
        };
        let options = args.load(&manifest).unwrap();

        assert!(!options.cdn_flash);
        assert!(options.cdn_html);

        let cli = Cli::try_parse_from([
            "hashfiles",
            "run",
            "graph.json",
            "--no-cdn-html",
            "--cdn-html",
        ])
        .unwrap();
        let Commands::Run { options: args, .. } = cli.command else {
            panic!("expected the run command");
        };
        assert!(args.cdn_html);
        assert!(!args.no_cdn_html);
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let options = OptionArgs::default()
            .load(&dir.path().join("graph.json"))
            .unwrap();
        assert_eq!(options, Options::default());
    }

    #[test]
    fn test_run_writes_output_and_report() {
        let dir = TempDir::new().unwrap();
        let dist = dir.path().join("dist");
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::write(dist.join("index.html"), "<body>").unwrap();
        std::fs::write(dist.join("main.js"), "alert(1)").unwrap();

        let manifest = dir.path().join("graph.json");
        std::fs::write(
            &manifest,
            r#"{ "root": "dist",
                 "assets": [{ "url": "index.html", "initial": true }, { "url": "main.js" }],
                 "relations": [{ "from": "index.html", "to": "main.js", "type": "HtmlScript" }] }"#,
        )
        .unwrap();

        let out = dir.path().join("out");
        let report_path = dir.path().join("report.json");
        run(&manifest, &Options::default(), Some(&out), Some(&report_path)).unwrap();

        let html = std::fs::read_to_string(out.join("index.html")).unwrap();
        assert!(html.starts_with("<body><script src=\"static/main."));

        let written: Vec<_> = std::fs::read_dir(out.join("static"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(written.len(), 1);
        assert!(html.contains(&written[0]));

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(report["renames"].as_object().unwrap().len(), 1);
        assert_eq!(report["placement"]["pass"], "placement");
    }
}
