//! `lib-assets` command line: inspect naming and extraction, or rerun the rewrite phase.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lib_assets::asset_paths::{DEFAULT_NAME_TEMPLATE, NameSource, NamingOracle, split_query, to_slash};
use lib_assets::css::CssReferenceExtractor;
use lib_assets::descriptor::{BlockParser, CompilerAdapter};
use lib_assets::bundle::load_manifest;
use lib_assets::{BuildSession, BundleRewriter, OutputBundle, OutputFile, Options, ResolvedConfig};
use tracing_subscriber::EnvFilter;

/// Library asset pipeline tools
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Print the output filename an asset would be emitted under
  Name {
    /// Asset file, optionally followed by `?query`
    file: String,
    /// Naming template
    #[arg(short, long, default_value = DEFAULT_NAME_TEMPLATE)]
    template: String,
    /// Project root used for the `[path]` token
    #[arg(short, long, default_value = ".", value_hint = clap::ValueHint::DirPath)]
    root: PathBuf,
  },

  /// Print the asset references found in a stylesheet or component file
  Scan {
    /// Stylesheet or component file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    file: PathBuf,
  },

  /// Rewrite asset references in an already written output directory
  Rewrite {
    /// Build output directory
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    out_dir: PathBuf,
    /// Asset manifest saved by the build
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    manifest: PathBuf,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_target(false)
    .init();

  match Cli::parse().command {
    Commands::Name {
      file,
      template,
      root,
    } => name(&file, &template, &root),
    Commands::Scan { file } => scan(&file).await,
    Commands::Rewrite { out_dir, manifest } => rewrite(&out_dir, &manifest).await,
  }
}

fn name(file: &str, template: &str, root: &Path) -> Result<()> {
  let (path, query) = split_query(file);
  let content = fs::read(path).with_context(|| format!("failed to read {path}"))?;
  let root = fs::canonicalize(root).with_context(|| format!("failed to resolve {}", root.display()))?;
  let resource = fs::canonicalize(path).with_context(|| format!("failed to resolve {path}"))?;
  let resource = to_slash(&resource);

  let oracle = NamingOracle::new(template, root);
  println!(
    "{}",
    oracle.file_name(&NameSource {
      resource_path: &resource,
      resource_query: query,
      content: &content,
    })
  );
  Ok(())
}

async fn scan(file: &Path) -> Result<()> {
  let file = fs::canonicalize(file).with_context(|| format!("failed to resolve {}", file.display()))?;
  let root = std::env::current_dir().context("failed to read the current directory")?;
  let session = BuildSession::new(ResolvedConfig::library(root), &Options::default())?
    .with_compiler(CompilerAdapter::V3(Arc::new(BlockParser)));

  let id = to_slash(&file);
  for reference in CssReferenceExtractor::new(&session).raw_references(&id).await? {
    println!("{reference}");
  }
  Ok(())
}

async fn rewrite(out_dir: &Path, manifest_path: &Path) -> Result<()> {
  let manifest = load_manifest(manifest_path)?;

  let mut bundle = OutputBundle::new();
  collect_outputs(out_dir, out_dir, &mut bundle)?;

  let report = BundleRewriter::from_manifest(&manifest, out_dir)
    .run(&bundle)
    .await?;
  for name in report.written {
    println!("{name}");
  }
  Ok(())
}

fn collect_outputs(base: &Path, dir: &Path, bundle: &mut OutputBundle) -> Result<()> {
  for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
    let path = entry?.path();
    if path.is_dir() {
      collect_outputs(base, &path, bundle)?;
      continue;
    }
    let Ok(relative) = path.strip_prefix(base) else {
      continue;
    };
    let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    bundle.insert(to_slash(relative), OutputFile::Binary(bytes));
  }
  Ok(())
}
