use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mockup", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a mockup document into a PNG.
    Render(RenderArgs),
    /// Load and validate a mockup document, printing any repairs.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input mockup document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Directory relative asset paths are read from (defaults to the document's directory).
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Design image to upload into a design layer, as `<layer id>=<path>`.
    #[arg(long = "design", value_parser = parse_design_arg)]
    designs: Vec<(u32, PathBuf)>,

    /// Override the warp mesh grid size.
    #[arg(long)]
    warp_grid: Option<u32>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input mockup document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn parse_design_arg(raw: &str) -> Result<(u32, PathBuf), String> {
    let (id, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <layer id>=<path>, got '{raw}'"))?;
    let id = id
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid layer id '{id}': {e}"))?;
    Ok((id, PathBuf::from(path)))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Validate(args) => cmd_validate(args),
    }
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let doc = mockup::MockupDocument::from_path(&args.in_path)?;
    for repair in &doc.repairs {
        eprintln!("repaired {repair}");
    }
    eprintln!(
        "ok: {} layers, {} groups, canvas {}x{}",
        doc.stack.layers.len(),
        doc.stack.groups.len(),
        doc.stack.global.canvas_width,
        doc.stack.global.canvas_height
    );
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let doc = mockup::MockupDocument::from_path(&args.in_path)?;
    let assets_root = match &args.assets {
        Some(dir) => dir.clone(),
        None => args
            .in_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf(),
    };

    let mut opts = mockup::SessionOpts::from_env();
    if let Some(grid) = args.warp_grid {
        opts.render.warp.grid = grid.max(1);
    }
    let source = Arc::new(mockup::FsSource::new(assets_root));
    let mut session = mockup::MockupSession::from_document(doc, source, opts)?;

    for (id, path) in &args.designs {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read design '{}'", path.display()))?;
        session.upload_design(mockup::LayerId(*id), bytes)?;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    let committed = runtime.block_on(session.sync());
    tracing::info!(committed, "textures loaded");

    let png = session.export_png()?;
    session.shutdown();

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
