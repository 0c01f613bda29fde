//! Command-line shell over [`ViewerSession`].
//!
//! `render` opens a file, applies navigation, zoom and scripted ink strokes,
//! then writes the display and ink surfaces flattened into one PNG.
//! `gallery` pre-renders every page into a whiteboard `pdf-viewer` shape.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::annotations::PenColor;
use crate::commands::{FileSelection, ViewerCommand, ViewerSession};
use crate::config::ViewerConfig;
use crate::input::{ClientPoint, FixedLayout, PointerEvent, PointerKind};
use crate::pdf::{init_pdfium, LopdfRasterizer, PdfiumRasterizer, Rasterizer};
use crate::viewer::composite;

#[derive(Debug, Parser)]
#[command(name = "pdf-annotator")]
#[command(about = "Render PDF pages with freehand ink")]
pub struct Cli {
    /// JSON viewer configuration.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = Backend::Auto)]
    backend: Backend,

    /// Extra directories searched for the PDFium library.
    #[arg(long = "pdfium-dir", global = true, value_name = "DIR")]
    pdfium_dirs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// PDFium when it can be found, geometry otherwise.
    Auto,
    Pdfium,
    /// Blank pages at the right size; needs no native library.
    Geometry,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render one page with ink strokes to a PNG.
    Render {
        /// PDF path or file:// URL.
        #[arg(value_name = "INPUT")]
        input: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 0)]
        zoom_in: u32,
        #[arg(long, default_value_t = 0)]
        zoom_out: u32,
        /// Stroke as space-separated surface points, e.g. "10,10 80,40".
        #[arg(long = "stroke", value_name = "POINTS")]
        strokes: Vec<String>,
        #[arg(long, value_parser = parse_color)]
        color: Option<PenColor>,
        #[arg(long)]
        width: Option<u8>,
        #[arg(long, value_name = "PNG")]
        output: PathBuf,
    },
    /// Write a whiteboard pdf-viewer shape with every page embedded.
    Gallery {
        #[arg(value_name = "INPUT")]
        input: String,
        /// Gallery title; defaults to the document's own title.
        #[arg(long)]
        title: Option<String>,
        /// Output JSON file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

struct RenderArgs {
    input: PathBuf,
    page: u32,
    zoom_in: u32,
    zoom_out: u32,
    strokes: Vec<Vec<(f32, f32)>>,
    color: Option<PenColor>,
    width: Option<u8>,
    output: PathBuf,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ViewerConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let use_pdfium = select_backend(cli.backend, &cli.pdfium_dirs)?;

    match cli.command {
        Commands::Render { input, page, zoom_in, zoom_out, strokes, color, width, output } => {
            let args = RenderArgs {
                input: resolve_input(&input)?,
                page,
                zoom_in,
                zoom_out,
                strokes: strokes.iter().map(|s| parse_stroke(s)).collect::<Result<_>>()?,
                color,
                width,
                output,
            };
            if use_pdfium {
                runtime.block_on(run_render(PdfiumRasterizer::new()?, config, args))
            } else {
                runtime.block_on(run_render(LopdfRasterizer::new(), config, args))
            }
        }
        Commands::Gallery { input, title, output } => {
            let input = resolve_input(&input)?;
            if use_pdfium {
                runtime.block_on(run_gallery(PdfiumRasterizer::new()?, config, &input, title, output))
            } else {
                runtime.block_on(run_gallery(LopdfRasterizer::new(), config, &input, title, output))
            }
        }
    }
}

fn select_backend(backend: Backend, pdfium_dirs: &[PathBuf]) -> Result<bool> {
    match backend {
        Backend::Geometry => Ok(false),
        Backend::Pdfium => {
            init_pdfium(pdfium_dirs).context("PDFium backend requested but unavailable")?;
            Ok(true)
        }
        Backend::Auto => match init_pdfium(pdfium_dirs) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(error = %e, "PDFium unavailable, falling back to geometry backend");
                Ok(false)
            }
        },
    }
}

async fn run_render<R: Rasterizer>(rasterizer: R, config: ViewerConfig, args: RenderArgs) -> Result<()> {
    let (mut session, _notifications) = ViewerSession::new(rasterizer, config);

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    session.open_file(FileSelection::pdf(file_name(&args.input), bytes)).await.context("failed to load PDF")?;

    session.dispatch(ViewerCommand::GoToPage(args.page)).await;
    for _ in 0..args.zoom_in {
        session.dispatch(ViewerCommand::ZoomIn).await;
    }
    for _ in 0..args.zoom_out {
        session.dispatch(ViewerCommand::ZoomOut).await;
    }
    if let Some(color) = args.color {
        session.dispatch(ViewerCommand::SetPenColor(color)).await;
    }
    if let Some(width) = args.width {
        session.dispatch(ViewerCommand::SetPenWidth(width)).await;
    }

    // Stroke points are already surface-local.
    let layout = FixedLayout(ClientPoint::new(0.0, 0.0));
    for stroke in &args.strokes {
        for (i, &(x, y)) in stroke.iter().enumerate() {
            let kind = if i == 0 { PointerKind::Down } else { PointerKind::Move };
            session.pointer(PointerEvent::new(kind, x, y), &layout);
        }
        session.pointer(PointerEvent::new(PointerKind::Up, 0.0, 0.0), &layout);
    }

    let controller = session.controller();
    let flattened = composite(controller.display(), controller.overlay().surface());
    flattened
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(output = %args.output.display(), "snapshot written");

    println!("{}", serde_json::to_string_pretty(&session.shell_state())?);
    Ok(())
}

async fn run_gallery<R: Rasterizer>(
    rasterizer: R,
    config: ViewerConfig,
    input: &Path,
    title: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let (session, _notifications) = ViewerSession::new(rasterizer, config);
    let bytes = std::fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;

    let shape = session.gallery_shape(bytes, title).await.context("failed to load PDF")?;
    let json = serde_json::to_string_pretty(&shape)?;

    match output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
            info!(output = %path.display(), pages = shape.props.pages.len(), "gallery written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "document.pdf".to_string())
}

fn parse_color(value: &str) -> Result<PenColor, String> {
    PenColor::from_hex(value).map_err(|e| {
        let palette: Vec<&str> = PenColor::PALETTE.iter().map(|c| c.hex()).collect();
        format!("{e}; expected one of {}", palette.join(", "))
    })
}

/// Parse `"x,y x,y ..."` into surface points.
fn parse_stroke(value: &str) -> Result<Vec<(f32, f32)>> {
    value
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(',').with_context(|| format!("expected x,y but got {pair:?}"))?;
            let x = x.trim().parse::<f32>().with_context(|| format!("bad x coordinate in {pair:?}"))?;
            let y = y.trim().parse::<f32>().with_context(|| format!("bad y coordinate in {pair:?}"))?;
            Ok((x, y))
        })
        .collect()
}

/// Check if a path is a readable PDF file (by extension).
fn is_pdf_file(path: &Path) -> bool {
    path.is_file()
        && path.extension().map(|ext| ext.eq_ignore_ascii_case("pdf")).unwrap_or(false)
}

/// Turn a command-line argument into a PDF path. Accepts plain paths,
/// `file://` URLs and percent-encoded paths.
fn resolve_input(arg: &str) -> Result<PathBuf> {
    let direct = PathBuf::from(arg);
    if is_pdf_file(&direct) {
        return Ok(direct);
    }

    if arg.starts_with("file://") {
        let url = url::Url::parse(arg).with_context(|| format!("invalid file URL {arg}"))?;
        let path = url.to_file_path().map_err(|()| anyhow::anyhow!("URL {arg} is not a local file"))?;
        if is_pdf_file(&path) {
            return Ok(path);
        }
        anyhow::bail!("{} is not a PDF file", path.display());
    }

    if let Ok(decoded) = urlencoding::decode(arg) {
        let path = PathBuf::from(decoded.into_owned());
        if is_pdf_file(&path) {
            return Ok(path);
        }
    }

    anyhow::bail!("{arg} is not a PDF file")
}
