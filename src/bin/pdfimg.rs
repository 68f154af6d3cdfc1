//! CLI binary for edgequake-pdfimg.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RasterConfig` / `ComposeConfig` and writes results to disk.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdfimg::pipeline::input::read_pdf;
use edgequake_pdfimg::{
    archive_name_for, inspect_with, render_stream, write_archive, write_atomic, write_pages,
    ComposeConfig, ComposeSession, ConversionProgressCallback, ConversionRun, DecodePolicy,
    PageSelection, PageSize, PdfiumEngine, ProgressCallback, RasterConfig, SourceImage,
    DEFAULT_PDF_NAME,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per item. `unit` names the items
/// ("pages" when rasterising, "images" when composing).
struct CliProgressCallback {
    bar: ProgressBar,
    unit: &'static str,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the total.
    fn new_dynamic(unit: &'static str, opening: &str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message(opening.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            unit,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let template = format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  \
             [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {}  \
             ⏱ {{elapsed_precise}}  ETA {{eta_precise}}",
            self.unit
        );
        let progress_style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    fn elapsed_ms(&self, num: usize) -> u128 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&num))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }

    /// Stop the bar without the summary line, e.g. when the run aborts.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total} {}…", self.unit))
        ));
    }

    fn on_page_start(&self, num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(num, Instant::now());
        }
        self.bar.set_message(format!("#{num}"));
    }

    fn on_page_complete(&self, num: usize, total: usize, bytes: usize) {
        let elapsed_ms = self.elapsed_ms(num);
        self.bar.println(format!(
            "  {} #{:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            num,
            total,
            dim(&format!("{:>7.1} KB", bytes as f64 / 1024.0)),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, num: usize, total: usize, error: &str) {
        let elapsed_ms = self.elapsed_ms(num);

        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} #{:>3}/{:<3}  {}  {}",
            red("✗"),
            num,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} {} converted",
                green("✔"),
                bold(&success_count.to_string()),
                self.unit
            );
        } else {
            eprintln!(
                "{} {}/{} {} converted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                self.unit,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every page of a PDF as page_<n>.jpg in the current directory
  pdfimg to-images report.pdf

  # Pages 1-5 at 3x scale, bundled into out/report_images.zip
  pdfimg to-images report.pdf -o out --zip --pages 1-5 --scale 3

  # Images to one PDF (A4 portrait, one image per page)
  pdfimg to-pdf scan1.jpg scan2.png scan3.jpg -o scans.pdf

  # US Letter landscape, skipping files that are not images
  pdfimg to-pdf *.jpg --page-size letter --landscape --skip-invalid

  # Page count and page sizes as JSON
  pdfimg inspect report.pdf --json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (otherwise ./ then the system library path)
  RUST_LOG          Log filter, e.g. RUST_LOG=edgequake_pdfimg=debug
  PDFIMG_*          Fallback for most flags, e.g. PDFIMG_SCALE=3
"#;

/// Convert PDF pages to JPEG images and JPEG/PNG images to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "pdfimg",
    version,
    about = "Convert PDF pages to JPEG images, and JPEG/PNG images to PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFIMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFIMG_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFIMG_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every page of a PDF to a JPEG image.
    ToImages(ToImagesArgs),
    /// Combine JPEG/PNG images into one PDF, one image per page.
    ToPdf(ToPdfArgs),
    /// Print page count and page sizes without rendering.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct ToImagesArgs {
    /// PDF file to convert.
    input: PathBuf,

    /// Directory for the JPEG files (or the ZIP archive with --zip).
    #[arg(short, long, env = "PDFIMG_OUTPUT_DIR", default_value = ".")]
    output: PathBuf,

    /// Bundle the pages into <name>_images.zip instead of loose files.
    #[arg(long, env = "PDFIMG_ZIP")]
    zip: bool,

    /// Render scale relative to the page's nominal size (0.1–10).
    #[arg(long, env = "PDFIMG_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// JPEG quality (1–100).
    #[arg(long, env = "PDFIMG_QUALITY", default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDFIMG_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFIMG_PASSWORD")]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct ToPdfArgs {
    /// Images in page order (JPEG or PNG).
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Output PDF path.
    #[arg(short, long, env = "PDFIMG_OUTPUT", default_value = DEFAULT_PDF_NAME)]
    output: PathBuf,

    /// Page size: a4, letter, or WIDTHxHEIGHT in points (e.g. 420x595).
    #[arg(long, env = "PDFIMG_PAGE_SIZE", default_value = "a4")]
    page_size: String,

    /// Turn pages on their side.
    #[arg(long, env = "PDFIMG_LANDSCAPE")]
    landscape: bool,

    /// Leave out images that cannot be decoded instead of aborting.
    #[arg(long, env = "PDFIMG_SKIP_INVALID")]
    skip_invalid: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// PDF file to inspect.
    input: PathBuf,

    /// Output JSON instead of text.
    #[arg(long, env = "PDFIMG_JSON")]
    json: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFIMG_PASSWORD")]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would fight with the progress bar for the terminal.
    let json = matches!(&cli.command, Command::Inspect(a) if a.json);
    let show_progress = !cli.quiet && !cli.no_progress && !json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::ToImages(args) => to_images(&cli, args, show_progress).await,
        Command::ToPdf(args) => to_pdf(&cli, args, show_progress).await,
        Command::Inspect(args) => run_inspect(args).await,
    }
}

async fn to_images(cli: &Cli, args: &ToImagesArgs, show_progress: bool) -> Result<()> {
    let bytes = read_pdf(&args.input)
        .await
        .with_context(|| format!("Cannot open {}", args.input.display()))?;

    let progress = show_progress.then(|| CliProgressCallback::new_dynamic("pages", "Opening PDF…"));
    let mut builder = RasterConfig::builder()
        .scale(args.scale)
        .jpeg_quality(args.quality)
        .pages(parse_pages(&args.pages)?);
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref cb) = progress {
        builder = builder.progress_callback(cb.clone() as ProgressCallback);
    }
    let config = builder.build().context("Invalid configuration")?;

    let mut run = ConversionRun::new();
    let outcome = run.drive(render_stream(bytes, &config).await).await;
    if let Some(ref cb) = progress {
        cb.abandon();
    }
    outcome.context("Conversion failed")?;

    let attempted = run.progress().total;
    let pages = run.into_pages();
    if pages.is_empty() && attempted > 0 {
        anyhow::bail!("All {attempted} selected pages failed to render");
    }

    let destination = if args.zip {
        let path = args.output.join(archive_name_for(&args.input));
        let size = write_archive(&pages, &path)
            .await
            .context("Failed to write archive")?;
        format!("{} ({:.1} KB)", path.display(), size as f64 / 1024.0)
    } else {
        let written = write_pages(&pages, &args.output)
            .await
            .context("Failed to write pages")?;
        format!("{} files in {}", written.len(), args.output.display())
    };

    if !cli.quiet {
        eprintln!(
            "{}  {}/{} pages  →  {}",
            if pages.len() == attempted { green("✔") } else { cyan("⚠") },
            pages.len(),
            attempted,
            bold(&destination),
        );
    }
    Ok(())
}

async fn to_pdf(cli: &Cli, args: &ToPdfArgs, show_progress: bool) -> Result<()> {
    let mut page_size = parse_page_size(&args.page_size)?;
    if args.landscape {
        page_size = page_size.landscape();
    }

    let progress =
        show_progress.then(|| CliProgressCallback::new_dynamic("images", "Reading images…"));
    let mut builder = ComposeConfig::builder().page_size(page_size).on_decode_error(
        if args.skip_invalid {
            DecodePolicy::Skip
        } else {
            DecodePolicy::Abort
        },
    );
    if let Some(ref cb) = progress {
        builder = builder.progress_callback(cb.clone() as ProgressCallback);
    }
    let config = builder.build().context("Invalid configuration")?;

    let mut session = ComposeSession::new(config);
    for path in &args.images {
        let image = SourceImage::from_path(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        session.add(image)?;
    }

    let composed = session.compose().await;
    if let Some(ref cb) = progress {
        cb.abandon();
    }
    let doc = composed.context("Error generating PDF")?;

    write_atomic(&args.output, doc.data.clone())
        .await
        .context("Failed to write PDF")?;

    if !cli.quiet {
        for skipped in &doc.skipped {
            eprintln!("  {} skipped {}: {}", cyan("⚠"), skipped.name, dim(&skipped.reason));
        }
        eprintln!(
            "{}  {} pages ({:.0}x{:.0} pt)  →  {}",
            green("✔"),
            doc.page_count(),
            page_size.width,
            page_size.height,
            bold(&args.output.display().to_string()),
        );
    }
    Ok(())
}

async fn run_inspect(args: &InspectArgs) -> Result<()> {
    let bytes = read_pdf(&args.input)
        .await
        .with_context(|| format!("Cannot open {}", args.input.display()))?;
    let info = inspect_with(PdfiumEngine::bind, bytes, args.password.clone())
        .await
        .context("Failed to inspect PDF")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
        );
    } else {
        println!("File:   {}", args.input.display());
        println!("Pages:  {}", info.page_count);
        for (i, size) in info.page_sizes.iter().enumerate() {
            println!(
                "  {:>4}  {:>7.2} x {:<7.2} pt{}",
                i + 1,
                size.width,
                size.height,
                describe_size(*size)
            );
        }
    }
    Ok(())
}

fn describe_size(size: PageSize) -> &'static str {
    let same = |a: PageSize, b: PageSize| {
        (a.width - b.width).abs() < 1.0 && (a.height - b.height).abs() < 1.0
    };
    if same(size, PageSize::A4) || same(size, PageSize::A4.landscape()) {
        "  (A4)"
    } else if same(size, PageSize::LETTER) || same(size, PageSize::LETTER.landscape()) {
        "  (Letter)"
    } else {
        ""
    }
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start.trim().parse().context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!("Invalid page range '{}-{}': start must be <= end", start, end);
        }
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if pages.contains(&0) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got 0)");
        }
        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}

/// Parse `--page-size`: `a4`, `letter`, or `WxH` in points.
fn parse_page_size(s: &str) -> Result<PageSize> {
    match s.trim().to_lowercase().as_str() {
        "a4" => Ok(PageSize::A4),
        "letter" => Ok(PageSize::LETTER),
        custom => {
            let (w, h) = custom
                .split_once('x')
                .with_context(|| format!("Unknown page size '{s}' (use a4, letter, or WxH)"))?;
            let w: f32 = w.trim().parse().context("Invalid page width")?;
            let h: f32 = h.trim().parse().context("Invalid page height")?;
            let size = PageSize::new(w, h);
            if !size.is_valid() {
                anyhow::bail!("Page size must be positive, got {w}x{h}");
            }
            Ok(size)
        }
    }
}
