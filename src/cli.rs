// ============================================================================
// Instafilter CLI: batch filtering and the interactive shell
// ============================================================================
//
// Usage examples:
//   instafilter -i photo.jpg -o sepia.png                       (default filter)
//   instafilter -i photo.jpg --filter pixellate --scale 25 -o out.png
//   instafilter -i "shots/*.jpg" -f vignette --intensity 0.8 --output-dir out/
//   instafilter --interactive
//   instafilter --list-filters
//
// Every input goes through one FilterSession: each file is picked, filtered
// with the current settings and saved before the next one is picked.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Instant;

use clap::Parser;
use log::LevelFilter;

use crate::config::Config;
use crate::filter::{FilterParameters, FilterVariant, ParameterSlot};
use crate::io::SaveFormat;
use crate::library::{AlbumLibrary, FileTarget, PhotoLibrary};
use crate::logger;
use crate::ops::{CpuTransform, ImageTransform};
use crate::picker::{FilePicker, ImagePicker, PickOutcome};
use crate::session::{FilterSession, RecomputeOutcome};
use crate::shell::Shell;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Instafilter photo filter.
#[derive(Parser, Debug)]
#[command(
    name = "instafilter",
    version,
    about = "Apply photo filters from the command line",
    long_about = "Apply one of seven photo filters (Sepia Tone, Crystallize, Edges,\n\
                  Gaussian Blur, Pixellate, Unsharp Mask, Vignette) to image files,\n\
                  or explore them in an interactive shell.\n\n\
                  Example:\n  \
                  instafilter -i photo.jpg --filter pixellate --scale 25 -o out.png\n  \
                  instafilter -i \"*.jpg\" -f vignette --output-dir out/ --format jpeg"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(
        short,
        long,
        num_args = 1..,
        required_unless_present_any = ["interactive", "list_filters"]
    )]
    pub input: Vec<String>,

    /// Filter to apply. Defaults to the configured filter (Sepia Tone).
    #[arg(short, long, value_name = "FILTER")]
    pub filter: Option<FilterVariant>,

    /// Intensity slider, 0–1.
    #[arg(long, value_name = "0-1")]
    pub intensity: Option<f32>,

    /// Radius slider in pixels.
    #[arg(long, value_name = "PX")]
    pub radius: Option<f32>,

    /// Scale slider in pixels.
    #[arg(long, value_name = "PX")]
    pub scale: Option<f32>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE", conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing. Files are named
    /// `<stem>_<filter>.<ext>`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, bmp, tga, tiff.
    /// When omitted, inferred from --output's extension, then from the config.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<SaveFormat>,

    /// JPEG quality.
    #[arg(short, long, value_name = "1-100", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Config file. Defaults to the platform config file when it exists.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Start the interactive shell.
    #[arg(long, conflicts_with_all = ["input", "output", "output_dir"])]
    pub interactive: bool,

    /// Print the filter menu and exit.
    #[arg(long)]
    pub list_filters: bool,

    /// Echo the log to stderr and print per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Session defaults: config values overridden by flags.
    fn session_defaults(&self, config: &Config) -> (FilterVariant, FilterParameters) {
        let variant = self.filter.unwrap_or(config.session.filter);
        let mut params = config.session.parameters();
        for (slot, value) in [
            (ParameterSlot::Intensity, self.intensity),
            (ParameterSlot::Radius, self.radius),
            (ParameterSlot::Scale, self.scale),
        ] {
            if let Some(v) = value {
                params.set(slot, slot.clamp_to_ui(v));
            }
        }
        (variant, params)
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the CLI and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    logger::init(level, args.verbose);

    if args.list_filters {
        print_filter_list();
        return ExitCode::SUCCESS;
    }

    let config = match Config::resolve(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (variant, params) = args.session_defaults(&config);
    let session = FilterSession::with_defaults(CpuTransform, variant, params);

    if args.interactive {
        return run_interactive(session, &config, &args);
    }

    run_batch(session, &config, &args)
}

fn print_filter_list() {
    for variant in FilterVariant::MENU {
        let slots: Vec<&str> = variant.slots().iter().map(|s| s.name()).collect();
        println!("{:<14} {:<14} {}", variant.slug(), variant.label(), slots.join(", "));
    }
}

fn run_interactive(
    session: FilterSession<CpuTransform>,
    config: &Config,
    args: &CliArgs,
) -> ExitCode {
    let format = args.format.unwrap_or(config.output.format);
    let quality = args.quality.unwrap_or(config.output.quality);
    let album = AlbumLibrary::new(config.output.album_dir(), format, quality);
    let picker = FilePicker::new(config.picker.max_pixels);
    log::info!("interactive session, album at {}", album.dir().display());

    let mut shell = Shell::new(session, picker, album);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    match shell.run(stdin.lock(), &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Batch mode
// ============================================================================

fn run_batch(
    mut session: FilterSession<CpuTransform>,
    config: &Config,
    args: &CliArgs,
) -> ExitCode {
    // Resolve glob patterns / literal paths → concrete PathBufs
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let format = args
        .format
        .or_else(|| args.output.as_deref().and_then(SaveFormat::from_path))
        .unwrap_or(config.output.format);
    let quality = args.quality.unwrap_or(config.output.quality);

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;
    let mut picker = FilePicker::with_paths(inputs.iter().cloned(), config.picker.max_pixels);
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    log::info!(
        "batch: {} file(s), {} {:?}",
        total,
        session.label(),
        session.parameters().applied_to(session.variant())
    );

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            session.variant(),
            format,
        ) else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            // Keep the picker queue aligned with `inputs`.
            let _ = pick_blocking(&mut picker);
            continue;
        };

        let output_path = claim_output_path(output_path, &mut claimed);
        let target = FileTarget::new(&output_path, format, quality);
        match run_one(&mut session, &mut picker, &target) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

/// Pick the next queued file, filter it and write it to `target`.
fn run_one<T, P, L>(
    session: &mut FilterSession<T>,
    picker: &mut P,
    target: &L,
) -> Result<(), String>
where
    T: ImageTransform,
    P: ImagePicker,
    L: PhotoLibrary,
{
    match session.handle_pick(pick_blocking(picker)) {
        None => return Err("could not load image (see log)".to_string()),
        // The session would keep the previous file's output; never save that.
        Some(RecomputeOutcome::NoOutput) => {
            return Err(format!("{} produced no output", session.label()));
        }
        Some(_) => {}
    }

    let (tx, rx) = mpsc::channel();
    session
        .request_save_with(target, move |result| {
            let _ = tx.send(result.as_ref().map(|_| ()).map_err(|e| e.to_string()));
        })
        .map_err(|e| e.to_string())?;

    rx.recv()
        .map_err(|_| "save worker exited without reporting".to_string())?
}

/// Present the picker and wait for its single outcome.
pub(crate) fn pick_blocking<P: ImagePicker + ?Sized>(picker: &mut P) -> PickOutcome {
    let (tx, rx) = mpsc::channel();
    picker.present(Box::new(move |outcome| {
        let _ = tx.send(outcome);
    }));
    rx.recv().unwrap_or(PickOutcome::Dismissed)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand every pattern and keep the first occurrence of each file, in
/// argument order. Glob matches are sorted so runs are reproducible.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut resolved = Vec::new();

    for pattern in patterns {
        let matches = match expand_pattern(pattern) {
            Ok(matches) => matches,
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
                continue;
            }
        };
        if matches.is_empty() {
            eprintln!("warning: pattern '{}' matched no files.", pattern);
        }
        for path in matches {
            if seen.insert(path.clone()) {
                resolved.push(path);
            }
        }
    }

    log::debug!("{} pattern(s) resolved to {} file(s)", patterns.len(), resolved.len());
    resolved
}

/// A path that exists is taken literally, even if it contains glob syntax.
fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>, glob::PatternError> {
    let literal = PathBuf::from(pattern);
    if literal.is_file() {
        return Ok(vec![literal]);
    }
    let mut matches: Vec<PathBuf> = glob::glob(pattern)?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    matches.sort();
    Ok(matches)
}

/// Give `path` a `_2`, `_3`, … suffix when an earlier input in this run
/// already maps to it.
fn claim_output_path(path: PathBuf, claimed: &mut HashSet<PathBuf>) -> PathBuf {
    if claimed.insert(path.clone()) {
        return path;
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut n = 2;
    loop {
        let name = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        let candidate = parent.join(name);
        if claimed.insert(candidate.clone()) {
            eprintln!(
                "warning: '{}' is already an output of this run; writing '{}' instead.",
                path.display(),
                candidate.display()
            );
            return candidate;
        }
        n += 1;
    }
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (`<dir>/<stem>_<filter>.<ext>`)
/// 3. Fallback: next to the input, `<stem>_<filter>.<ext>`
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    variant: FilterVariant,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();
    let name = format!("{}_{}.{}", stem, variant.slug(), format.extension());

    if let Some(dir) = output_dir {
        return Some(dir.join(name));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(name))
}
