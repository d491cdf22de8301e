//! dijetplot CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use dj_hist::{BinnedDistribution, Histogram, binning, find_histogram, read_histograms};
use std::path::{Path, PathBuf};

mod config;

#[derive(Parser)]
#[command(name = "dijetplot")]
#[command(about = "dijetplot - dijet histogram toys and comparison artifacts")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a weighted histogram into its effective number of entries
    EffectiveEntries {
        /// Input histogram file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Histogram name inside the file
        #[arg(long)]
        hist: String,

        /// Output histogram name (default: `<hist>_neff`)
        #[arg(long)]
        name: Option<String>,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resample scaled MC into data-like histograms
    DataLike {
        /// File holding the effective-entries histogram
        #[arg(long)]
        effective: Option<PathBuf>,

        /// Name of the effective-entries histogram (or of the weighted
        /// histogram to convert, with `--from-scaled`)
        #[arg(long)]
        effective_hist: String,

        /// Compute effective entries from `--effective-hist` in the scaled file
        #[arg(long, default_value_t = false)]
        from_scaled: bool,

        /// File holding the scaled histograms
        #[arg(long)]
        scaled: PathBuf,

        /// Scaled histogram(s) to resample
        #[arg(long = "hist", required = true, num_args = 1..)]
        hists: Vec<String>,

        /// Job seed; bin seeds are `round(center + job_seed * 1e5)`
        #[arg(long, default_value_t = dj_toys::DEFAULT_JOB_SEED)]
        job_seed: u64,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate Poisson pseudo-data from a prediction
    PseudoData {
        /// Input histogram file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Histogram name inside the file
        #[arg(long)]
        hist: String,

        /// Output histogram name (default: `<hist>_pseudodata`)
        #[arg(long)]
        name: Option<String>,

        /// Seed
        #[arg(long, default_value_t = dj_toys::DEFAULT_PSEUDO_DATA_SEED)]
        seed: u64,

        /// Number of toys (toy i uses seed + i)
        #[arg(long, default_value_t = 1)]
        toys: usize,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rebin a histogram by a factor or onto a named binning
    Rebin {
        /// Input histogram file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Histogram name inside the file
        #[arg(long)]
        hist: String,

        /// Merge this many consecutive bins
        #[arg(long, conflicts_with = "preset", required_unless_present = "preset")]
        factor: Option<usize>,

        /// Named mass binning (see `binning --list`)
        #[arg(long)]
        preset: Option<String>,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the edges of a named binning
    Binning {
        /// Mass binning name, `chi`, or `chi_mass[_<option>]` for the chi mass windows
        #[arg(required_unless_present = "list")]
        preset: Option<String>,

        /// List known binnings
        #[arg(long, default_value_t = false)]
        list: bool,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a data/MC comparison artifact from a plot config
    Compare {
        /// Plot config (YAML, or JSON by extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::EffectiveEntries { input, hist, name, output } => {
            cmd_effective_entries(&input, &hist, name, output.as_ref())
        }
        Commands::DataLike {
            effective,
            effective_hist,
            from_scaled,
            scaled,
            hists,
            job_seed,
            output,
        } => cmd_data_like(
            effective.as_deref(),
            &effective_hist,
            from_scaled,
            &scaled,
            &hists,
            job_seed,
            output.as_ref(),
        ),
        Commands::PseudoData { input, hist, name, seed, toys, output } => {
            cmd_pseudo_data(&input, &hist, name, seed, toys, output.as_ref())
        }
        Commands::Rebin { input, hist, factor, preset, output } => {
            cmd_rebin(&input, &hist, factor, preset.as_deref(), output.as_ref())
        }
        Commands::Binning { preset, list, output } => cmd_binning(preset.as_deref(), list, output.as_ref()),
        Commands::Compare { config, output } => cmd_compare(&config, output.as_ref()),
        Commands::Version => {
            println!("dijetplot {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_histogram(path: &Path, name: &str) -> Result<Histogram> {
    let hists = read_histograms(path)?;
    let h = find_histogram(&hists, name)?.clone();
    tracing::info!(file = %path.display(), hist = name, bins = h.n_bins(), "histogram loaded");
    Ok(h)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

fn cmd_effective_entries(
    input: &Path,
    hist: &str,
    name: Option<String>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let h = load_histogram(input, hist)?;
    let name = name.unwrap_or_else(|| format!("{hist}_neff"));
    let neff = h.effective_entries(name);
    write_json(output, serde_json::json!({ "histograms": [neff] }))
}

fn cmd_data_like(
    effective: Option<&Path>,
    effective_hist: &str,
    from_scaled: bool,
    scaled: &Path,
    hists: &[String],
    job_seed: u64,
    output: Option<&PathBuf>,
) -> Result<()> {
    let scaled_hists = read_histograms(scaled)?;
    let eff = match (from_scaled, effective) {
        (true, _) => {
            find_histogram(&scaled_hists, effective_hist)?.effective_entries(format!("{effective_hist}_neff"))
        }
        (false, Some(path)) => load_histogram(path, effective_hist)?,
        (false, None) => anyhow::bail!("--effective is required unless --from-scaled is given"),
    };

    let targets = hists
        .iter()
        .map(|n| find_histogram(&scaled_hists, n).cloned())
        .collect::<dj_core::Result<Vec<Histogram>>>()?;
    let names: Vec<String> = hists.iter().map(|n| format!("{n}_datalike")).collect();

    let (produced, warnings) = if targets.len() == 1 {
        let out = dj_toys::data_like_with_report(&eff, &targets[0], &names[0], job_seed)?;
        (vec![out.histogram], out.warnings)
    } else {
        let out = dj_toys::data_like_batch_with_report(&eff, &targets, &names, job_seed)?;
        (out.histograms, out.warnings)
    };

    let mut histograms = Vec::new();
    let mut skipped = Vec::new();
    for (name, h) in names.iter().zip(produced) {
        match h {
            Some(h) => histograms.push(h),
            None => {
                tracing::warn!(histogram = %name, "no bin could be resampled");
                skipped.push(name.clone());
            }
        }
    }

    write_json(
        output,
        serde_json::json!({
            "job_seed": job_seed,
            "effective": eff.name,
            "histograms": histograms,
            "skipped": skipped,
            "warnings": warnings,
        }),
    )
}

fn cmd_pseudo_data(
    input: &Path,
    hist: &str,
    name: Option<String>,
    seed: u64,
    toys: usize,
    output: Option<&PathBuf>,
) -> Result<()> {
    if toys == 0 {
        anyhow::bail!("--toys must be at least 1");
    }
    let h = load_histogram(input, hist)?;
    let out = if toys == 1 {
        let name = name.unwrap_or_else(|| format!("{hist}_pseudodata"));
        vec![dj_toys::pseudo_data(&h, &name, seed)?]
    } else {
        dj_toys::pseudo_data_toys(&h, toys, seed)?
    };
    write_json(output, serde_json::json!({ "seed": seed, "histograms": out }))
}

fn cmd_rebin(
    input: &Path,
    hist: &str,
    factor: Option<usize>,
    preset: Option<&str>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let h = load_histogram(input, hist)?;
    let out = match (factor, preset) {
        (Some(f), _) => h.rebin(f)?,
        (None, Some(p)) => h.rebin_to(&binning::mass_bins(p)?)?,
        (None, None) => anyhow::bail!("one of --factor or --preset is required"),
    };
    write_json(output, serde_json::json!({ "histograms": [out] }))
}

fn cmd_binning(preset: Option<&str>, list: bool, output: Option<&PathBuf>) -> Result<()> {
    if list {
        let mut known: Vec<&str> = binning::MASS_PRESETS.to_vec();
        known.extend(["chi", "chi_mass", "chi_mass_13TeV", "chi_mass_8TeV", "chi_mass_Week1"]);
        return write_json(output, serde_json::json!({ "binnings": known }));
    }
    let Some(preset) = preset else {
        anyhow::bail!("a binning name is required");
    };
    let edges = match preset.strip_prefix("chi_mass") {
        Some(opt) => binning::chi_mass_bins(opt),
        None if preset == "chi" => binning::chi_bins(),
        None => binning::mass_bins(preset)?,
    };
    write_json(
        output,
        serde_json::json!({ "binning": preset, "n_bins": edges.len() - 1, "bin_edges": edges }),
    )
}

fn cmd_compare(config_path: &Path, output: Option<&PathBuf>) -> Result<()> {
    let cfg = config::read_plot_config(config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let (samples, mut inputs) = config::load_samples(&cfg, base_dir)?;
    inputs.insert(0, config::input_meta(config_path)?);

    let options = dj_viz::ComparisonOptions {
        normalization: cfg.normalization,
        stack: cfg.stack,
        ratio: cfg.ratio,
    };
    let mut artifact = dj_viz::build_comparison(samples, &options)?;
    artifact.meta.inputs = inputs;
    write_json(output, serde_json::to_value(&artifact)?)
}
