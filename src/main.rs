use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};

use sansnd::analysis::stats::{self, Histogram};
use sansnd::core::model::{ModelParameters, SansModel};
use sansnd::engine::curve::geomspace;
use sansnd::engine::evaluator::ScatteringEvaluator;
use sansnd::engine::sampler;
use sansnd::interface::{config, plugin};

// --- CLI Definitions ---

#[derive(Parser, Debug)]
#[command(author, version, about = "SANSND: SANS model evaluation & scattering-angle sampling", long_about = None)]
struct Cli {
    /// Expected scattering module identity, checked before any work
    #[arg(long, default_value = plugin::PLUGIN_NAME)]
    expect_plugin: String,

    #[command(flatten)]
    model: ModelArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct ModelArgs {
    /// JSON file describing the model (overrides the flags below)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Two-column I(Q) table file (overrides the sphere flags)
    #[arg(long)]
    table: Option<PathBuf>,

    /// Sphere radius (Å)
    #[arg(long)]
    radius: Option<f64>,

    /// Sphere scattering-length density
    #[arg(long, default_value_t = 1.0)]
    sld: f64,

    /// Solvent scattering-length density
    #[arg(long, default_value_t = 0.0)]
    sld_solvent: f64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the total cross-section over a log-spaced energy range
    Xs {
        /// Lowest incident energy (eV)
        #[arg(long, default_value_t = 1e-5)]
        emin: f64,
        /// Highest incident energy (eV)
        #[arg(long, default_value_t = 1.0)]
        emax: f64,
        #[arg(long, default_value_t = 200)]
        points: usize,
        /// Output CSV path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scan the scattering intensity I(Q) over a log-spaced Q range
    Iq {
        /// Lowest momentum transfer (1/Å)
        #[arg(long, default_value_t = 1e-4)]
        qmin: f64,
        /// Highest momentum transfer (1/Å)
        #[arg(long, default_value_t = 1.0)]
        qmax: f64,
        #[arg(long, default_value_t = 200)]
        points: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Draw scattering-angle cosines at one incident energy
    Sample {
        /// Incident energy (eV)
        #[arg(long, default_value_t = 1e-3)]
        ekin: f64,
        #[arg(long, default_value_t = 1000)]
        count: usize,
        #[arg(long, default_value_t = sampler::DEFAULT_SEED)]
        seed: u64,
        /// Histogram the samples into this many bins (0 = raw values)
        #[arg(long, default_value_t = 0)]
        bins: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// --- Model construction ---

fn build_model(args: &ModelArgs) -> Result<SansModel> {
    let params = if let Some(path) = &args.config {
        config::load_model_parameters(path)
            .with_context(|| format!("loading model config {}", path.display()))?
    } else if let Some(path) = &args.table {
        ModelParameters::Table { path: path.clone() }
    } else if let Some(radius) = args.radius {
        ModelParameters::Sphere {
            radius,
            sld: args.sld,
            sld_solvent: args.sld_solvent,
        }
    } else {
        return Err(anyhow!(
            "no model given; pass --config, --table or --radius (see --help)"
        ));
    };
    SansModel::new(params).context("model construction failed")
}

fn csv_writer(output: Option<&PathBuf>) -> Result<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    Ok(csv::Writer::from_writer(sink))
}

// --- Main ---

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    // Pre-flight: make sure the right scattering module is loaded.
    plugin::register();
    plugin::verify_identity(&cli.expect_plugin)?;

    let model = build_model(&cli.model)?;
    log::info!("model: {:?}", model.params());
    let evaluator = ScatteringEvaluator::new(model)?;

    match &cli.command {
        Command::Xs {
            emin,
            emax,
            points,
            output,
        } => {
            if !(*emin > 0.0 && emax > emin && *points >= 2) {
                return Err(anyhow!("need 0 < emin < emax and at least 2 points"));
            }
            let energies = geomspace(*emin, *emax, *points);
            let direct = evaluator.cross_section_many(&energies)?;
            let from_iq = evaluator.cross_section_from_intensity_many(&energies)?;

            let mut wtr = csv_writer(output.as_ref())?;
            wtr.write_record(["ekin_ev", "xs", "xs_from_iq"])?;
            for ((e, d), h) in energies.iter().zip(&direct).zip(&from_iq) {
                wtr.write_record(&[format!("{e:.8e}"), format!("{d:.8e}"), format!("{h:.8e}")])?;
            }
            wtr.flush()?;
        }

        Command::Iq {
            qmin,
            qmax,
            points,
            output,
        } => {
            if !(*qmin > 0.0 && qmax > qmin && *points >= 2) {
                return Err(anyhow!("need 0 < qmin < qmax and at least 2 points"));
            }
            let q_values = geomspace(*qmin, *qmax, *points);
            let intensities = evaluator.intensity_many(&q_values)?;

            let mut wtr = csv_writer(output.as_ref())?;
            wtr.write_record(["q_invaa", "intensity"])?;
            for (q, i) in q_values.iter().zip(&intensities) {
                wtr.write_record(&[format!("{q:.8e}"), format!("{i:.8e}")])?;
            }
            wtr.flush()?;
        }

        Command::Sample {
            ekin,
            count,
            seed,
            bins,
            output,
        } => {
            let mut rng = sampler::seeded_rng(*seed);
            log::info!(
                "incident wavelength {:.4} Å",
                sansnd::core::constants::ekin_to_wavelength(*ekin)
            );
            let mu = evaluator.sample_mu_many(&mut rng, *ekin, *count)?;
            log::info!(
                "sampled {} mu values at ekin = {:.4e} eV: mean {:.6}, std {:.6}",
                count,
                ekin,
                stats::mean(&mu),
                stats::variance(&mu).sqrt()
            );

            let mut wtr = csv_writer(output.as_ref())?;
            if *bins > 0 {
                let mut hist = Histogram::new(-1.0, 1.0, *bins);
                for &v in &mu {
                    hist.fill(v);
                }
                wtr.write_record(["mu_lo", "mu_hi", "count", "density"])?;
                for idx in 0..hist.counts().len() {
                    let (lo, hi) = hist.bin_edges(idx);
                    wtr.write_record(&[
                        format!("{lo:.6}"),
                        format!("{hi:.6}"),
                        hist.counts()[idx].to_string(),
                        format!("{:.8e}", hist.density(idx)),
                    ])?;
                }
            } else {
                wtr.write_record(["index", "mu"])?;
                for (idx, v) in mu.iter().enumerate() {
                    wtr.write_record(&[idx.to_string(), format!("{v:.12}")])?;
                }
            }
            wtr.flush()?;
        }
    }

    Ok(())
}
