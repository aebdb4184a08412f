//! Channel alignment QC
//!
//! Reads one measurement file per bead image, computes the registration
//! metrics of every channel pair and writes the merged full and essential
//! CSV tables.
//!
//! Settings come from the settings directory (~/.chromalign by default) and
//! can be overridden on the command line. With `--save-settings` the
//! effective settings are stored for the next run.

use anyhow::{bail, Context, Result};
use chromalign::{
    AlignmentConfig, ChannelAlignmentEngine, CoincidencePolicy, ImageAlignment, ImageMeasurement,
    MicroscopeSettings, ReportWriter, SettingsStorage,
};
use clap::{Parser, ValueEnum};
use coloc_math::SearchMethod;
use log::{error, info, warn};
use microscope_optics::objective::{models, ObjectiveModel};
use std::path::{Path, PathBuf};

/// Catalogued objectives selectable from the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ObjectivePreset {
    PlanFluor5xAir,
    PlanApo20xAir,
    PlanApo40xWater,
    PlanApo60xSilicone,
    PlanApo63xOil,
    PlanApo100xOil,
}

impl ObjectivePreset {
    fn model(self) -> &'static ObjectiveModel {
        match self {
            ObjectivePreset::PlanFluor5xAir => &*models::PLAN_FLUOR_5X_AIR,
            ObjectivePreset::PlanApo20xAir => &*models::PLAN_APO_20X_AIR,
            ObjectivePreset::PlanApo40xWater => &*models::PLAN_APO_40X_WATER,
            ObjectivePreset::PlanApo60xSilicone => &*models::PLAN_APO_60X_SILICONE,
            ObjectivePreset::PlanApo63xOil => &*models::PLAN_APO_63X_OIL,
            ObjectivePreset::PlanApo100xOil => &*models::PLAN_APO_100X_OIL,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    AdaptiveStep,
    Bisection,
}

impl From<MethodArg> for SearchMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::AdaptiveStep => SearchMethod::AdaptiveStep,
            MethodArg::Bisection => SearchMethod::Bisection,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Chromatic shift QC from multi-channel bead images",
    long_about = "Computes lateral, axial and 3D shifts between every pair of channels\n\
        of each bead image and compares them with the diffraction-limited\n\
        resolution of the objective. Writes merged CSV tables."
)]
struct Args {
    /// Measurement files (JSON), one per image
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory for the CSV tables
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Settings directory (default: ~/.chromalign)
    #[arg(long)]
    settings_dir: Option<PathBuf>,

    /// Use a catalogued objective for NA and immersion
    #[arg(long, value_enum)]
    objective: Option<ObjectivePreset>,

    /// Objective numerical aperture
    #[arg(long)]
    na: Option<f64>,

    /// Immersion medium (air, water, oil, glycerin, silicone)
    #[arg(long)]
    immersion: Option<String>,

    /// Root-finding method for the tolerance ellipsoid
    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Only skip the ellipsoid search when both spots are identical
    #[arg(long)]
    full_coincidence: bool,

    /// Leave channel-with-itself rows out of the tables
    #[arg(long)]
    exclude_self_pairs: bool,

    /// Compute the channel pairs of an image in parallel
    #[arg(long)]
    parallel: bool,

    /// Also write one full table per image
    #[arg(long)]
    save_individual_files: bool,

    /// Store the effective settings for the next run
    #[arg(long)]
    save_settings: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply_to_settings(&self, settings: &mut MicroscopeSettings) {
        if let Some(preset) = self.objective {
            let model = preset.model();
            settings.objective_magnification = model.magnification.clone();
            settings.objective_na = model.optics.numerical_aperture;
            settings.objective_immersion = model.optics.immersion.to_string();
        }
        if let Some(na) = self.na {
            settings.objective_na = na;
        }
        if let Some(immersion) = &self.immersion {
            settings.objective_immersion = immersion.clone();
        }
    }

    fn apply_to_config(&self, config: &mut AlignmentConfig) {
        if let Some(method) = self.method {
            config.projection.method = method.into();
        }
        if self.full_coincidence {
            config.coincidence = CoincidencePolicy::FullCoincidence;
        }
        if self.exclude_self_pairs {
            config.include_self_pairs = false;
        }
        if self.parallel {
            config.parallel = true;
        }
        if self.save_individual_files {
            config.save_individual_files = true;
        }
    }
}

fn process_file(
    path: &Path,
    settings: &MicroscopeSettings,
    engine: &ChannelAlignmentEngine,
) -> Result<ImageAlignment> {
    let measurement = ImageMeasurement::load_from_file(path)
        .with_context(|| format!("Failed to read measurement {}", path.display()))?;
    let input = measurement
        .to_alignment_input(settings)
        .with_context(|| format!("Invalid measurement {}", path.display()))?;
    let alignment = engine
        .align_image(&input)
        .with_context(|| format!("Failed to align {}", measurement.image_name))?;
    Ok(alignment)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let storage = match &args.settings_dir {
        Some(dir) => SettingsStorage::with_path(dir.clone()),
        None => SettingsStorage::default(),
    };
    info!("Settings directory: {}", storage.root_path().display());

    let mut settings = storage
        .microscope_settings_or_default()
        .context("Failed to load microscope settings")?;
    args.apply_to_settings(&mut settings);
    settings
        .validate()
        .context("Invalid microscope settings")?;

    let mut config = storage
        .alignment_config_or_default()
        .context("Failed to load alignment settings")?;
    args.apply_to_config(&mut config);

    if args.save_settings {
        storage.save_microscope_settings(&settings)?;
        storage.save_alignment_config(&config)?;
        info!("Saved settings to {}", storage.root_path().display());
    }

    info!(
        "Objective {} NA {} ({}), {} image(s)",
        settings.objective_magnification,
        settings.objective_na,
        settings.objective_immersion,
        args.inputs.len()
    );

    let engine = ChannelAlignmentEngine::new(config);
    let writer = ReportWriter::new(&args.output_dir);

    let mut alignments = Vec::new();
    for path in &args.inputs {
        match process_file(path, &settings, &engine) {
            Ok(alignment) => {
                if config.save_individual_files {
                    writer.write_image(&alignment)?;
                }
                alignments.push(alignment);
            }
            Err(err) => error!("Skipping {}: {err:#}", path.display()),
        }
    }

    if alignments.is_empty() {
        bail!("No image could be processed");
    }

    let (full, essential) = writer
        .write_merged(&alignments)
        .context("Failed to write result tables")?;

    println!("\n=== Channel Alignment Summary ===");
    for alignment in &alignments {
        match alignment.worst_colocalization_ratio_3d() {
            Some(worst) => println!(
                "{}: {} pairs, worst 3D colocalization ratio {worst:.2}",
                alignment.image_name,
                alignment.rows.len()
            ),
            None => println!(
                "{}: {} pairs, no 3D ratio",
                alignment.image_name,
                alignment.rows.len()
            ),
        }
        if !alignment.failures.is_empty() {
            warn!(
                "{}: {} channel pair(s) could not be computed",
                alignment.image_name,
                alignment.failures.len()
            );
        }
    }
    println!("\nFull table: {}", full.display());
    println!("Essential table: {}", essential.display());

    Ok(())
}
