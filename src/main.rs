//! Generate a training set from the default peaks and tractogram.
//!
//! If a `tractset.toml` file exists in the working directory, it is used
//! instead of the built-in configuration.

use env_logger::{Builder, Env};
use log::info;
use std::path::Path;
use tractset::{generate_training_data, GeneratorConfig, Result};

const CONFIG_FILE: &str = "tractset.toml";

fn default_config() -> GeneratorConfig {
    GeneratorConfig::new(
        "ismrm2015_withReversed__peaks.nii.gz",
        "2_filtered_loops.trk",
        "datos_train",
    )
    .with_window_size(5)
    .with_history(1)
    .with_num_samples(100_000)
}

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = if Path::new(CONFIG_FILE).is_file() {
        info!("Using configuration from {}", CONFIG_FILE);
        GeneratorConfig::from_file(CONFIG_FILE)?
    } else {
        default_config()
    };

    let report = generate_training_data(&config)?;
    println!(
        "Generated {} samples with neighborhood size {} and {} previous directions.",
        report.samples, config.sampling.window_size, config.sampling.history
    );
    println!("Saved to {}", config.output_path().display());
    Ok(())
}
