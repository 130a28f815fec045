//! Build the combined restaurant table from the raw source dumps.
//!
//! Source locations come from the environment (`DATA_DIR`, `COMBINED_DATA_PATH`,
//! `YELP_NROWS`, `YELP_JOIN`, optionally via `.env`); flags override them.
//! `--data-dir` moves the sources but not an output set by `COMBINED_DATA_PATH`.

use std::path::PathBuf;

use clap::Parser;
use dotenv::dotenv;
use log::{error, info, warn};

use bitefinder::config::BuildConfig;
use bitefinder::dataset::build_combined_dataset;
use bitefinder::logging;
use bitefinder::table::JoinPolicy;

#[derive(Parser, Debug)]
#[command(version, about = "Build the combined restaurant table")]
struct Args {
    /// Directory holding the raw Yelp, restaurant and fast-food files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Where to write the combined CSV
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum number of lines read from each Yelp JSON file
    #[arg(short, long)]
    nrows: Option<usize>,

    /// Keep Yelp businesses that have no review, checkin or tip records
    #[arg(long, default_value_t = false)]
    keep_unmatched_yelp: bool,
}

impl Args {
    fn apply(self, mut config: BuildConfig) -> BuildConfig {
        if let Some(dir) = self.data_dir {
            config.relocate(&dir);
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(nrows) = self.nrows {
            config.nrows = nrows;
        }
        if self.keep_unmatched_yelp {
            config.join_policy = JoinPolicy::Left;
        }
        config
    }
}

fn main() {
    dotenv().ok();
    let args = Args::parse();
    let config = args.apply(BuildConfig::from_env());

    if let Err(e) = logging::setup_logging(&config.log_dir, "build_dataset.log", config.log_level) {
        eprintln!("Failed to set up logging: {}", e);
        std::process::exit(1);
    }
    config.log_summary();

    if config.join_policy == JoinPolicy::Inner {
        info!("Yelp tables are inner-joined; businesses missing review, checkin or tip data are dropped");
    } else {
        warn!("Keeping Yelp businesses without review, checkin or tip data");
    }

    match build_combined_dataset(&config) {
        Ok(report) => {
            info!(
                "Final combined dataset saved to {} ({} rows: {} yelp, {} restaurant, {} fast food, {} dropped) in {:.2?}",
                report.output_path.display(),
                report.total_rows,
                report.yelp_rows,
                report.restaurant_rows,
                report.fast_food_rows,
                report.dropped_rows,
                report.elapsed
            );
        }
        Err(e) => {
            error!("Dataset build failed, nothing was written: {}", e);
            std::process::exit(1);
        }
    }
}
