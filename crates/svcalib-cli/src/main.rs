use argh::FromArgs;
use std::path::PathBuf;

use svcalib::{generate, verify_generated, RigConfig};

#[derive(FromArgs)]
/// Generate the calibration files of a 4-camera surround-view rig
struct Args {
    /// path to a JSON rig configuration, the reference rig is used if omitted
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// directory receiving the Camparam<i>.yaml and corner_warppts.yaml files
    #[argh(option, short = 'o', default = "PathBuf::from(\"camparameters\")")]
    output_dir: PathBuf,

    /// re-read every written file and compare it with the generated values
    #[argh(switch)]
    verify: bool,

    /// print the effective rig configuration as JSON and exit
    #[argh(switch)]
    dump_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    let rig = match &args.config {
        Some(path) => {
            log::info!("Loading rig configuration from {}", path.display());
            RigConfig::from_json_file(path)?
        }
        None => RigConfig::default_surround_rig(),
    };

    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&rig)?);
        return Ok(());
    }

    let report = generate(&rig, &args.output_dir)?;

    if args.verify {
        verify_generated(&args.output_dir, &report.records, &report.crop)?;
    }

    for path in &report.written {
        println!("{}", path.display());
    }

    Ok(())
}
