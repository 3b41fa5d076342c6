use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use indicatif::{MultiProgress, ProgressDrawTarget};
use indicatif_log_bridge::LogWrapper;
use log::{error, warn};

use osm2vec::cli::Args;
use osm2vec::convert::{convert, Config, Mode};
use osm2vec::progress::file_progress_bar;
use osm2vec::reader::InputFile;

const ERROR_WRONG_ARGUMENTS: u8 = 1;
const ERROR_UNHANDLED: u8 = 2;

fn init_logging() -> MultiProgress {
    let logger = env_logger::Builder::from_env(Env::default().default_filter_or("info")).build();
    let progress_bars = MultiProgress::new();
    if let Err(err) = LogWrapper::new(progress_bars.clone(), logger).try_init() {
        eprintln!("could not set up logging: {err}");
    }
    progress_bars
}

fn run(config: &Config, progress_bars: &MultiProgress, show_progress: bool) -> anyhow::Result<()> {
    let input = InputFile::open(&config.input)
        .with_context(|| format!("opening input file {}", config.input.display()))?;

    let bar = if show_progress {
        Some(progress_bars.add(file_progress_bar(input.file_size())))
    } else {
        progress_bars.set_draw_target(ProgressDrawTarget::hidden());
        None
    };

    convert(config, &input, bar).with_context(|| {
        format!(
            "converting {} to {}",
            config.input.display(),
            config.output.display()
        )
    })?;
    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(ERROR_WRONG_ARGUMENTS)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let progress_bars = init_logging();
    let show_progress = args.progress;
    let config = match args.into_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(ERROR_WRONG_ARGUMENTS);
        }
    };
    if config.include_length && config.mode == Mode::Points {
        warn!("--length only applies when ways are exported, ignoring it");
    }

    match run(&config, &progress_bars, show_progress) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(ERROR_UNHANDLED)
        }
    }
}
