use std::{io, process::ExitCode};

use converter_runner::ConverterRunner;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

mod converter_runner;
mod map_data;
mod map_features;
mod map_file;
mod osm_data;
mod result_writer;
#[cfg(test)]
mod test_utils;

fn main() -> ExitCode {
    let runner = ConverterRunner::init();

    let subscriber = FmtSubscriber::builder()
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_max_level(runner.log_level())
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    match runner.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "Run failed");
            ExitCode::FAILURE
        }
    }
}
