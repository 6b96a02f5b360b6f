// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{crate_version, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use utau_render::{
    config::{JobFile, RenderConfig},
    engine::EngineRegistry,
    render::Renderer,
};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Renders singing voice segments through UTAU resampler engines."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Searches for resampler engines and lists them.
    Engines {
        /// The render settings file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// The directory to search. Overrides the settings.
        path: Option<PathBuf>,
    },
    /// Renders a job file to a WAV file.
    Render {
        /// The job file.
        job: PathBuf,
        /// The WAV file to write. Overrides the job's output.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Prints the engine command line for every segment in a job file.
    Args {
        /// The job file.
        job: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Engines { config, path } => {
            let mut settings = match &config {
                Some(config) => RenderConfig::load(config)?,
                None => RenderConfig::default(),
            };
            if let Some(path) = path {
                settings.set_resamplers_path(path);
            }

            let registry = EngineRegistry::from_config(&settings)?;
            registry.search(&settings.resamplers_path());

            println!("Engines (count: {}):", registry.len());
            for engine in registry.list() {
                match engine.path {
                    Some(path) => {
                        println!("- {} ({}): {}", engine.name, engine.kind, path.display())
                    }
                    None => println!("- {} ({})", engine.name, engine.kind),
                }
            }
        }
        Commands::Render { job, output } => {
            let job = JobFile::load(&job)?;
            let output = match output.as_deref().or(job.output()) {
                Some(output) => output.to_path_buf(),
                None => return Err("no output file given".into()),
            };

            let mut settings = job.render_config()?;
            let registry = Arc::new(EngineRegistry::from_config(&settings)?);
            registry.search(&settings.resamplers_path());
            let renderer = Renderer::from_config(registry, &mut settings, job.config_path())?;

            let written = renderer.render_to_wav(job.into_items(), &output)?;
            println!("Wrote {} samples to {}.", written, output.display());
        }
        Commands::Args { job: path } => {
            let job = JobFile::load(&path)?;
            if job.items().is_empty() {
                println!("No segments in {}.", path.display());
                return Ok(());
            }

            let output = Path::new("out.wav");
            for (index, item) in job.items().iter().enumerate() {
                println!(
                    "{index} {}: {}",
                    item.label(),
                    item.params.process_args_line(&item.params.input, output)
                );
            }
        }
    }

    Ok(())
}
