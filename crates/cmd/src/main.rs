// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap::error::ErrorKind;
use diagnostics::*;
use selector::Pipeline;

use cmd::commands;
use cmd::commands::TabulateOptions;
use cmd::common::RunContext;

#[derive(Parser, Debug)]
#[command(author, version, about = "Map, reduce and tabulate pulse table files", long_about = None)]
#[command(name = "pulsemap")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print settings, converting between flat text and JSON
    Settings {
        /// Print as nested JSON instead of flat text
        #[arg(short = 'j', long = "json")]
        json: bool,
        /// A .conf, .json or .tbl[/location] file, or - for stdin
        input: Option<String>,
    },
    /// Map one input file into one output file
    MapSingle {
        /// Mapper stages, e.g. "scale,sum"
        mappers: String,
        output: PathBuf,
        input: PathBuf,
    },
    /// Map each input into <stem>.<tag>.tbl beside it
    MapMulti {
        mappers: String,
        tag: String,
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        /// Prepare the mapper stages again for every input
        #[arg(long)]
        no_reuse: bool,
    },
    /// Combine all inputs into one output file
    Reduce {
        mappers: String,
        output: PathBuf,
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },
    /// Print expressions for every selected record of the matching tables
    #[command(allow_negative_numbers = true)]
    Tabulate {
        /// Table path pattern, e.g. "run*.tbl/evt/*"
        path: String,
        /// Comma separated column expressions
        varexp: String,
        /// Row filter expression
        selection: Option<String>,
        /// Number of records to scan, negative for all
        n: Option<i64>,
        /// First record to scan
        start: Option<u64>,
    },
}

#[allow(clippy::print_stdout)]
fn print_line(text: String) {
    let text = text.strip_suffix('\n').unwrap_or(&text);
    println!("{text}");
}

async fn run(cli: Cli, ctx: RunContext) -> Result<()> {
    let pipeline = Pipeline::default();
    match cli.command {
        Commands::Settings { json, input } => {
            commands::settings_command(&ctx, input.as_deref(), json, io::stdin().lock(), print_line)
        }
        Commands::MapSingle {
            mappers,
            output,
            input,
        } => commands::map_single_command(&ctx, &pipeline, &mappers, &output, &input),
        Commands::MapMulti {
            mappers,
            tag,
            inputs,
            no_reuse,
        } => {
            commands::map_multi_command(&ctx, &pipeline, &mappers, &tag, &inputs, !no_reuse, print_line)
                .await
        }
        Commands::Reduce {
            mappers,
            output,
            inputs,
        } => commands::reduce_command(&ctx, &pipeline, &mappers, &output, &inputs),
        Commands::Tabulate {
            path,
            varexp,
            selection,
            n,
            start,
        } => {
            let options = TabulateOptions {
                selection: selection.unwrap_or_default(),
                n_entries: n.unwrap_or(-1),
                start_entry: start.unwrap_or(0),
            };
            let mut out = io::BufWriter::new(io::stdout().lock());
            let _ = commands::tabulate_command(&path, &varexp, &options, &mut out).await?;
            out.flush()?;
            Ok(())
        }
    }
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() -> ExitCode {
    init_diagnostics();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };
    debug!("Running {command}", command: format!("{:?}", cli.command));

    let result = match RunContext::load(None) {
        Ok(ctx) => run(cli, ctx).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
