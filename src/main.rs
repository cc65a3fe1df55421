#![cfg(not(tarpaulin_include))]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use runlog::app::{self, Command, GroupBy, Session};
use runlog::config::Config;
use runlog::training_log::TrainingLog;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive editor (the default)
    Shell {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Load a workbook, normalize it and write it back out
    Normalize {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,
    },
    /// Print monthly, weekly or overall summaries
    Summary {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(long, value_enum, default_value = "month")]
        by: GroupBy,
        #[arg(long)]
        json: bool,
    },
    /// Bar chart of distance per month or week
    #[cfg(feature = "charts")]
    Chart {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(long, value_enum, default_value = "month")]
        by: GroupBy,
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("reading configuration {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command.unwrap_or(Commands::Shell { file: None }) {
        Commands::Shell { file } => shell(config, file),
        Commands::Normalize { input, output } => {
            let log = open(&config, &input)?;
            log.export(&output, &config.sheet_name)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("{} records written to {}", log.len(), output.display());
            Ok(())
        }
        Commands::Summary { input, by, json } => {
            let log = open(&config, &input)?;
            if json {
                let text = match by {
                    GroupBy::Month => serde_json::to_string_pretty(&log.by_month())?,
                    GroupBy::Week => serde_json::to_string_pretty(&log.by_week())?,
                    GroupBy::Total => serde_json::to_string_pretty(&log.totals())?,
                };
                println!("{}", text);
            } else {
                let mut session = Session { log, config };
                for line in session.execute(Command::Summary(by))? {
                    println!("{}", line);
                }
            }
            Ok(())
        }
        #[cfg(feature = "charts")]
        Commands::Chart { input, by, output } => {
            let log = open(&config, &input)?;
            let mut session = Session { log, config };
            for line in session.execute(Command::Chart(by, output))? {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

fn open(config: &Config, input: &Path) -> Result<TrainingLog> {
    let mut log = TrainingLog::new(config.normalize_options());
    log.load(input, &config.sheet_name)
        .with_context(|| format!("loading {}", input.display()))?;
    Ok(log)
}

fn shell(config: Config, file: Option<PathBuf>) -> Result<()> {
    let day_first = config.day_first;
    let mut session = Session::new(config);
    let mut status = String::from("ok");

    let opened = match file {
        Some(path) => Some(session.log.load(&path, &session.config.sheet_name)),
        None => session.open_default(),
    };
    if let Some(Err(e)) = opened {
        eprintln!("{}", e);
        status = String::from("load failed");
    } else if opened.is_some() {
        println!("{} records loaded.", session.log.len());
    }

    let mut start_time = Instant::now();
    loop {
        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        start_time = Instant::now();

        if line.is_empty() {
            status = String::from("invalid command");
            continue;
        }

        let command = match app::parse_command(line, day_first) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                status = String::from("invalid command");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        match session.execute(command) {
            Ok(lines) => {
                for line in lines {
                    println!("{}", line);
                }
                status = String::from("ok");
            }
            Err(e) => {
                eprintln!("{}", e);
                status = String::from("error");
            }
        }
    }
    Ok(())
}
