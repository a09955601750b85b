use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_stream::StreamExt;

use dualfm_lib::fs_ops::{self, BatchReport};
use dualfm_lib::watcher::Pane;
use dualfm_lib::Session;

#[derive(Parser)]
#[command(name = "dualfm-cli")]
#[command(about = "Dual-pane file manager engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List a directory
    Ls {
        path: PathBuf,
        /// Emit the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy entries into a destination directory
    Cp {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        #[arg(short, long)]
        dest: PathBuf,
    },
    /// Move entries into a destination directory
    Mv {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        #[arg(short, long)]
        dest: PathBuf,
    },
    /// Recursively delete entries
    Rm {
        #[arg(required = true)]
        targets: Vec<PathBuf>,
    },
    /// Watch a directory and print change events until interrupted
    Watch {
        path: PathBuf,
        #[arg(short, long, default_value = "left")]
        pane: String,
        /// Also watch nested directories this many levels deep
        #[arg(long, default_value_t = 0)]
        depth: usize,
        /// Emit events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Run an external command and print its combined output
    Run {
        program: String,
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Cmd::Ls { path, json } => {
            let entries = fs_ops::read_dir(&path).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in entries {
                    let kind = if entry.is_dir { "dir " } else { "file" };
                    println!(
                        "{kind} {:>10}  {}  {}",
                        entry.size,
                        entry.modified.format("%Y-%m-%d %H:%M:%S"),
                        entry.name
                    );
                }
            }
        }
        Cmd::Cp { sources, dest } => {
            let pb = batch_bar(sources.len());
            let report = fs_ops::copy_entries(&sources, &dest, |done, _| {
                pb.set_position(done as u64);
            })
            .await?;
            pb.finish_and_clear();
            print_report("copied", &report);
        }
        Cmd::Mv { sources, dest } => {
            let pb = batch_bar(sources.len());
            let report = fs_ops::move_entries(&sources, &dest, |done, _| {
                pb.set_position(done as u64);
            })
            .await?;
            pb.finish_and_clear();
            print_report("moved", &report);
        }
        Cmd::Rm { targets } => {
            let report = fs_ops::delete_entries(&targets).await;
            print_report("deleted", &report);
        }
        Cmd::Watch {
            path,
            pane,
            depth,
            json,
        } => {
            let pane: Pane = pane.parse()?;
            let session = Session::new();
            let mut events = session.set_dir_watch(pane, &path.display().to_string())?;
            if depth > 0 {
                session.add_watcher(pane, depth, &path.display().to_string())?;
            }
            println!("👀 Watching {path:?} on the {pane} pane (Ctrl-C to stop)");

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        session.quit();
                        break;
                    }
                    event = events.next() => {
                        match event {
                            Some(e) if json => println!("{}", serde_json::to_string(&e)?),
                            Some(e) => println!("{:?} {}", e.kind, e.path.display()),
                            None => break,
                        }
                    }
                }
            }
        }
        Cmd::Run { program, args, cwd } => {
            let session = Session::new();
            let result = session
                .run_command_line(
                    &program,
                    &args,
                    &HashMap::new(),
                    cwd.as_deref().and_then(|p| p.to_str()),
                )
                .await?;
            print!("{}", result.output);
            if !result.success {
                eprintln!("exit status: {:?}", result.status);
                std::process::exit(result.status.unwrap_or(1));
            }
        }
    }

    Ok(())
}

fn batch_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

fn print_report(verb: &str, report: &BatchReport) {
    println!("✅ {} {} of {} entries", verb, report.succeeded(), report.outcomes.len());
    for (path, err) in report.failures() {
        eprintln!("⚠️  {}: {err}", path.display());
    }
    if !report.is_ok() {
        std::process::exit(1);
    }
}
