use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

mod diagnostics;
mod excerpt;
mod log;
mod model;
mod render;
mod report;
mod snapshot;
mod tail;

use model::ProgramRun;
use tail::{Reader, ReaderConfig};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "datalog-profiler")]
#[command(about = "Profile reports for Datalog evaluator logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args, Clone)]
struct ReportArgs {
    /// Tuple count precision; -1 prints raw counts.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    precision: i32,

    /// Also print the rule table.
    #[arg(long)]
    rules: bool,

    /// Print the version breakdown of one recursive rule: <REL_ID> <RULE_ID>.
    #[arg(long, num_args = 2, value_names = ["REL_ID", "RULE_ID"])]
    versions: Option<Vec<String>>,

    /// Only print the N most expensive rows of each table.
    #[arg(long)]
    top: Option<usize>,

    /// Emit the derived tables as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a finished profile log and print its tables.
    Report {
        #[arg(long)]
        log: PathBuf,

        #[command(flatten)]
        args: ReportArgs,
    },

    /// Load a profile log, then keep following it while the program runs.
    Live {
        #[arg(long)]
        log: PathBuf,

        /// Polling interval in milliseconds.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Stop after this many refreshes.
        #[arg(long)]
        refreshes: Option<usize>,

        #[command(flatten)]
        args: ReportArgs,
    },

    /// Load a profile log and store the model as a snapshot.
    Snapshot {
        #[arg(long)]
        log: PathBuf,

        #[arg(short = 'o', long)]
        out: PathBuf,
    },

    /// Print the tables of a stored snapshot.
    Load {
        #[arg(long)]
        snapshot: PathBuf,

        #[command(flatten)]
        args: ReportArgs,
    },

    /// Copy the event lines of a log into a standalone file.
    Excerpt {
        #[arg(long)]
        log: PathBuf,

        /// Destination; defaults to a fresh file under old_runs/.
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    diagnostics::init_logging();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Report { log, args } => {
            let mut reader = Reader::new(&log, ReaderConfig::default())?;
            let run = load_or_bail(&mut reader)?;
            let run = lock_run(&run)?;
            print_report(&run, &args)?;
        }
        Commands::Live {
            log,
            interval_ms,
            refreshes,
            args,
        } => {
            let interval = Duration::from_millis(interval_ms);
            let config = ReaderConfig {
                poll_interval: interval,
                follow: true,
            };
            let mut reader = Reader::new(&log, config)?;
            let shared = load_or_bail(&mut reader)?;
            print_report(&*lock_run(&shared)?, &args)?;

            let tail = reader.follow()?;
            let mut printed = 0;
            while tail.is_running() {
                thread::sleep(interval);
                if !tail.is_updated() {
                    continue;
                }
                println!();
                print_report(&*lock_run(&shared)?, &args)?;
                tail.acknowledge();

                printed += 1;
                if refreshes.is_some_and(|n| printed >= n) {
                    break;
                }
            }
            tail.stop();
        }
        Commands::Snapshot { log, out } => {
            let mut reader = Reader::new(&log, ReaderConfig::default())?;
            let run = load_or_bail(&mut reader)?;
            snapshot::save(&*lock_run(&run)?, &out)?;
            println!("Wrote {}", out.display());
        }
        Commands::Load { snapshot, args } => {
            let run = snapshot::load(&snapshot)?;
            print_report(&run, &args)?;
        }
        Commands::Excerpt { log, out } => {
            let dest = match out {
                Some(p) => p,
                None => {
                    excerpt::unique_destination(Path::new(excerpt::DEFAULT_DIR), &file_name(&log))?
                }
            };
            let lines = excerpt::export(&log, &dest)?;
            println!("Wrote {} ({} records)", dest.display(), lines);
        }
    }

    Ok(())
}

fn load_or_bail(reader: &mut Reader) -> Result<tail::SharedRun> {
    if !reader.load() {
        anyhow::bail!(
            "{}",
            diagnostics::error_message(format!(
                "could not load profile log {}",
                reader.path().display()
            ))
        );
    }
    Ok(reader.run())
}

fn lock_run(run: &tail::SharedRun) -> Result<std::sync::MutexGuard<'_, ProgramRun>> {
    run.lock()
        .map_err(|_| anyhow::anyhow!(diagnostics::error_message("profile model lock poisoned")))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "profile.log".to_string())
}

fn print_report(run: &ProgramRun, args: &ReportArgs) -> Result<()> {
    let mut relations = report::relation_table(run);
    relations.sort_by(|a, b| b.total_time.total_cmp(&a.total_time));

    let mut rules = if args.rules {
        report::rule_table(run)
    } else {
        Vec::new()
    };
    rules.sort_by(|a, b| b.total_time.total_cmp(&a.total_time));

    let versions = match &args.versions {
        Some(ids) if ids.len() == 2 => report::version_table(run, &ids[0], &ids[1]),
        _ => Vec::new(),
    };

    if args.json {
        let data = serde_json::json!({
            "runtime": run.runtime(),
            "total_time": run.total_time(),
            "total_tuples": run.total_tuples(),
            "recursive_tuples": run.total_recursive_tuples(),
            "copy_time": run.total_copy_time(),
            "relations": relations,
            "rules": rules,
            "versions": versions,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    print!("{}", render::render_summary(run, args.precision));
    println!();
    let rows: Vec<_> = relations.iter().map(|r| r.cells()).collect();
    print!(
        "{}",
        render::render_table(&report::RelationRow::HEADERS, &rows, args.precision, args.top)
    );

    if args.rules {
        println!();
        let rows: Vec<_> = rules.iter().map(|r| r.cells()).collect();
        print!(
            "{}",
            render::render_table(&report::RuleRow::HEADERS, &rows, args.precision, args.top)
        );
    }

    if args.versions.is_some() {
        println!();
        let rows: Vec<_> = versions.iter().map(|r| r.cells()).collect();
        print!(
            "{}",
            render::render_table(&report::RuleRow::HEADERS, &rows, args.precision, args.top)
        );
    }

    Ok(())
}
