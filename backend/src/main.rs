//! Meta2 CLI - classify legal-process spreadsheets against a cutoff year
//!
//! # Commands
//!
//! ```bash
//! meta2 analyze processos.csv              # Meta2 summary per task (JSON on stdout)
//! meta2 analyze processos.xlsx --all       # Summary over every process
//! meta2 parse processos.csv                # Validated rows as JSON
//! meta2 check 123-2019.8.26.0100           # Classify a single process number
//! meta2 serve                              # Start HTTP server (port 3000)
//! ```

use clap::{Parser, Subcommand};
use meta2::{
    analyze_file, load_file, parse_case_year, AnalysisOptions, AnalysisResult, AnalysisStatus,
    RawFile, ReadOptions, Selection, Settings,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "meta2")]
#[command(about = "Classify legal-process spreadsheets against the Meta2 cutoff year", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a .csv/.xlsx file and summarize it per task name
    Analyze {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Processes from years before this are Meta2 (default: META2_CUTOFF_YEAR or 2021)
        #[arg(short, long)]
        cutoff_year: Option<i64>,

        /// Candidate delimiters, e.g. ",;\t" (auto-detect if not specified)
        #[arg(short, long)]
        delimiters: Option<String>,

        /// Quote character
        #[arg(short, long, default_value = "\"")]
        quote: char,

        /// Include processes that are not Meta2
        #[arg(long)]
        all: bool,

        /// Only summarize these task names (repeatable)
        #[arg(short, long = "task")]
        tasks: Vec<String>,

        /// Output file for the summary (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the selected records to this file
        #[arg(long)]
        records: Option<PathBuf>,
    },

    /// Parse and validate a file, output its rows as JSON
    Parse {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Candidate delimiters (auto-detect if not specified)
        #[arg(short, long)]
        delimiters: Option<String>,

        /// Quote character
        #[arg(short, long, default_value = "\"")]
        quote: char,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Classify a single process number
    Check {
        /// Process number, e.g. 123-2019.8.26.0100
        process_number: String,

        /// Cutoff year (default: META2_CUTOFF_YEAR or 2021)
        #[arg(short, long)]
        cutoff_year: Option<i64>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: META2_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    let settings = Settings::from_env();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            input,
            cutoff_year,
            delimiters,
            quote,
            all,
            tasks,
            output,
            records,
        } => {
            let options = AnalysisOptions {
                cutoff_year: cutoff_year.unwrap_or(settings.cutoff_year),
                delimiter_candidates: delimiters,
                quote_char: quote,
                selection: Selection {
                    show_only_meta2: !all,
                    task_names: if tasks.is_empty() { None } else { Some(tasks) },
                },
            };
            cmd_analyze(&input, &options, output.as_deref(), records.as_deref())
        }

        Commands::Parse {
            input,
            delimiters,
            quote,
            output,
        } => cmd_parse(&input, delimiters.as_deref(), quote, output.as_deref()),

        Commands::Check {
            process_number,
            cutoff_year,
        } => cmd_check(&process_number, cutoff_year.unwrap_or(settings.cutoff_year)),

        Commands::Serve { port } => {
            let settings = Settings {
                port: port.unwrap_or(settings.port),
                ..settings
            };
            meta2::server::start_server(settings).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_analyze(
    input: &Path,
    options: &AnalysisOptions,
    output: Option<&Path>,
    records_output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Analyzing: {}", input.display());

    let file = RawFile::from_path(input)?;
    let result = analyze_file(&file, options)?;

    print_file_info(&result);
    print_summary(&result);

    let summary_json = serde_json::to_string_pretty(&result.summary)?;
    write_output(&summary_json, output)?;

    if let Some(path) = records_output {
        let records_json = serde_json::to_string_pretty(&result.working_set)?;
        fs::write(path, records_json)?;
        eprintln!("💾 {} records written to: {}", result.working_set.len(), path.display());
    }

    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiters: Option<&str>,
    quote: char,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let file = RawFile::from_path(input)?;
    let options = ReadOptions::new(delimiters, quote)?;
    let loaded = load_file(&file, &options)?;

    eprintln!("   Columns: {}", loaded.info.headers.join(", "));
    eprintln!("✅ {} valid records", loaded.table.records.len());

    let json = serde_json::to_string_pretty(&loaded.table.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_check(process_number: &str, cutoff_year: i64) -> Result<(), Box<dyn std::error::Error>> {
    meta2::transform::pipeline::check_cutoff_year(cutoff_year)?;

    match parse_case_year(process_number) {
        Some(year) => {
            let flag = year < cutoff_year;
            println!("{}: year {}, Meta2 = {} (cutoff {})", process_number, year, flag, cutoff_year);
        }
        None => {
            println!("{}: no year found, Meta2 = false", process_number);
        }
    }
    Ok(())
}

fn print_file_info(result: &AnalysisResult) {
    let info = &result.file_info;
    if let Some(ref encoding) = info.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(ref delimiter) = info.delimiter {
        eprintln!("   Delimiter: '{}'", delimiter);
    }
    eprintln!("   Rows: {}", info.row_count);
    if !info.skipped_rows.is_empty() {
        eprintln!("   Skipped (malformed): {}", info.skipped_rows.len());
    }
    if info.dropped_rows > 0 {
        eprintln!("   Dropped (missing values): {}", info.dropped_rows);
    }
    eprintln!(
        "   Meta2: {} of {} (cutoff {})",
        result.meta2_count(),
        result.records.len(),
        result.cutoff_year
    );
}

fn print_summary(result: &AnalysisResult) {
    if result.status == AnalysisStatus::Empty {
        eprintln!("\nℹ️  No records match the current selection.");
        return;
    }

    let width = result
        .summary
        .iter()
        .map(|r| r.task_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Task".len());

    eprintln!("\n📊 Processes per task:\n");
    eprintln!("   {:<width$}  {:>8}  {:>6}", "Task", "Count", "%", width = width);
    for row in &result.summary {
        eprintln!(
            "   {:<width$}  {:>8}  {:>6.1}",
            row.task_name,
            row.count,
            row.percentage,
            width = width
        );
    }
    eprintln!();
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
