//! semquery CLI - compile semantic queries against dataset definitions
//!
//! Usage:
//!   semquery compile <defs> --query <json|@file> [--explain]
//!   semquery validate <defs> --query <json|@file>
//!   semquery list <defs>
//!   semquery describe <defs> <dataset>
//!
//! `<defs>` is a `.yml`, `.yaml` or `.json` definitions file, or a directory
//! of them.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use semquery::config::{load_from_directory, load_from_file, register_all};
use semquery::sql::validate;
use semquery::SemanticLayer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "semquery")]
#[command(about = "Compile JSON semantic queries over registered datasets to DuckDB SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a semantic query to SQL
    Compile {
        /// Definitions file or directory
        defs: PathBuf,

        /// Query JSON, or @path to read it from a file
        #[arg(short, long)]
        query: String,

        /// Print the explain result (a single compiled_sql row) as JSON
        #[arg(long)]
        explain: bool,
    },

    /// Validate a semantic query without printing SQL
    Validate {
        /// Definitions file or directory
        defs: PathBuf,

        /// Query JSON, or @path to read it from a file
        #[arg(short, long)]
        query: String,
    },

    /// List registered datasets
    List {
        /// Definitions file or directory
        defs: PathBuf,
    },

    /// Show the measures and dimensions of a dataset
    Describe {
        /// Definitions file or directory
        defs: PathBuf,

        /// Dataset name
        dataset: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("semquery=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            defs,
            query,
            explain,
        } => cmd_compile(&defs, &query, explain),
        Commands::Validate { defs, query } => cmd_validate(&defs, &query),
        Commands::List { defs } => cmd_list(&defs),
        Commands::Describe { defs, dataset } => cmd_describe(&defs, &dataset),
    }
}

fn cmd_compile(defs: &Path, query: &str, explain: bool) -> ExitCode {
    let Some(layer) = load_layer(defs) else {
        return ExitCode::FAILURE;
    };
    let Some(query) = read_query(query) else {
        return ExitCode::FAILURE;
    };

    if explain {
        return match layer.explain(&query) {
            Ok(result) => match serde_json::to_string_pretty(&result) {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error serializing result: {e}");
                    ExitCode::FAILURE
                }
            },
            Err(e) => {
                eprintln!("Compilation error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    match layer.compile(&query) {
        Ok(sql) => {
            println!("{sql}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Compilation error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_validate(defs: &Path, query: &str) -> ExitCode {
    let Some(layer) = load_layer(defs) else {
        return ExitCode::FAILURE;
    };
    let Some(query) = read_query(query) else {
        return ExitCode::FAILURE;
    };

    let result = layer
        .parse_query(&query)
        .and_then(|q| validate(layer.registry(), &q));

    match result {
        Ok(plan) => {
            println!("✓ Query is valid");
            println!("  Dataset: {}", plan.dataset);
            println!("  Measures: {}", plan.measures.len());
            println!(
                "  Dimensions: {}",
                plan.dimensions.len() + plan.time_dimensions.len()
            );
            println!("  Filters: {}", plan.filters.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Validation error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_list(defs: &Path) -> ExitCode {
    let Some(layer) = load_layer(defs) else {
        return ExitCode::FAILURE;
    };

    println!("Definitions: {}", defs.display());
    println!();

    let names = layer.registry().names();
    if names.is_empty() {
        println!("No datasets defined.");
        return ExitCode::SUCCESS;
    }

    println!("Datasets:");
    for name in names {
        if let Some(ds) = layer.registry().get(&name) {
            println!(
                "  {} ({} measures, {} dimensions)",
                name,
                ds.measures.len(),
                ds.dimensions.len()
            );
        }
    }
    ExitCode::SUCCESS
}

fn cmd_describe(defs: &Path, dataset: &str) -> ExitCode {
    let Some(layer) = load_layer(defs) else {
        return ExitCode::FAILURE;
    };

    let ds = match layer.registry().lookup(dataset) {
        Ok(ds) => ds,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("Dataset: {}", ds.name);
    println!();
    println!("Measures:");
    for m in &ds.measures {
        print!("  {} = {} [{}]", m.name, m.sql_expression, m.aggregation_type.as_str());
        match &m.description {
            Some(desc) => println!(" - {desc}"),
            None => println!(),
        }
    }
    println!();
    println!("Dimensions:");
    for d in &ds.dimensions {
        print!("  {} = {} [{:?}]", d.name, d.sql_expression, d.r#type);
        match &d.description {
            Some(desc) => println!(" - {desc}"),
            None => println!(),
        }
    }
    ExitCode::SUCCESS
}

fn load_layer(defs: &Path) -> Option<SemanticLayer> {
    let definitions = if defs.is_dir() {
        load_from_directory(defs)
    } else {
        load_from_file(defs)
    };

    let layer = SemanticLayer::default();
    match definitions.and_then(|d| register_all(layer.registry(), d)) {
        Ok(_) => Some(layer),
        Err(e) => {
            eprintln!("Error loading definitions '{}': {e}", defs.display());
            None
        }
    }
}

fn read_query(arg: &str) -> Option<String> {
    let Some(path) = arg.strip_prefix('@') else {
        return Some(arg.to_string());
    };

    match fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("Error reading query file '{path}': {e}");
            None
        }
    }
}
