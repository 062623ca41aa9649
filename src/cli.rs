use clap::{Args, Parser, Subcommand};
use nu_plugin_medidores::config::{Config, LOG_ENV};
use nu_plugin_medidores::ops;
use nu_plugin_medidores::pipeline::filter::{CriteriaParams, FilterCriteria};
use nu_plugin_medidores::pipeline::presets::SavedFilters;
use nu_plugin_medidores::pipeline::source::{self, LoadReport};
use nu_plugin_medidores::{Error, Result};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "medidores",
    version,
    about = "Filter, rank, and export INMETRO speed-meter verification records"
)]
struct Cli {
    /// Start as an MCP (Model Context Protocol) server on stdio.
    /// AI assistants (Claude Desktop, Cursor, etc.) connect via JSON-RPC.
    #[cfg(feature = "mcp")]
    #[arg(long, exclusive = true)]
    mcp: bool,

    /// Config file (TOML or JSON). Falls back to $MEDIDORES_CONFIG and the
    /// XDG config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Filter flags shared by `filter` and `query`.
#[derive(Args, Default)]
struct CriteriaArgs {
    /// State code or name (exact)
    #[arg(short, long)]
    state: Option<String>,
    /// City (exact)
    #[arg(short, long)]
    city: Option<String>,
    /// Result: approved, rejected, unknown
    #[arg(short, long)]
    result: Option<String>,
    /// Instrument type substring
    #[arg(short = 't', long = "type")]
    instrument_type: Option<String>,
    /// Free-text search
    #[arg(short = 'q', long)]
    search: Option<String>,
    /// Region: norte, nordeste, centro-oeste, sudeste, sul
    #[arg(long)]
    region: Option<String>,
    /// Date the range applies to: lastVerification or validUntil
    #[arg(long)]
    date_field: Option<String>,
    /// Inclusive lower date bound
    #[arg(long = "from")]
    date_from: Option<String>,
    /// Inclusive upper date bound
    #[arg(long = "to")]
    date_to: Option<String>,
    /// Minimum nominal speed (km/h)
    #[arg(long)]
    speed_min: Option<f64>,
    /// Maximum nominal speed (km/h)
    #[arg(long)]
    speed_max: Option<f64>,
}

impl From<CriteriaArgs> for CriteriaParams {
    fn from(a: CriteriaArgs) -> Self {
        Self {
            state: a.state,
            city: a.city,
            result: a.result,
            instrument_type: a.instrument_type,
            search: a.search,
            region: a.region,
            date_field: a.date_field,
            date_from: a.date_from,
            date_to: a.date_to,
            speed_min: a.speed_min,
            speed_max: a.speed_max,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw records into the canonical shape
    Normalize,
    /// Keep records matching every given criterion
    Filter {
        #[command(flatten)]
        criteria: CriteriaArgs,
        /// Start from a saved preset; flags override its fields
        #[arg(long)]
        preset: Option<String>,
        /// Preset file (JSON)
        #[arg(long, env = "MEDIDORES_PRESETS")]
        presets: Option<PathBuf>,
        /// Save the effective criteria under this name in the preset file
        #[arg(long)]
        save_as: Option<String>,
    },
    /// Summary metrics (counts, rates, speeds)
    Metrics,
    /// Most frequent values of a category
    Top {
        /// state, city, type, result, owner
        category: String,
        /// Number of entries (default: view.ranking_size)
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Result distribution, validity by month, verifications by year
    Trends {
        /// Calendar years to cover, ending this year
        #[arg(short, long, default_value_t = 5)]
        years: usize,
    },
    /// Stable sort by a column path (e.g. city, owner.name, lanes.nominalSpeed)
    Sort {
        column: String,
        /// asc or desc
        #[arg(short, long, default_value = "asc")]
        direction: String,
    },
    /// One page of records
    Page {
        /// 1-based page; clamped to the last page
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Rows per page (default: view.page_size)
        #[arg(short = 'n', long)]
        page_size: Option<usize>,
    },
    /// Export as JSON or quoted CSV
    Export {
        /// json or csv
        #[arg(short, long, default_value = "json")]
        format: String,
        /// Write to this file, or into this directory under the dated name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Records whose category value equals VALUE
    Lookup { category: String, value: String },
    /// Sorted unique values of a category
    Distinct { category: String },
    /// Filter, sort, and paginate in one pass
    Query {
        #[command(flatten)]
        criteria: CriteriaArgs,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        direction: Option<String>,
        #[arg(short, long)]
        page: Option<usize>,
        #[arg(short = 'n', long)]
        page_size: Option<usize>,
    },
    /// Flat display rows for tables and cards
    View,
    /// Load raw records from the per-state open-data files
    Load {
        /// Skip the network and print the bundled sample
        #[arg(long)]
        sample: bool,
        /// Comma-separated state codes (default: source.states)
        #[arg(long, value_delimiter = ',')]
        states: Option<Vec<String>>,
        /// CORS proxy prefix
        #[arg(long)]
        proxy: Option<String>,
        /// Snapshot database (default: cache.path)
        #[arg(long, env = "MEDIDORES_CACHE")]
        cache: Option<String>,
        /// Print the load report instead of the rows
        #[arg(long)]
        report: bool,
    },
    /// Show snapshot cache info
    #[cfg(feature = "cache")]
    CacheInfo {
        /// Snapshot database
        path: String,
    },
    /// Delete cached snapshots
    #[cfg(feature = "cache")]
    CacheClear {
        /// Snapshot database
        path: String,
        /// network or sample (default: all)
        #[arg(long)]
        origin: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;

    // ── MCP server mode ─────────────────────────────────────────────────
    #[cfg(feature = "mcp")]
    if cli.mcp {
        let rt = tokio::runtime::Runtime::new()?;
        return rt.block_on(nu_plugin_medidores::mcp::serve_stdio(config));
    }

    // ── Normal subcommand dispatch ──────────────────────────────────────
    let Some(command) = cli.command else {
        eprintln!("No subcommand provided. Run `medidores --help` for usage.");
        std::process::exit(1);
    };

    match command {
        Commands::Normalize => print_json(&ops::op_normalize(&read_stdin_json()?)?),
        Commands::Filter {
            criteria,
            preset,
            presets,
            save_as,
        } => cmd_filter(criteria, preset.as_deref(), presets.as_deref(), save_as.as_deref()),
        Commands::Metrics => print_json(&ops::op_metrics(&read_stdin_json()?)?),
        Commands::Top { category, count } => {
            let n = count.unwrap_or(config.view.ranking_size);
            print_json(&ops::op_top(&read_stdin_json()?, &category, n)?)
        }
        Commands::Trends { years } => print_json(&ops::op_trends(&read_stdin_json()?, years)?),
        Commands::Sort { column, direction } => {
            print_json(&ops::op_sort(&read_stdin_json()?, &column, &direction)?)
        }
        Commands::Page { page, page_size } => {
            let size = page_size.unwrap_or(config.view.page_size);
            let out = ops::op_paginate(&read_stdin_json()?, page, size, config.view.page_window_radius)?;
            print_json(&out)
        }
        Commands::Export { format, output } => cmd_export(&format, output.as_deref()),
        Commands::Lookup { category, value } => {
            print_json(&ops::op_lookup(&read_stdin_json()?, &category, &value)?)
        }
        Commands::Distinct { category } => print_json(&ops::op_distinct(&read_stdin_json()?, &category)?),
        Commands::Query {
            criteria,
            sort,
            direction,
            page,
            page_size,
        } => {
            let params = ops::QueryParams {
                criteria: criteria.into(),
                sort,
                direction,
                page,
                page_size,
            };
            print_json(&ops::op_query(&read_stdin_json()?, params, &config.view)?)
        }
        Commands::View => print_json(&ops::op_view(&read_stdin_json()?)?),
        Commands::Load {
            sample,
            states,
            proxy,
            cache,
            report,
        } => {
            let mut config = config;
            if let Some(states) = states {
                config.source.states = states.into_iter().map(|s| s.trim().to_uppercase()).collect();
            }
            if proxy.is_some() {
                config.source.cors_proxy = proxy;
            }
            if cache.is_some() {
                config.cache.path = cache;
            }
            let loaded = if sample {
                LoadReport::from_sample()
            } else {
                cmd_load(&config)?
            };
            if report {
                print_json(&loaded.summary())
            } else {
                print_json(&Value::Array(loaded.records))
            }
        }
        #[cfg(feature = "cache")]
        Commands::CacheInfo { path } => print_json(&ops::op_cache_info(&path)?),
        #[cfg(feature = "cache")]
        Commands::CacheClear { path, origin } => print_json(&ops::op_cache_clear(&path, origin.as_deref())?),
    }
}

fn read_stdin_json() -> Result<Vec<Value>> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Value = serde_json::from_str(&buf)?;
    Ok(match parsed {
        Value::Array(arr) => arr,
        single => vec![single],
    })
}

fn print_json(value: &Value) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn cmd_filter(
    args: CriteriaArgs,
    preset: Option<&str>,
    presets_path: Option<&Path>,
    save_as: Option<&str>,
) -> Result<()> {
    let flags = CriteriaParams::from(args).into_criteria()?;
    let mut presets = match presets_path {
        Some(path) => SavedFilters::load(path)?,
        None => SavedFilters::new(),
    };

    let base = match preset {
        Some(name) => presets.get(name).cloned().ok_or_else(|| Error::UnknownOption {
            kind: "preset",
            value: name.to_string(),
            expected: "a name saved in the --presets file",
        })?,
        None => FilterCriteria::default(),
    };
    let criteria = base.overlay(flags);

    if let Some(name) = save_as {
        let path = presets_path.ok_or_else(|| Error::Config {
            path: String::new(),
            message: "--save-as needs --presets <file>".into(),
        })?;
        presets.add(name, criteria.clone());
        presets.save(path)?;
        tracing::info!(preset = name, path = %path.display(), "saved preset");
    }

    print_json(&ops::op_filter_criteria(&read_stdin_json()?, &criteria)?)
}

fn cmd_export(format: &str, output: Option<&Path>) -> Result<()> {
    let rows = read_stdin_json()?;
    match output {
        None => {
            let text = ops::op_export_text(&rows, format)?;
            io::stdout().lock().write_all(text.as_bytes())?;
            Ok(())
        }
        Some(path) => {
            let exported = ops::op_export(&rows, format)?;
            let target = if path.is_dir() {
                path.join(exported["fileName"].as_str().unwrap_or("dados-inmetro"))
            } else {
                path.to_path_buf()
            };
            std::fs::write(&target, exported["content"].as_str().unwrap_or_default())?;
            eprintln!("wrote {}", target.display());
            Ok(())
        }
    }
}

/// Cache (when configured and fresh), then network with sample fallback.
fn cmd_load(config: &Config) -> Result<LoadReport> {
    #[cfg(feature = "cache")]
    if let Some(path) = &config.cache.path {
        if let Some(rows) = ops::cached_rows(path, config.cache.max_age_secs)? {
            return Ok(LoadReport {
                records: rows,
                loaded_states: Vec::new(),
                failed_states: Vec::new(),
                origin: source::DataOrigin::Cache,
            });
        }
    }

    let report = fetch_report(config)?;

    #[cfg(feature = "cache")]
    if let Some(path) = &config.cache.path {
        if report.origin == source::DataOrigin::Network {
            ops::store_rows(path, source::DataOrigin::Network, &report.records)?;
        }
    }

    Ok(report)
}

#[cfg(feature = "fetch")]
fn fetch_report(config: &Config) -> Result<LoadReport> {
    let rt = tokio::runtime::Runtime::new()?;
    Ok(rt.block_on(source::load(&config.source)))
}

#[cfg(not(feature = "fetch"))]
fn fetch_report(config: &Config) -> Result<LoadReport> {
    tracing::warn!(
        states = config.source.states.len(),
        "built without network support, using bundled sample"
    );
    Ok(LoadReport::from_sample())
}
