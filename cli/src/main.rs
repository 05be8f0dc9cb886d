mod logging;
mod report;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use meterboard_core::repository::{self, load_sheet_file, ObservationRepository};
use meterboard_core::{
    config, parse_report_date, today, Config, DashboardRequest, DashboardService, DashboardUseCase,
    ObservationForm, StoreBackend, SubmitOutcome, ViewMode,
};

pub type Store = Box<dyn ObservationRepository>;

#[derive(Parser)]
#[command(name = "meterboard")]
#[command(about = "Meter installation and manpower dashboard", long_about = None)]
struct Cli {
    /// Directory holding the record store (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Record store backend: json, csv or sqlite (overrides config)
    #[arg(long, global = true)]
    backend: Option<StoreBackend>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args, Default)]
struct RangeArgs {
    /// First day (YYYY-MM-DD, DD-MM-YYYY, today, yesterday, -7d)
    #[arg(long)]
    from: Option<String>,
    /// Last day, defaults to today
    #[arg(long)]
    to: Option<String>,
    /// Window length when --from is not given
    #[arg(long)]
    days: Option<u32>,
    /// Restrict to one package
    #[arg(long, short)]
    package: Option<String>,
    /// combined, wc (type-a) or dt (type-b)
    #[arg(long, short)]
    view: Option<ViewMode>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print KPIs and the daily summary table
    Show {
        #[command(flatten)]
        range: RangeArgs,
        /// Print the whole view as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored records
    List {
        #[arg(long, short)]
        package: Option<String>,
    },
    /// Insert or update one record (usage: set date:2024-05-01 pkg:TN-95 wc:12 dt:3 ci:4 mi:2 inhouse:1 sup:1)
    Set {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Apply every row of a CSV sheet as an update
    Import { path: PathBuf },
    /// Open the interactive dashboard
    Tui,
}

fn build_request(range: &RangeArgs, config: &Config) -> Result<DashboardRequest, String> {
    let anchor = today();
    let end = match &range.to {
        Some(raw) => parse_report_date(raw, anchor).map_err(|e| e.to_string())?,
        None => anchor,
    };
    let mut request = match &range.from {
        Some(raw) => DashboardRequest::new(parse_report_date(raw, anchor).map_err(|e| e.to_string())?, end),
        None => DashboardRequest::trailing(end, range.days.unwrap_or(config.dashboard.default_range_days)),
    };
    request.view_mode = range.view.unwrap_or(config.dashboard.default_view);
    request.package = range.package.clone();
    Ok(request)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, config_warnings) = config::load();
    if let Some(dir) = cli.data_dir {
        config.store.data_dir = Some(dir);
    }
    if let Some(backend) = cli.backend {
        config.store.backend = backend;
    }

    let interactive = matches!(cli.command, None | Some(Commands::Tui));
    if interactive {
        let dir = match &config.store.data_dir {
            Some(dir) => dir.clone(),
            None => repository::file::default_data_dir()?,
        };
        logging::init_file(&config.logging.level, &dir)?;
    } else {
        logging::init_stderr(&config.logging.level);
    }
    for warning in &config_warnings {
        tracing::warn!("{}", warning);
    }

    let store: Store = repository::open(config.store.backend, config.store.data_dir.clone())?;
    let mut service = DashboardService::new(store, config.dashboard.packages.clone());

    match cli.command {
        Some(Commands::Show { range, json }) => {
            let request = match build_request(&range, &config) {
                Ok(r) => r,
                Err(e) => {
                    println!("Error: {}", e);
                    return Ok(());
                }
            };
            let outcome = DashboardUseCase::new(&mut service).render(&request);
            match (json, outcome.view()) {
                (true, Some(view)) => println!("{}", serde_json::to_string_pretty(view)?),
                _ => report::show_outcome(&outcome),
            }
        }
        Some(Commands::List { package }) => match service.list(package.as_deref()) {
            Ok(observations) => report::show_observations(&observations),
            Err(e) => println!("Error: {}", e),
        },
        Some(Commands::Set { args }) => {
            if args.is_empty() {
                println!("Error: nothing to record. Try: set date:today pkg:TN-95 wc:12");
                return Ok(());
            }
            let (form, warnings) = ObservationForm::from_args(&args);
            for warning in warnings {
                println!("Warning: {}", warning);
            }
            let outcome = DashboardUseCase::new(&mut service).submit(&form, today());
            println!("{}", outcome.message());
            if let SubmitOutcome::Saved(_) = outcome {
                println!("  Store: {}", service.repository().describe());
            }
        }
        Some(Commands::Import { path }) => {
            let load = match load_sheet_file(&path) {
                Ok(load) => load,
                Err(e) => {
                    println!("Error: {:#}", e);
                    return Ok(());
                }
            };
            match service.import(load) {
                Ok(report) => report::show_import(&report),
                Err(e) => println!("Error: {}", e),
            }
        }
        Some(Commands::Tui) | None => {
            let request = build_request(&RangeArgs::default(), &config).unwrap_or_else(|_| {
                DashboardRequest::trailing(today(), config.dashboard.default_range_days)
            });
            tui::run(service, request)?;
        }
    }
    Ok(())
}
