use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use weathergrid::config::LoggingConfig;
use weathergrid::query::{QueryMode, QueryPlan, SearchArea, minimum_spacing, validate_city_input};
use weathergrid::{AppConfig, CityCatalog, Coordinate, OpenMeteoClient, WeatherGridError, export_json};

#[derive(Debug, Parser)]
#[command(name = "weathergrid", version)]
#[command(about = "Land and sea weather around a center point: nearby cities, a sample grid, or both")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Weather for the cities within the radius
    Cities(QueryArgs),
    /// Weather for grid points a fixed distance apart
    Points(QueryArgs),
    /// Cities on land, plus grid points away from every city (and at sea)
    Both(QueryArgs),
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Latitude of the center point
    #[arg(long, allow_negative_numbers = true, requires = "lon", conflicts_with = "city")]
    lat: Option<f64>,

    /// Longitude of the center point
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lon: Option<f64>,

    /// Name of the city at the center point
    #[arg(long, requires = "country")]
    city: Option<String>,

    /// ISO 3166 country code of the center city
    #[arg(long, requires = "city")]
    country: Option<String>,

    /// Distance in km from the center point (10 to 500)
    #[arg(long)]
    radius: Option<f64>,

    /// Distance in km between grid points
    #[arg(long)]
    spacing: Option<f64>,

    /// City dataset (CSV with city, lat and lng columns)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Write the results to weatherInfo.json
    #[arg(long)]
    export: bool,

    /// Only list the locations that would be queried
    #[arg(long)]
    dry_run: bool,
}

impl Commands {
    fn split(self) -> (QueryMode, QueryArgs) {
        match self {
            Commands::Cities(args) => (QueryMode::Cities, args),
            Commands::Points(args) => (QueryMode::Points, args),
            Commands::Both(args) => (QueryMode::Both, args),
        }
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load_from_path(cli.config.clone())?;
    init_tracing(&config.logging, cli.verbose);
    debug!("Using configuration: {:?}", config);

    let (mode, args) = cli.command.split();
    let mut client = OpenMeteoClient::new(config.weather.clone())?;

    let center = match (args.lat, args.lon, &args.city, &args.country) {
        (Some(lat), Some(lon), _, _) => Coordinate::new(lat, lon),
        (_, _, Some(city), Some(country)) => {
            validate_city_input(city, country)?;
            client.geocode(city, country)?
        }
        _ => {
            return Err(WeatherGridError::invalid_input(
                "give the center point with --lat/--lon or --city/--country",
            )
            .into());
        }
    };

    let area = SearchArea::new(center, args.radius.unwrap_or(config.defaults.radius_km))?;
    let spacing = match mode {
        QueryMode::Cities => None,
        QueryMode::Points | QueryMode::Both => Some(args.spacing.unwrap_or_else(|| {
            let spacing = minimum_spacing(area.radius_km());
            info!("No spacing given, using {} km", spacing);
            spacing
        })),
    };

    let catalog = match mode {
        QueryMode::Points => CityCatalog::default(),
        QueryMode::Cities | QueryMode::Both => {
            let path = args
                .catalog
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.catalog.path));
            CityCatalog::load(&path)?
        }
    };

    let plan = QueryPlan::build(mode, &area, spacing, &catalog)?;

    if args.dry_run {
        let listing = serde_json::to_string_pretty(&plan)
            .context("Failed to serialize query plan")?;
        println!("{listing}");
        return Ok(());
    }

    eprintln!("Please, wait for results.");
    let results = plan.execute(&mut client)?;

    let pretty = serde_json::to_string_pretty(&weathergrid::export::to_json_object(&results)?)
        .context("Failed to serialize results")?;
    println!("{pretty}");

    if args.export {
        let path = export_json(&results, &config.export.directory)?;
        eprintln!("File '{}' has been created successfully.", path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<WeatherGridError>() {
                Some(e) => eprintln!("{}", e.user_message()),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
