use clap::{Parser, Subcommand};
use listing_locator::config::Config;
use listing_locator::listing::{
    search, JsonStore, ListingStore, LocationEnhancementPipeline, SearchQuery, ServiceAreaStrategy,
    SortOrder,
};
use listing_locator::location::gazetteer::areas_by_tier;
use listing_locator::location::{navigation_link, Coordinates, GeocodingClient, LocationError};
use std::path::PathBuf;

/// Listing Locator v0.3: location intelligence for community business listings
///
/// Resolves map deep links and service areas into coordinates, enhances the
/// listing store, and runs proximity searches.
///
/// Examples:
///   locator parse "https://waze.com/ul?ll=32.0853,34.7818"
///   locator geocode "Dizengoff 50, Tel Aviv"
///   locator enhance
///   locator enhance --resume-after b42
///   locator search --lat 32.0853 --lng 34.7818 --radius 3 --tag kosher
///   locator serve --port 3000
#[derive(Parser)]
#[command(name = "locator", version, about, long_about = None)]
struct Cli {
    /// Config file. Defaults to ~/.locator/config.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Listing store override (JSON array of businesses).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show what a map deep link resolves to, without any network access.
    Parse { link: String },

    /// List the recognised service areas by tier.
    Areas,

    /// Geocode a free-text address.
    Geocode { address: String },

    /// Resolve locations for the listing store (all listings, or one).
    Enhance {
        /// Enhance a single listing.
        #[arg(long, conflicts_with = "resume_after")]
        id: Option<String>,

        /// Continue a stopped batch after this listing id.
        #[arg(long)]
        resume_after: Option<String>,

        /// Place multi-area businesses on a circle covering every area
        /// instead of the first listed one.
        #[arg(long)]
        merge_areas: bool,
    },

    /// Proximity search over enhanced listings.
    Search {
        #[arg(long, allow_hyphen_values = true, requires = "lng")]
        lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lng: Option<f64>,

        /// Radius in km. Defaults to the configured search radius.
        #[arg(long, value_parser = parse_radius)]
        radius: Option<f64>,

        /// Free-text match on name, description, category and tags.
        #[arg(long, short = 'q')]
        query: Option<String>,

        /// Category filter (repeatable; any matches).
        #[arg(long)]
        category: Vec<String>,

        /// Tag filter (repeatable; all must match).
        #[arg(long)]
        tag: Vec<String>,

        /// "distance", "name" or "newest".
        #[arg(long, default_value = "distance")]
        sort: SortOrder,
    },

    /// Start the HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, short = 'p', default_value_t = 3000)]
        port: u16,
    },
}

fn parse_radius(s: &str) -> Result<f64, String> {
    let radius: f64 = s.trim().parse().map_err(|_| format!("'{}' is not a number", s))?;
    if radius.is_finite() && radius >= 0.0 {
        Ok(radius)
    } else {
        Err(format!("radius must be a non-negative number of km, got '{}'", s))
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), LocationError> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    match cli.command {
        Command::Parse { link } => parse(&config, &link),
        Command::Areas => {
            areas();
            Ok(())
        }
        Command::Geocode { address } => geocode(&config, &address),
        Command::Enhance {
            id,
            resume_after,
            merge_areas,
        } => enhance(&config, id.as_deref(), resume_after.as_deref(), merge_areas),
        Command::Search {
            lat,
            lng,
            radius,
            query,
            category,
            tag,
            sort,
        } => {
            let center = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)?),
                _ => None,
            };
            let query = SearchQuery {
                radius_km: center.map(|_| radius.unwrap_or(config.default_search_radius_km)),
                center,
                text: query,
                categories: category,
                tags: tag,
                sort,
            };
            search_store(&config, &query)
        }
        Command::Serve { host, port } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(listing_locator::server::start(config, &host, port))
        }
    }
}

fn parse(config: &Config, link: &str) -> Result<(), LocationError> {
    let client = GeocodingClient::from_config(config);
    let Some(parsed) = client.parser().parse(link) else {
        return Err(LocationError::NotFound(link.to_string()));
    };

    let coordinates = parsed.coordinates();
    let output = serde_json::json!({
        "address": parsed.address,
        "place": parsed.place,
        "coordinates": coordinates,
        "navigationLink": coordinates.as_ref().map(navigation_link),
    });
    print_json(&output)
}

fn areas() {
    for (tier, areas) in areas_by_tier() {
        println!("Tier {} ({})", tier.number(), tier.label());
        for area in areas {
            println!(
                "  {:<18} {:>8.4}, {:>8.4}  r={} km",
                area.name, area.lat, area.lng, area.radius_km
            );
        }
    }
}

fn geocode(config: &Config, address: &str) -> Result<(), LocationError> {
    let mut client = GeocodingClient::from_config(config);
    let result = client
        .geocode_address(address)
        .ok_or_else(|| LocationError::NotFound(address.to_string()))?;

    eprintln!("  {} ({})", result.coordinates, result.confidence);
    print_json(&result)
}

fn enhance(
    config: &Config,
    id: Option<&str>,
    resume_after: Option<&str>,
    merge_areas: bool,
) -> Result<(), LocationError> {
    let mut store = JsonStore::load_from(&config.store_path)?;
    let strategy = if merge_areas {
        ServiceAreaStrategy::Merged
    } else {
        ServiceAreaStrategy::FirstListed
    };
    let mut pipeline = LocationEnhancementPipeline::new(GeocodingClient::from_config(config))
        .with_default_radius(config.default_search_radius_km)
        .with_area_strategy(strategy);

    if let Some(id) = id {
        return match pipeline.enhance_stored(&mut store, id)? {
            Some(record) => print_json(&record),
            None => {
                eprintln!("  {} has no resolvable location", id);
                Ok(())
            }
        };
    }

    eprintln!(
        "  Enhancing {} listings from {}",
        store.len(),
        config.store_path.display()
    );
    let mut batch = pipeline.batch(&mut store);
    if let Some(after) = resume_after {
        batch = batch.resume_after(after);
    }
    batch.by_ref().for_each(drop);
    print_json(&batch.summary())
}

fn search_store(config: &Config, query: &SearchQuery) -> Result<(), LocationError> {
    let store = JsonStore::load_from(&config.store_path)?;
    let results = search(&store.all(), query);

    for r in &results {
        let distance = r.distance_label().unwrap_or_else(|| "-".to_string());
        eprintln!("  {:>8}  {}", distance, r.business.name);
    }
    print_json(&results)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), LocationError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
