//! Refinery simulator CLI
//!
//! Crude to products and products to crude runs against a crude catalog.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use tracing::info;

use refinery_sim::cache::ResultCache;
use refinery_sim::{
    CrudeOption, CrudeToProductsResults, Product, ProductQuantities, ProductsToCrudeResults,
    SimulationResults, Simulator, SimulatorConfig, db, extract, logging,
};

const LAST_FORWARD: &str = "last:forward";
const LAST_INVERSE: &str = "last:inverse";

#[derive(Parser)]
#[command(name = "refinery-sim")]
#[command(about = "Crude oil refining yield and economics simulator")]
struct Cli {
    /// Path to the SQLite catalog database
    #[arg(short, long, default_value = "refinery_data.db")]
    database: PathBuf,

    /// JSON file overriding the yield model, prices and capacity
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Forward,
    Inverse,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Load a sample crude catalog and product prices
    LoadSample,

    /// Import crude assay sheets (*.assay, *.txt) from a directory
    Import {
        /// Directory containing assay sheets
        source_dir: PathBuf,

        /// Clear the existing catalog before importing
        #[arg(long)]
        clear: bool,
    },

    /// List all crudes in the catalog
    ListCrudes,

    /// Show a crude's assay and its yields
    Crude {
        /// Crude name
        name: String,
    },

    /// Remove a crude from the catalog
    RemoveCrude {
        /// Crude name
        name: String,
    },

    /// Show product prices
    Prices,

    /// Set the market price of a product
    SetPrice {
        /// gas, naphtha, kerosene, mgo4 or mgo6
        product: Product,

        /// Price per barrel
        price: f64,
    },

    /// Refine a quantity of crude into products
    Forward {
        /// Crude name
        crude: String,

        /// Crude charged, in barrels
        #[arg(short, long, default_value = "10000")]
        amount: f64,

        /// Print the result envelope as JSON
        #[arg(long)]
        json: bool,
    },

    /// Work out the crude needed for a basket of products
    Inverse {
        #[arg(long)]
        gas: Option<f64>,

        #[arg(long)]
        naphtha: Option<f64>,

        #[arg(long)]
        kerosene: Option<f64>,

        #[arg(long)]
        mgo4: Option<f64>,

        #[arg(long)]
        mgo6: Option<f64>,

        /// Use this crude instead of searching the catalog
        #[arg(long)]
        crude: Option<String>,

        /// Print the result envelope as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the last run of a mode
    Last {
        #[arg(value_enum)]
        mode: Mode,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;

    let config = SimulatorConfig::load_or_default(cli.config.as_deref())?;
    let mut conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    let mut cache = ResultCache::load(&conn)?;
    let outcome = run(cli.command, &conn, &config, &mut cache, &cli.database);
    cache.flush(&mut conn)?;
    outcome
}

fn run(
    command: Commands,
    conn: &Connection,
    config: &SimulatorConfig,
    cache: &mut ResultCache,
    database: &Path,
) -> Result<()> {
    match command {
        Commands::Init => {
            println!("Database initialized at: {}", database.display());
        }

        Commands::LoadSample => {
            load_sample_data(conn, config)?;
            println!("Sample data loaded successfully!");
        }

        Commands::Import { source_dir, clear } => {
            if clear {
                info!("clearing existing catalog");
                db::clear_catalog(conn)?;
            }

            let stats = extract::extract_to_database(conn, &source_dir)?;
            println!("{}", stats);
        }

        Commands::ListCrudes => {
            let crudes = db::list_crudes(conn)?;
            if crudes.is_empty() {
                println!("No crudes in database. Run 'import' or 'load-sample' first.");
            } else {
                println!(
                    "{:<20} {:>6} {:>8} {:>10} {:>10} {:>10}",
                    "Crude", "API", "S (%)", "Price", "Transport", "Opex"
                );
                println!("{}", "-".repeat(69));
                for c in crudes {
                    println!(
                        "{:<20} {:>6.1} {:>8.2} {:>10.2} {:>10.2} {:>10.2}",
                        c.name, c.api, c.sulfur, c.purchase_price, c.transport_cost, c.operational_cost
                    );
                }
            }
        }

        Commands::Crude { name } => {
            let crude = find_crude(conn, &name)?;
            println!("Crude: {}", crude.name);
            println!("  API gravity: {:.1}", crude.api);
            println!("  Sulfur: {:.2}%", crude.sulfur);
            println!("  Purchase: {:.2}/bbl", crude.purchase_price);
            println!("  Transport: {:.2}/bbl", crude.transport_cost);
            println!("  Operational: {:.2}/bbl", crude.operational_cost);

            let simulator = build_simulator(conn, config)?;
            let run = simulator.simulate_crude_to_products(&crude, 1.0);
            match run.result() {
                Some(r) => {
                    println!("  Yields:");
                    for p in Product::ALL {
                        println!("    {:<10} {:>6.2}%", p.label(), r.yields.get(p) * 100.0);
                    }
                }
                None => {
                    if let Some(err) = run.error() {
                        println!("  Yields unavailable: {}", err);
                    }
                }
            }
        }

        Commands::RemoveCrude { name } => {
            if db::delete_crude(conn, &name)? {
                println!("Removed '{}'", name);
            } else {
                println!("Crude '{}' not found", name);
            }
        }

        Commands::Prices => {
            let prices = db::load_prices(conn, &config.prices)?;
            println!("{:<10} {:>10}", "Product", "Price/bbl");
            println!("{}", "-".repeat(21));
            for (product, price) in prices.iter() {
                println!("{:<10} {:>10.2}", product.label(), price);
            }
        }

        Commands::SetPrice { product, price } => {
            if !price.is_finite() || price < 0.0 {
                bail!("Price must be a non-negative number, got {}", price);
            }
            db::set_price(conn, product, price)?;
            println!("{} now priced at {:.2}/bbl", product.label(), price);
        }

        Commands::Forward { crude, amount, json } => {
            let crude = find_crude(conn, &crude)?;
            let simulator = build_simulator(conn, config)?;

            let run = simulator.simulate_crude_to_products(&crude, amount);
            cache.insert(LAST_FORWARD, &run)?;
            print_run(&run, json)?;
        }

        Commands::Inverse {
            gas,
            naphtha,
            kerosene,
            mgo4,
            mgo6,
            crude,
            json,
        } => {
            let basket: ProductQuantities = [
                (Product::Gas, gas),
                (Product::Naphtha, naphtha),
                (Product::Kerosene, kerosene),
                (Product::Mgo4, mgo4),
                (Product::Mgo6, mgo6),
            ]
            .into_iter()
            .filter_map(|(p, q)| q.map(|q| (p, q)))
            .collect();

            let simulator = build_simulator(conn, config)?;
            let run = match crude {
                Some(name) => {
                    let crude = find_crude(conn, &name)?;
                    simulator.simulate_products_to_crude_with(&crude, &basket)
                }
                None => {
                    let catalog = db::list_crudes(conn)?;
                    if catalog.is_empty() {
                        bail!("No crudes in database. Run 'import' or 'load-sample' first.");
                    }
                    simulator.simulate_products_to_crude(&catalog, &basket)
                }
            };
            cache.insert(LAST_INVERSE, &run)?;
            print_run(&run, json)?;
        }

        Commands::Last { mode, json } => match mode {
            Mode::Forward => {
                match cache.get::<SimulationResults<CrudeToProductsResults>>(LAST_FORWARD)? {
                    Some(run) => print_run(&run, json)?,
                    None => println!("No forward run recorded yet."),
                }
            }
            Mode::Inverse => {
                match cache.get::<SimulationResults<ProductsToCrudeResults>>(LAST_INVERSE)? {
                    Some(run) => print_run(&run, json)?,
                    None => println!("No inverse run recorded yet."),
                }
            }
        },
    }

    Ok(())
}

fn find_crude(conn: &Connection, name: &str) -> Result<CrudeOption> {
    match db::get_crude(conn, name)? {
        Some(crude) => Ok(crude),
        None => bail!("Crude '{}' not found. Run 'list-crudes' to see the catalog.", name),
    }
}

fn build_simulator(conn: &Connection, config: &SimulatorConfig) -> Result<Simulator> {
    let prices = db::load_prices(conn, &config.prices)?;
    Ok(Simulator::from_config(config, prices))
}

fn print_run<T>(run: &SimulationResults<T>, json: bool) -> Result<()>
where
    T: serde::Serialize,
    SimulationResults<T>: std::fmt::Display,
{
    if json {
        println!("{}", serde_json::to_string_pretty(run)?);
    } else {
        println!("{}", run);
    }
    Ok(())
}

/// Load a sample catalog of Venezuelan crudes and reference product prices
fn load_sample_data(conn: &Connection, config: &SimulatorConfig) -> Result<()> {
    db::clear_catalog(conn)?;

    let crudes = [
        ("Boscan", 10.1, 5.5, 48.0, 4.2, 7.5),
        ("Merey 16", 16.0, 2.45, 58.5, 3.8, 6.4),
        ("Hamaca", 26.0, 1.55, 66.0, 3.5, 5.6),
        ("Mesa 30", 30.0, 1.0, 71.0, 3.1, 5.1),
        ("Santa Barbara", 39.0, 0.5, 78.5, 2.9, 4.6),
    ];
    for (name, api, sulfur, purchase_price, transport_cost, operational_cost) in crudes {
        db::upsert_crude(
            conn,
            &CrudeOption {
                name: name.to_string(),
                api,
                sulfur,
                purchase_price,
                transport_cost,
                operational_cost,
            },
        )?;
    }

    for product in Product::ALL {
        db::set_price(conn, product, config.prices.price(product))?;
    }

    println!("Loaded {} sample crudes", crudes.len());
    Ok(())
}
