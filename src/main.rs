//! Command-line front end: prices a quote request against the rate tables.
//!
//! Usage:
//!   quote_calculator request.json --config config.json
//!   quote_calculator --secrets secrets.toml --customer Corporate < request.json
//!   quote_calculator --config config.json --dump-secrets > secrets.toml

use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quote_calculator::{
    aggregate,
    infra::config_loader::{encode_secrets, to_json_pretty, CONFIG_PATH_ENV, SECRETS_PATH_ENV},
    util::version::AppBanner,
    ConfigSource, CustomerType, QuoteRequest,
};

#[derive(Parser, Debug)]
#[command(name = "quote_calculator", version)]
#[command(about = "Price print and signage quotes for preferred, corporate and wholesale customers")]
struct Args {
    /// Quote request JSON; read from stdin when omitted
    request: Option<PathBuf>,

    /// Rate configuration JSON
    #[arg(long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// TOML document with the configuration JSON under `config`
    #[arg(long, env = SECRETS_PATH_ENV)]
    secrets: Option<PathBuf>,

    /// Override the request's customer type (Preferred, Corporate, Wholesale)
    #[arg(long, value_parser = parse_customer)]
    customer: Option<CustomerType>,

    /// Print the loaded configuration as pretty JSON and exit
    #[arg(long, conflicts_with = "dump_secrets")]
    dump_config: bool,

    /// Print the loaded configuration as a secrets document and exit
    #[arg(long)]
    dump_secrets: bool,
}

fn parse_customer(label: &str) -> Result<CustomerType, String> {
    CustomerType::from_label(label).ok_or_else(|| format!("unknown customer type `{label}`"))
}

fn read_request(path: Option<&PathBuf>) -> Result<QuoteRequest, Box<dyn std::error::Error>> {
    let data = match path {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    Ok(serde_json::from_str(&data)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    info!("{}", AppBanner);

    let mut source = ConfigSource::new();
    source.secrets = args.secrets;
    source.file = args.config;
    let config = source.load()?;

    if args.dump_config {
        println!("{}", to_json_pretty(&config)?);
        return Ok(());
    }
    if args.dump_secrets {
        print!("{}", encode_secrets(&config)?);
        return Ok(());
    }

    let mut request = read_request(args.request.as_ref())?;
    if let Some(customer) = args.customer {
        request.customer_type = customer;
    }
    if !config.customer_types().contains(&request.customer_type) {
        warn!(customer = %request.customer_type, "customer type not offered by this configuration");
    }

    let totals = aggregate(&request, &config);
    println!("{}", serde_json::to_string_pretty(&totals)?);
    Ok(())
}
