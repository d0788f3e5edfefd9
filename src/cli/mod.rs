//! Command-line interface.
//!
//! Without a subcommand (or with `serve`) the binary starts the HTTP server.
//! The other subcommands work directly against the configured database:
//! - `products add` / `products list` - manage the catalogue
//! - `orders list` - inspect placed orders
//! - `routes` - print the routing table
//! - `config check` - validate the configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::api::{endpoints, validation};
use crate::config::Config;
use crate::db::{self, DbError, Order, Product, User};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(author, version, about = "A small e-commerce backend", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "storefront.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Override the port the server binds to
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve,

    /// Product catalogue commands
    #[command(subcommand)]
    Products(ProductsCommands),

    /// Order inspection commands
    #[command(subcommand)]
    Orders(OrdersCommands),

    /// Print the HTTP routing table
    Routes,

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Products subcommands
#[derive(Subcommand, Debug)]
pub enum ProductsCommands {
    /// Add a product to the catalogue
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "")]
        description: String,
        /// Absolute http(s) URL of the product image
        #[arg(long)]
        image: String,
    },
    /// List all products
    List,
}

/// Orders subcommands
#[derive(Subcommand, Debug)]
pub enum OrdersCommands {
    /// List orders with their product ids
    List {
        /// Only show orders placed for this user
        #[arg(long)]
        user_id: Option<i64>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// Run a non-server CLI command
pub async fn run_command(command: &Commands, cli: &Cli, config: &Config) -> Result<()> {
    match command {
        Commands::Serve => Ok(()),
        Commands::Products(ProductsCommands::Add {
            name,
            price,
            description,
            image,
        }) => cmd_products_add(config, name, *price, description, image).await,
        Commands::Products(ProductsCommands::List) => cmd_products_list(config).await,
        Commands::Orders(OrdersCommands::List { user_id }) => {
            cmd_orders_list(config, *user_id).await
        }
        Commands::Routes => {
            print!("{}", format_routes());
            Ok(())
        }
        Commands::Config(ConfigCommands::Check) => cmd_config_check(cli, config),
    }
}

/// Check a product before it is inserted
pub fn validate_new_product(name: &str, price: f64, image: &str) -> Result<()> {
    validation::validate_product_name(name).map_err(anyhow::Error::msg)?;
    validation::validate_price(price).map_err(anyhow::Error::msg)?;
    validation::validate_image_url(image)
        .map_err(|e| anyhow::anyhow!("Invalid image URL: {}", e))?;
    Ok(())
}

async fn cmd_products_add(
    config: &Config,
    name: &str,
    price: f64,
    description: &str,
    image: &str,
) -> Result<()> {
    let name = name.trim();
    validate_new_product(name, price, image)?;

    let pool = db::init(config).await?;
    let product = Product::create(&pool, name, price, description, image)
        .await
        .context("Failed to insert product")?;
    pool.close().await;

    println!(
        "{}",
        serde_json::to_string_pretty(&product).context("Failed to format product")?
    );
    Ok(())
}

async fn cmd_products_list(config: &Config) -> Result<()> {
    let pool = db::init(config).await?;
    let products = Product::list(&pool).await?;
    pool.close().await;

    if products.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    println!("{:<6} {:<30} {:>10}  IMAGE", "ID", "NAME", "PRICE");
    println!("{}", "-".repeat(80));
    for product in &products {
        println!(
            "{:<6} {:<30} {:>10.2}  {}",
            product.id,
            truncate(&product.name, 30),
            product.price,
            truncate(&product.image, 30)
        );
    }
    println!();
    println!("Total: {} product(s)", products.len());
    Ok(())
}

async fn cmd_orders_list(config: &Config, user_id: Option<i64>) -> Result<()> {
    let pool = db::init(config).await?;

    if let Some(id) = user_id {
        match User::get_by_id(&pool, id).await {
            Ok(_) => {}
            Err(DbError::NotFound(_)) => anyhow::bail!("User {} not found", id),
            Err(e) => return Err(e.into()),
        }
    }

    let orders = Order::list(&pool, user_id).await?;
    pool.close().await;

    if orders.is_empty() {
        println!("No orders found.");
        return Ok(());
    }

    println!("{:<6} {:<8} {:<27} PRODUCTS", "ID", "USER", "CREATED");
    println!("{}", "-".repeat(80));
    for entry in &orders {
        let products: Vec<String> = entry.products.iter().map(|id| id.to_string()).collect();
        println!(
            "{:<6} {:<8} {:<27} {}",
            entry.order.id,
            entry.order.user_id,
            truncate(&entry.order.created_at, 27),
            products.join(", ")
        );
    }
    Ok(())
}

fn cmd_config_check(cli: &Cli, config: &Config) -> Result<()> {
    if !cli.config.exists() {
        println!(
            "No config file at {}, checking defaults.",
            cli.config.display()
        );
    }

    let problems = config.validate();
    if problems.is_empty() {
        println!("Configuration OK");
        println!("  Listen:    {}", config.bind_addr());
        println!("  Database:  {}", config.database_url());
        println!("  Log level: {}", config.logging.level);
        return Ok(());
    }

    for problem in &problems {
        println!("  [!!] {}", problem);
    }
    anyhow::bail!("Configuration has {} problem(s)", problems.len())
}

/// The routing table as printed by `storefront routes`
pub fn format_routes() -> String {
    let mut out = String::new();
    for endpoint in endpoints() {
        out.push_str(&format!(
            "{:<7} {:<18} {}\n",
            endpoint.method.as_str(),
            endpoint.path,
            endpoint.description
        ));
    }
    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
