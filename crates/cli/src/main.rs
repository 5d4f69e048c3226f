//! Bramble CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! bramble migrate
//!
//! # Browse the remote catalog
//! bramble catalog products --category electronics
//! bramble catalog categories
//!
//! # Look up a shopper's orders
//! bramble orders list --user 6f1c1e9a-2f59-4d7e-9a59-3f7b7c1d2e11
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bramble")]
#[command(author, version, about = "Bramble CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Browse the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Inspect placed orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List products
    Products {
        /// Only list products in this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List categories
    Categories,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List a user's orders, newest first
    List {
        /// User id (UUID)
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Catalog { action } => match action {
            CatalogAction::Products { category } => {
                commands::catalog::products(category.as_deref()).await?;
            }
            CatalogAction::Categories => commands::catalog::categories().await?,
        },
        Commands::Orders { action } => match action {
            OrdersAction::List { user } => commands::orders::list(&user).await?,
        },
    }
    Ok(())
}
