use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shared::domain::{DeliveryStatus, PaymentStatus};

#[derive(Parser, Debug)]
#[command(
    name = "foodfast-admin",
    version,
    about = "Admin console for the FoodFast drone delivery gateway"
)]
pub struct Cli {
    /// Settings file; `./admin_console.toml` is read when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Print raw JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an admin session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// End the admin session.
    Logout,
    /// Show the current admin session.
    Whoami,
    /// Revenue, counts and the most recent orders.
    Dashboard,
    Users {
        #[command(subcommand)]
        action: UserCommand,
    },
    Products {
        #[command(subcommand)]
        action: ProductCommand,
    },
    Orders {
        #[command(subcommand)]
        action: OrderCommand,
    },
    Payments {
        #[command(subcommand)]
        action: PaymentCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    List {
        #[arg(long, default_value = "")]
        search: String,
    },
    Create {
        /// Custom id; the gateway assigns one when omitted.
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        new_id: Option<i64>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Delete {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProductCommand {
    List {
        #[arg(long, default_value = "")]
        search: String,
    },
    Create {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: f64,
    },
    Update {
        id: i64,
        #[arg(long)]
        new_id: Option<i64>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<f64>,
    },
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum OrderCommand {
    List {
        #[arg(long, default_value = "")]
        search: String,
    },
    Create {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        user: Option<i64>,
        /// Product id; repeat the flag or pass a comma list.
        #[arg(long = "product", value_delimiter = ',')]
        products: Vec<i64>,
    },
    Update {
        id: i64,
        #[arg(long)]
        new_id: Option<i64>,
        #[arg(long)]
        user: Option<i64>,
        /// Replaces the product list when given.
        #[arg(long = "product", value_delimiter = ',')]
        products: Vec<i64>,
        #[arg(long)]
        status: Option<DeliveryStatus>,
    },
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
    /// Send a drone: Pending -> Delivering now, Completed after the delay.
    Dispatch {
        id: i64,
        #[arg(long)]
        delay_secs: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PaymentCommand {
    List {
        #[arg(long, default_value = "")]
        search: String,
    },
    Create {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        order: Option<i64>,
        /// Cash, ATM Card, Bank Transfer or E-Wallet.
        #[arg(long)]
        method: String,
        #[arg(long, default_value = "Pending")]
        status: PaymentStatus,
    },
    Update {
        id: i64,
        #[arg(long)]
        new_id: Option<i64>,
        #[arg(long)]
        order: Option<i64>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        method: Option<String>,
        #[arg(long)]
        status: Option<PaymentStatus>,
    },
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
}
