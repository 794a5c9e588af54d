use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use pantry_inventory::Category;

#[derive(Parser, Debug)]
#[command(name = "pantry", bin_name = "pantry", version)]
#[command(about = "Keep track of what is in your pantry", long_about = None)]
pub struct Cli {
    /// SQLite database file (overrides PANTRY_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List inventory items
    List {
        /// Only show this category ("all" for every category)
        #[arg(long)]
        category: Option<String>,
        /// Case-insensitive substring of the item name
        #[arg(long)]
        search: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Add an item, or add to the quantity of an item with the same name
    Add {
        name: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        #[arg(short, long, default_value_t = Category::Pantry)]
        category: Category,
        /// Expiry date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        expires: Option<String>,
    },

    /// Change fields of an existing item
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        quantity: Option<u32>,
        #[arg(short, long)]
        category: Option<Category>,
        /// New expiry date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", conflicts_with = "clear_expiry")]
        expires: Option<String>,
        /// Forget the expiry date
        #[arg(long)]
        clear_expiry: bool,
    },

    /// Remove an item by id
    Remove { id: String },

    /// Remove every item
    Clear {
        /// Confirm clearing the whole inventory
        #[arg(long)]
        yes: bool,
    },

    /// Detect food in a photo and add it to the inventory
    Scan { image: PathBuf },

    /// Show totals, low-stock and expiring counts
    Summary {
        /// Quantity at or below which an item counts as low
        #[arg(long, default_value_t = 2)]
        low_stock: u32,
        /// Days ahead that count as "expiring soon"
        #[arg(long, default_value_t = 3)]
        within_days: u32,
    },

    /// Show or toggle the dark-mode preference
    DarkMode {
        #[arg(value_enum, default_value_t = DarkModeAction::Show)]
        action: DarkModeAction,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DarkModeAction {
    Show,
    Toggle,
}
