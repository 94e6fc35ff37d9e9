//! Laundry Hub Server - campus laundry request lifecycle service
//!
//! # Architecture overview
//!
//! - **Request lifecycle** (`requests`): event-sourced command pipeline
//!   over an embedded redb store
//! - **Pickup slots** (`slots`): slot administration and capacity guard
//! - **Usage quota** (`quota`): weekly counters, reports and overrides
//! - **HTTP API** (`api`): RESTful interface
//!
//! # Module structure
//!
//! ```text
//! hub-server/src/
//! ├── core/          # config, state, server, event router, workers
//! ├── api/           # HTTP routes and handlers
//! ├── requests/      # request lifecycle event sourcing
//! ├── slots/         # pickup slot administration
//! ├── quota/         # usage ledger
//! └── utils/         # logging
//! ```

pub mod api;
pub mod core;
pub mod quota;
pub mod requests;
pub mod slots;
pub mod utils;

// Re-export common types
pub use crate::core::{Config, Server, ServerState};
pub use quota::UsageLedger;
pub use requests::{RequestManager, RequestStorage};
pub use slots::SlotAllocator;

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Set up the process environment: dotenv, work directory, logging
pub fn setup_environment() -> std::io::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    config.ensure_work_dir_structure()?;

    let log_dir = config.log_dir();
    if config.is_production() {
        init_logger_with_file(None, log_dir.to_str());
    } else {
        init_logger();
    }

    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
    __                          __
   / /   ____ ___  ______  ____/ /______  __
  / /   / __ `/ / / / __ \/ __  / ___/ / / /
 / /___/ /_/ / /_/ / / / / /_/ / /  / /_/ /
/_____/\__,_/\__,_/_/ /_/\__,_/_/   \__, /
    __  __      __                /____/
   / / / /_  __/ /_
  / /_/ / / / / __ \
 / __  / /_/ / /_/ /
/_/ /_/\__,_/_.___/
    "#
    );
}
