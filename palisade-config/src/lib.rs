//! Configuration loading for Palisade
//!
//! Values come from the process environment (optionally seeded from a `.env`
//! file) or from JSON/TOML files. Consumers deserialize into their own typed
//! settings and check them through [`Validate`].
//!
//! ```no_run
//! use palisade_config::{ConfigLoader, EnvLoader};
//!
//! let vars = EnvLoader::with_prefix("CSRF").load().unwrap();
//! let file = ConfigLoader::auto("csrf.toml").unwrap().load_file("csrf.toml").unwrap();
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use env::{EnvLoader, parse_bool, parse_list};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};
