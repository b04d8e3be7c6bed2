//! Cache commands

use anyhow::{bail, Context};
use bucky_core::Kernel;
use bucky_foundation::{CacheBackend, DeletePattern};
use clap::Subcommand;
use serde_json::Value;

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show every backend's availability and rank
    Info,
    /// Print a cached value as JSON
    Get { key: String },
    /// Store a value (parsed as JSON, or stored as a string if it is not JSON)
    Set {
        key: String,
        value: String,

        /// Seconds until expiry (backend default if omitted)
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Delete a key
    Delete { key: String },
    /// Remove expired entries
    Gc,
    /// Delete every key containing the given substring
    Purge { pattern: String },
}

pub fn run_cache(kernel: &Kernel, backend: Option<&str>, action: CacheAction) -> anyhow::Result<()> {
    let cache = kernel.cache();

    if let CacheAction::Info = action {
        let default = cache.default_backend_name().ok();
        println!("{:<10} {:<10} {:>5}", "BACKEND", "AVAILABLE", "RANK");
        for (name, info) in cache.infos() {
            let marker = if default.as_deref() == Some(name.as_str()) { " *" } else { "" };
            println!("{:<10} {:<10} {:>5}{}", name, info.available, info.rank, marker);
        }
        return Ok(());
    }

    let name = match backend {
        Some(name) => name.to_string(),
        None => cache
            .default_backend_name()
            .context("No cache backend is available")?,
    };
    let store = cache
        .backend(Some(&name))
        .with_context(|| format!("Cannot use cache backend '{}'", name))?;

    match action {
        CacheAction::Info => {}
        CacheAction::Get { key } => match store.load(&key)? {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => bail!("{}: miss ({})", key, name),
        },
        CacheAction::Set { key, value, ttl } => {
            let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
            store.save(&key, &value, ttl)?;
            println!("✓ {} saved to {}", key, name);
        }
        CacheAction::Delete { key } => {
            if !store.delete(&key)? {
                bail!("{} not found in {}", key, name);
            }
            println!("✓ {} deleted from {}", key, name);
        }
        CacheAction::Gc => {
            let removed = store.gc()?;
            println!("✓ {} expired entries removed from {}", removed, name);
        }
        CacheAction::Purge { pattern } => {
            let removed = store.delete_many(&DeletePattern::Substring(pattern))?;
            println!("✓ {} entries removed from {}", removed, name);
        }
    }
    Ok(())
}
