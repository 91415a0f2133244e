//! The drink menu.
//!
//! Items come from a remote tabular source (CSV over HTTP, columns
//! `name,price,milk`); if the fetch fails or the result is empty or invalid,
//! the built-in static menu is used instead. The flow consumes the menu but
//! does not own or revalidate it beyond "non-empty, numeric price".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// One purchasable item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    /// Base price before modifiers
    pub price: f64,
    /// Whether the milk modifier prompt applies
    pub milk_eligible: bool,
}

/// The built-in menu used when no remote source is configured or the remote
/// source is unusable.
pub fn fallback_menu() -> Vec<MenuItem> {
    vec![
        MenuItem {
            name: "Espresso".to_string(),
            price: 2.00,
            milk_eligible: false,
        },
        MenuItem {
            name: "Americano".to_string(),
            price: 2.50,
            milk_eligible: false,
        },
        MenuItem {
            name: "Latte".to_string(),
            price: 3.00,
            milk_eligible: true,
        },
        MenuItem {
            name: "Cappuccino".to_string(),
            price: 3.00,
            milk_eligible: true,
        },
        MenuItem {
            name: "Cold brew".to_string(),
            price: 3.80,
            milk_eligible: false,
        },
    ]
}

/// Parse the remote CSV body. Returns an error if any row is malformed so the
/// caller can fall back to the static menu wholesale.
pub fn parse_menu_csv(body: &str) -> Result<Vec<MenuItem>> {
    let mut items = Vec::new();

    for (lineno, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // optional header row
        if lineno == 0 && line.to_lowercase().starts_with("name,") {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [name, price, milk] = fields.as_slice() else {
            anyhow::bail!("line {}: expected 3 fields, got {}", lineno + 1, fields.len());
        };

        if name.is_empty() {
            anyhow::bail!("line {}: empty item name", lineno + 1);
        }
        let price: f64 = price
            .parse()
            .with_context(|| format!("line {}: bad price {:?}", lineno + 1, price))?;
        if !price.is_finite() || price < 0.0 {
            anyhow::bail!("line {}: bad price {}", lineno + 1, price);
        }

        items.push(MenuItem {
            name: name.to_string(),
            price,
            milk_eligible: matches!(*milk, "1" | "true" | "yes"),
        });
    }

    if items.is_empty() {
        anyhow::bail!("menu source is empty");
    }

    Ok(items)
}

/// Fetch the menu, falling back to the static list on any failure.
pub async fn load_menu(url: Option<&str>, timeout: Duration) -> Vec<MenuItem> {
    let Some(url) = url else {
        return fallback_menu();
    };

    match fetch_menu(url, timeout).await {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, url, "menu fetch failed, using built-in menu");
            fallback_menu()
        }
    }
}

async fn fetch_menu(url: &str, timeout: Duration) -> Result<Vec<MenuItem>> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let body = client
        .get(url)
        .send()
        .await
        .context("Failed to fetch menu")?
        .error_for_status()
        .context("Menu source returned an error status")?
        .text()
        .await
        .context("Failed to read menu body")?;

    parse_menu_csv(&body)
}
