//! Command execution for the `pantry` binary.
//!
//! Every command waits for the initial inventory load before acting and for
//! pending writes before returning.

use std::io::Write;

use anyhow::{Context, bail};
use chrono::Local;

use pantry_core::{DomainError, Entity, ItemId};
use pantry_detection::{ImagePayload, ScanError, ScanOutcome};
use pantry_inventory::{
    Category, InventoryItem, InventoryQuery, ItemPatch, NewItem, Quantity, parse_expiry,
};

use crate::cli::{Command, DarkModeAction};
use crate::settings::Preferences;
use crate::state::AppState;

pub async fn execute<W: Write>(state: &AppState, command: Command, out: &mut W) -> anyhow::Result<()> {
    state.store.ready().await;
    let result = dispatch(state, command, out).await;
    state.store.flush().await;
    result
}

async fn dispatch<W: Write>(state: &AppState, command: Command, out: &mut W) -> anyhow::Result<()> {
    match command {
        Command::List {
            category,
            search,
            json,
        } => list(state, category.as_deref(), search, json, out),
        Command::Add {
            name,
            quantity,
            category,
            expires,
        } => add(state, name, quantity, category, expires.as_deref(), out),
        Command::Update {
            id,
            name,
            quantity,
            category,
            expires,
            clear_expiry,
        } => {
            let mut patch = ItemPatch::new();
            patch.name = name;
            patch.category = category;
            if let Some(quantity) = quantity {
                patch.quantity = Some(Quantity::new(quantity)?);
            }
            if clear_expiry {
                patch.expiry_date = Some(None);
            } else if let Some(raw) = expires.as_deref() {
                patch.expiry_date = Some(Some(expiry_arg(raw)?));
            }
            update(state, &id, patch, out)
        }
        Command::Remove { id } => remove(state, &id, out),
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to clear the inventory without --yes");
            }
            let count = state.store.len();
            state.store.clear_inventory();
            writeln!(out, "Cleared {count} item(s).")?;
            Ok(())
        }
        Command::Scan { image } => {
            let payload = ImagePayload::from_path(&image)
                .await
                .with_context(|| format!("failed to load image {}", image.display()))?;
            scan(state, &payload, out).await
        }
        Command::Summary {
            low_stock,
            within_days,
        } => {
            let summary = state
                .store
                .summary(Local::now().date_naive(), low_stock, within_days);
            writeln!(out, "Items in pantry: {}", summary.total_items)?;
            writeln!(out, "Total quantity:  {}", summary.total_quantity)?;
            writeln!(out, "Items low:       {}", summary.low_stock)?;
            writeln!(out, "Expiring soon:   {}", summary.expiring_soon)?;
            writeln!(out, "Expired:         {}", summary.expired)?;
            Ok(())
        }
        Command::DarkMode { action } => {
            let mut prefs = Preferences::load(state.kv.clone()).await;
            if action == DarkModeAction::Toggle {
                prefs
                    .toggle_dark_mode()
                    .await
                    .context("failed to save dark-mode preference")?;
            }
            let label = if prefs.is_dark_mode() { "on" } else { "off" };
            writeln!(out, "Dark mode: {label}")?;
            Ok(())
        }
    }
}

fn list<W: Write>(
    state: &AppState,
    category: Option<&str>,
    search: Option<String>,
    json: bool,
    out: &mut W,
) -> anyhow::Result<()> {
    let category = match category.map(str::trim) {
        None => None,
        Some(raw) if raw.eq_ignore_ascii_case("all") => None,
        Some(raw) => Some(raw.parse::<Category>()?),
    };
    let query = InventoryQuery { category, search };
    let items = state.store.query(&query);

    if json {
        serde_json::to_writer_pretty(&mut *out, &items).context("failed to encode items")?;
        writeln!(out)?;
        return Ok(());
    }

    if items.is_empty() {
        writeln!(out, "No items.")?;
        return Ok(());
    }
    for item in &items {
        write_item(out, item)?;
    }
    Ok(())
}

fn add<W: Write>(
    state: &AppState,
    name: String,
    quantity: u32,
    category: Category,
    expires: Option<&str>,
    out: &mut W,
) -> anyhow::Result<()> {
    let expiry = expires.map(expiry_arg).transpose()?;
    let candidate = NewItem::new(name, Quantity::new(quantity)?, category)?.with_expiry(expiry);

    let outcome = state.store.add_item(candidate);
    let verb = if outcome.is_merge() { "Merged" } else { "Added" };
    write!(out, "{verb}: ")?;
    write_item(out, outcome.item())?;
    Ok(())
}

fn update<W: Write>(state: &AppState, id: &str, patch: ItemPatch, out: &mut W) -> anyhow::Result<()> {
    let id: ItemId = id.parse()?;
    match state.store.update_item(&id, patch) {
        Ok(Some(item)) => {
            write!(out, "Updated: ")?;
            write_item(out, &item)?;
        }
        Ok(None) => writeln!(out, "No item with id {id}.")?,
        Err(DomainError::Conflict(msg)) => bail!("cannot rename: {msg}"),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn remove<W: Write>(state: &AppState, id: &str, out: &mut W) -> anyhow::Result<()> {
    let id: ItemId = id.parse()?;
    match state.store.remove_item(&id) {
        Some(item) => writeln!(out, "Removed {}.", item.name())?,
        None => writeln!(out, "No item with id {id}.")?,
    }
    Ok(())
}

async fn scan<W: Write>(state: &AppState, image: &ImagePayload, out: &mut W) -> anyhow::Result<()> {
    match state.scanner.scan(image).await {
        Ok(ScanOutcome::Added(items)) => {
            writeln!(out, "Items detected and added to inventory:")?;
            for ingested in &items {
                let item = ingested.outcome.item();
                writeln!(
                    out,
                    "  {} ({}) now x{}",
                    item.name(),
                    item.category(),
                    item.quantity()
                )?;
            }
            Ok(())
        }
        Ok(ScanOutcome::NothingDetected) => {
            writeln!(out, "No items detected.")?;
            Ok(())
        }
        Err(ScanError::Busy) => bail!("a scan is already in progress"),
        Err(err) => Err(err).context("failed to detect objects"),
    }
}

fn expiry_arg(raw: &str) -> anyhow::Result<chrono::NaiveDate> {
    parse_expiry(raw).with_context(|| format!("invalid expiry date `{raw}` (expected YYYY-MM-DD)"))
}

fn write_item<W: Write>(out: &mut W, item: &InventoryItem) -> std::io::Result<()> {
    let expiry = item
        .expiry_date()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    writeln!(
        out,
        "{}  {}  x{}  {}  expires {}",
        item.id(),
        item.name(),
        item.quantity(),
        item.category(),
        expiry
    )
}
