use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use grid_inventory::{EventStream, Inventory, InventoryEvent, InventoryUpdate, NodeRef, EVENT_CHANNEL_CAPACITY};
use grid_sync::{InventoryClient, RecordingTransport, SyncConfig, SyncError};
use grid_types::parse_records;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::warn;

use crate::cli::*;
use crate::manifest::Manifest;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Tree(args) => cmd_tree(args, cli.format),
        Command::Find(args) => cmd_find(args, cli.format),
        Command::Parse(args) => cmd_parse(args, cli.format),
        Command::Replay(args) => cmd_replay(args, cli.format, config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SyncConfig> {
    let Some(path) = path else {
        return Ok(SyncConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn cmd_tree(args: TreeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let loaded = Manifest::load(&args.manifest)?.build()?;
    let inventory = &loaded.inventory;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tree_json(&inventory.root()))?),
        OutputFormat::Text => {
            for line in render_tree(inventory, args.ids) {
                println!("{line}");
            }
            let linked = inventory.descendants(inventory.root_id())?.len() + 1;
            let unlinked = inventory.len() - linked;
            if unlinked > 0 {
                println!("{} {} node(s) waiting for a parent folder", "!".yellow().bold(), unlinked);
            }
            if loaded.rejected > 0 {
                println!("{} {} item(s) rejected (not owned)", "!".yellow().bold(), loaded.rejected);
            }
        }
    }
    Ok(())
}

fn cmd_find(args: FindArgs, format: OutputFormat) -> anyhow::Result<()> {
    let loaded = Manifest::load(&args.manifest)?.build()?;
    let matches = loaded.inventory.path_resolve_str(&args.path);
    match format {
        OutputFormat::Json => {
            let records: Vec<_> = matches.iter().filter_map(NodeRef::record).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Text => {
            if matches.is_empty() {
                println!("No match for {}", args.path.yellow());
            }
            for node in &matches {
                println!("{}  {}", node.id().to_string().dimmed(), label(node));
            }
        }
    }
    Ok(())
}

fn cmd_parse(args: ParseArgs, format: OutputFormat) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let records = parse_records(&text).with_context(|| format!("parsing {}", args.file.display()))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => {
            for record in &records {
                print!("{record}");
            }
            eprintln!("{} {} record(s)", "✓".green(), records.len());
        }
    }
    Ok(())
}

fn cmd_replay(args: ReplayArgs, format: OutputFormat, config: SyncConfig) -> anyhow::Result<()> {
    let loaded = Manifest::load(&args.manifest)?.build()?;
    let text = std::fs::read_to_string(&args.updates)
        .with_context(|| format!("reading {}", args.updates.display()))?;
    let updates: Vec<InventoryUpdate> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", args.updates.display()))?;

    let runtime = tokio::runtime::Runtime::new()?;
    let client = InventoryClient::new(loaded.inventory, Arc::new(RecordingTransport::new()), config);
    let report = runtime.block_on(replay(&client, updates))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            for event in &report.events {
                let name = client
                    .inventory()
                    .lookup(event.id())
                    .and_then(|n| n.name())
                    .unwrap_or_default();
                let tag = match event {
                    InventoryEvent::Added(_) => "added".green(),
                    InventoryEvent::Updated(_) => "updated".cyan(),
                    InventoryEvent::Removed(_) => "removed".red(),
                };
                println!("{tag:>8} {} {}", event.id().short().dimmed(), name);
            }
            if report.dropped > 0 {
                println!("{}", format!("{} events were dropped before they could be read", report.dropped).yellow());
            }
            for line in render_tree(client.inventory(), false) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// Updates handed to one pump before its events are collected. Half the
/// event channel leaves room for adoptions a batch may trigger.
const REPLAY_BATCH: usize = EVENT_CHANNEL_CAPACITY / 2;

#[derive(Debug, Default, Serialize)]
struct ReplayReport {
    events: Vec<InventoryEvent>,
    /// Events the broadcast channel overwrote before they were read.
    dropped: u64,
}

impl ReplayReport {
    fn collect(&mut self, events: &mut EventStream) {
        loop {
            match events.try_recv() {
                Ok(event) => self.events.push(event),
                Err(TryRecvError::Lagged(n)) => self.dropped += n,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

/// Push `updates` through the client's update pump in batches and collect
/// the events each batch produced.
async fn replay(client: &InventoryClient, updates: Vec<InventoryUpdate>) -> anyhow::Result<ReplayReport> {
    let mut events = client.inventory().subscribe();
    let mut report = ReplayReport::default();
    let mut updates = updates.into_iter();
    loop {
        let batch: Vec<InventoryUpdate> = updates.by_ref().take(REPLAY_BATCH).collect();
        if batch.is_empty() {
            break;
        }
        let (tx, rx) = client.update_channel();
        let pump = client.spawn_update_pump(rx);
        for update in batch {
            tx.send(update).await.map_err(|_| SyncError::ChannelClosed)?;
        }
        drop(tx);
        pump.await?;
        report.collect(&mut events);
    }
    if report.dropped > 0 {
        warn!(dropped = report.dropped, "event stream lagged during replay");
    }
    Ok(report)
}

fn label(node: &NodeRef) -> String {
    let name = node.name().unwrap_or_default();
    if node.is_folder() {
        format!("{}/", name.blue().bold())
    } else {
        let kind = node.item().map(|i| i.asset_type.to_string()).unwrap_or_default();
        format!("{} {}", name, format!("({kind})").dimmed())
    }
}

fn render_tree(inventory: &Inventory, ids: bool) -> Vec<String> {
    fn walk(node: &NodeRef, depth: usize, ids: bool, out: &mut Vec<String>) {
        let id = if ids { format!(" {}", node.id().short().dimmed()) } else { String::new() };
        out.push(format!("{}{}{}", "  ".repeat(depth), label(node), id));
        for child in node.contents() {
            walk(&child, depth + 1, ids, out);
        }
    }
    let mut out = Vec::new();
    walk(&inventory.root(), 0, ids, &mut out);
    out
}

fn tree_json(node: &NodeRef) -> Value {
    let mut value = json!({
        "id": node.id(),
        "name": node.name(),
        "folder": node.is_folder(),
    });
    if node.is_folder() {
        value["contents"] = node.contents().iter().map(tree_json).collect();
    }
    value
}
