use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use mediasync::{
    AppConfig, AppState, BlobCodec, ConnectionPool, Identity, LifecycleState, LocalRecordStore,
    MediaPayload, Record, SqliteRecordStore,
};
use serde::Serialize;
use std::env;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List {
        owner: Option<String>,
        state: Option<LifecycleState>,
    },
    Show {
        id: String,
    },
    Reconcile {
        owner: String,
        display_name: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct CliOptions {
    command: Command,
    database_url: Option<String>,
    pretty: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetSummary {
    kind: String,
    slot_index: u32,
    content_type: String,
    form: &'static str,
    url: Option<String>,
    byte_len: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordSummary {
    id: String,
    owner_id: String,
    owner_name: String,
    lifecycle_state: LifecycleState,
    title: String,
    description: String,
    categories: Vec<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    assets: Vec<AssetSummary>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    remote_synced_at: Option<DateTime<Utc>>,
}

impl From<&Record> for RecordSummary {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            owner_id: record.owner_id.clone(),
            owner_name: record.owner_name.clone(),
            lifecycle_state: record.lifecycle_state,
            title: record.title.clone(),
            description: record.description.clone(),
            categories: record.categories.iter().cloned().collect(),
            latitude: record.location.map(|point| point.lat()),
            longitude: record.location.map(|point| point.lon()),
            assets: record
                .assets
                .iter()
                .map(|asset| AssetSummary {
                    kind: asset.kind.to_string(),
                    slot_index: asset.slot_index,
                    content_type: asset.content_type.clone(),
                    form: asset.payload.form(),
                    url: asset.reference_url().map(str::to_string),
                    byte_len: match &asset.payload {
                        MediaPayload::Live(live) => Some(live.len()),
                        MediaPayload::Embedded(embedded) => Some(embedded.byte_len),
                        MediaPayload::Referenced(_) => None,
                    },
                })
                .collect(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            remote_synced_at: record.remote_synced_at,
        }
    }
}

fn usage() -> &'static str {
    "Usage: record_sync_inspect <command> [--database-url <url>] [--pretty]\n\
     Commands:\n  \
       list [--owner <id>] [--state <draft|private|posted>]\n  \
       show <record-id>\n  \
       reconcile --owner <id> [--display-name <name>]"
}

fn main() -> Result<()> {
    mediasync::init_logging();
    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_args(args)?;

    let runtime = Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(run(options))
}

async fn run(options: CliOptions) -> Result<()> {
    let mut config = AppConfig::from_env();
    if let Some(url) = options.database_url.clone() {
        config.database.url = url;
    }

    match options.command {
        Command::List { owner, state } => {
            let store = open_store(&config).await?;
            let records = match owner {
                Some(owner) => store.list_by_owner(&owner, state).await?,
                None => store
                    .get_all()
                    .await?
                    .into_iter()
                    .filter(|record| state.is_none_or(|state| record.lifecycle_state == state))
                    .collect(),
            };
            let summaries: Vec<RecordSummary> = records.iter().map(RecordSummary::from).collect();
            print_json(&summaries, options.pretty)
        }
        Command::Show { id } => {
            let store = open_store(&config).await?;
            let Some(record) = store.get(&id).await? else {
                bail!("Record {id} not found in {}", config.database.url);
            };
            print_json(&RecordSummary::from(&record), options.pretty)
        }
        Command::Reconcile {
            owner,
            display_name,
        } => {
            if config.remote.records_base_url.is_none() {
                bail!("reconcile needs MEDIASYNC_REMOTE_URL to point at the remote record store");
            }
            let state = AppState::new(config).await?;
            state
                .auth
                .sign_in(Identity::new(
                    owner.clone(),
                    display_name.unwrap_or_else(|| owner.clone()),
                ))
                .await;
            let report = state.coordinator.reconcile_all(&owner).await?;
            println!(
                "Reconciled {owner}: pulled {}, inserted {}, overwritten {}, local-only {}",
                report.pulled, report.inserted, report.overwritten, report.preserved_local_only
            );
            state.shutdown().await;
            Ok(())
        }
    }
}

async fn open_store(config: &AppConfig) -> Result<SqliteRecordStore> {
    let pool = ConnectionPool::from_config(&config.database)
        .await
        .with_context(|| format!("Failed to open {}", config.database.url))?;
    let store = SqliteRecordStore::new(pool, BlobCodec::new(&config.media));
    store
        .initialize()
        .await
        .context("Failed to migrate local store")?;
    Ok(store)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{payload}");
    Ok(())
}

fn parse_args<I>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter();
    let Some(command_name) = iter.next() else {
        bail!("Missing command\n{}", usage());
    };
    if matches!(command_name.as_str(), "-h" | "--help") {
        println!("{}", usage());
        std::process::exit(0);
    }

    let mut database_url: Option<String> = None;
    let mut pretty = false;
    let mut owner: Option<String> = None;
    let mut state: Option<LifecycleState> = None;
    let mut display_name: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--database-url" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--database-url requires a value\n{}", usage())
                })?;
                database_url = Some(value);
            }
            "--pretty" => {
                pretty = true;
            }
            "--owner" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--owner requires a value\n{}", usage()))?;
                owner = Some(value);
            }
            "--state" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--state requires a value\n{}", usage()))?;
                state = Some(
                    value
                        .parse::<LifecycleState>()
                        .map_err(|err| anyhow::anyhow!("{err}\n{}", usage()))?,
                );
            }
            "--display-name" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--display-name requires a value\n{}", usage())
                })?;
                display_name = Some(value);
            }
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other if other.starts_with('-') => {
                bail!("Unknown argument: {other}\n{}", usage());
            }
            _ => positional.push(arg),
        }
    }

    let command = match command_name.as_str() {
        "list" => Command::List { owner, state },
        "show" => {
            let Some(id) = positional.pop() else {
                bail!("show requires a record id\n{}", usage());
            };
            Command::Show { id }
        }
        "reconcile" => {
            let Some(owner) = owner else {
                bail!("reconcile requires --owner\n{}", usage());
            };
            Command::Reconcile {
                owner,
                display_name,
            }
        }
        other => bail!("Unknown command: {other}\n{}", usage()),
    };

    Ok(CliOptions {
        command,
        database_url,
        pretty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_list_filters() {
        let options = parse_args(args(&["list", "--owner", "owner-1", "--state", "posted"])).unwrap();
        assert_eq!(
            options.command,
            Command::List {
                owner: Some("owner-1".to_string()),
                state: Some(LifecycleState::Posted),
            }
        );
    }

    #[test]
    fn show_requires_id() {
        assert!(parse_args(args(&["show"])).is_err());
        let options = parse_args(args(&["show", "rec-1", "--pretty"])).unwrap();
        assert_eq!(options.command, Command::Show { id: "rec-1".to_string() });
        assert!(options.pretty);
    }

    #[test]
    fn reconcile_requires_owner() {
        assert!(parse_args(args(&["reconcile"])).is_err());
        assert!(parse_args(args(&["list", "--state", "archived"])).is_err());
        assert!(parse_args(args(&["sync"])).is_err());
    }
}
