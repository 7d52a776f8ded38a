use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use roster_config::{get_log_dir, Config};
use roster_output::*;
use roster_registry::Registry;
use roster_store::StoreOptions;
use roster_types::*;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MAIN_HELP: &str = r#"Roster keeps a local registry of users (name, email, age) in an embedded
LMDB database and lets you search, sort and page through it.

`roster add` creates a user, `roster edit ID` changes one, and `roster rm ID
--yes` deletes one. `roster list` shows a page of users: `--search TEXT`
matches name, email or age, `--newest-first`, `--age-desc` and `--name-desc`
flip the sort toggles, and `--page`/`--page-size` select the page.

Only one sort toggle is honoured at a time unless `view.sort_policy` is set
to "combined" in the config: newest-first beats age-desc beats name order.

See `roster COMMAND --help` for more documentation and command-specific options."#;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = MAIN_HELP)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Output as JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Precedence,
    Combined,
}

impl From<PolicyArg> for SortPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Precedence => SortPolicy::Precedence,
            PolicyArg::Combined => SortPolicy::Combined,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a user.")]
    Add {
        #[arg(short, long, help = "Name (2-20 characters)")]
        name: String,
        #[arg(short, long, help = "Email (at most 30 characters)")]
        email: String,
        #[arg(short, long, allow_negative_numbers = true, help = "Age (0-120)")]
        age: i64,
    },

    #[command(about = "Change fields of an existing user. Omitted fields are kept.")]
    Edit {
        #[arg(help = "User id")]
        id: u64,
        #[arg(short, long, help = "New name (2-20 characters)")]
        name: Option<String>,
        #[arg(short, long, help = "New email (at most 30 characters)")]
        email: Option<String>,
        #[arg(short, long, allow_negative_numbers = true, help = "New age (0-120)")]
        age: Option<i64>,
    },

    #[command(about = "Delete a user permanently.")]
    Rm {
        #[arg(help = "User id")]
        id: u64,
        #[arg(short = 'y', long, help = "Confirm the deletion")]
        yes: bool,
    },

    #[command(about = "Show a page of users.")]
    List {
        #[arg(short, long, help = "Case-insensitive match on name, email or age")]
        search: Option<String>,
        #[arg(long, help = "Newest users first")]
        newest_first: bool,
        #[arg(long, help = "Oldest age first")]
        age_desc: bool,
        #[arg(long, help = "Names Z-A")]
        name_desc: bool,
        #[arg(short, long, default_value_t = 1, help = "Page number (1-based)")]
        page: usize,
        #[arg(short = 'n', long, help = "Users per page (defaults to view.page_size)")]
        page_size: Option<usize>,
        #[arg(long, help = "Do not truncate long names")]
        full_names: bool,
    },

    #[command(about = "Show one user in full.")]
    Show {
        #[arg(help = "User id")]
        id: u64,
    },

    #[command(about = "Show database location and size.")]
    Stats,

    #[command(about = "Show or change the configuration.")]
    Config {
        #[arg(long, help = "Default users per page")]
        page_size: Option<usize>,
        #[arg(long, value_enum, help = "How the sort toggles combine")]
        sort_policy: Option<PolicyArg>,
        #[arg(long, help = "Database directory")]
        store_path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_logging(&config)?;

    match cli.command {
        Commands::Add { name, email, age } => {
            let registry = open_registry(&config).await?;
            handle_add(&registry, cli.json, name, email, age).await
        }
        Commands::Edit {
            id,
            name,
            email,
            age,
        } => {
            let registry = open_registry(&config).await?;
            handle_edit(&registry, cli.json, id, name, email, age).await
        }
        Commands::Rm { id, yes } => {
            let registry = open_registry(&config).await?;
            handle_rm(&registry, cli.json, id, yes).await
        }
        Commands::List {
            search,
            newest_first,
            age_desc,
            name_desc,
            page,
            page_size,
            full_names,
        } => {
            let mut params = ViewParams::with_page_size(page_size.unwrap_or(config.view.page_size));
            if let Some(size) = page_size {
                if !config.is_allowed_page_size(size) {
                    return Err(anyhow!(
                        "Page size {} is not one of {:?}",
                        size,
                        config.view.page_sizes
                    ));
                }
            }
            params.search_term = search.unwrap_or_default();
            if newest_first {
                params.sort.toggle_creation();
            }
            if age_desc {
                params.sort.toggle_age();
            }
            if name_desc {
                params.sort.toggle_name();
            }
            params.current_page = page;

            let name_width = if full_names {
                0
            } else {
                config.display.name_width
            };
            let registry = open_registry(&config).await?;
            handle_list(&registry, &config, cli.json, params, name_width).await
        }
        Commands::Show { id } => {
            let registry = open_registry(&config).await?;
            handle_show(&registry, cli.json, id).await
        }
        Commands::Stats => {
            let registry = open_registry(&config).await?;
            handle_stats(&registry, cli.json).await
        }
        Commands::Config {
            page_size,
            sort_policy,
            store_path,
        } => handle_config(config, cli.json, page_size, sort_policy, store_path),
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let log_dir = get_log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("roster.log"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    Ok(())
}

async fn open_registry(config: &Config) -> Result<Registry> {
    let store_path = config.store_path();
    let options = StoreOptions {
        map_size: config.store.map_size,
    };
    let params = ViewParams::with_page_size(config.view.page_size);
    let registry = Registry::open(&store_path, options, config.view.sort_policy, params).await?;
    info!("Using store at {}", store_path.display());
    Ok(registry)
}

fn validated(name: &str, email: &str, age: i64) -> Result<NewUser> {
    NewUser::validated(name, email, age)
        .map_err(|errors| anyhow!("Invalid user:\n{}", format_validation_errors(&errors)))
}

async fn handle_add(
    registry: &Registry,
    json: bool,
    name: String,
    email: String,
    age: i64,
) -> Result<()> {
    let user = validated(&name, &email, age)?;
    let created = registry.create(user).await?;

    if json {
        println!("{}", format_json(&created));
    } else {
        println!("Created #{} {}", created.id, created.name);
    }
    Ok(())
}

async fn handle_edit(
    registry: &Registry,
    json: bool,
    id: u64,
    name: Option<String>,
    email: Option<String>,
    age: Option<i64>,
) -> Result<()> {
    let existing = registry
        .get(id)
        .await?
        .ok_or_else(|| anyhow!("No user with id {}", id))?;

    let name = name.unwrap_or_else(|| existing.name.clone());
    let email = email.unwrap_or_else(|| existing.email.clone());
    let age = age.unwrap_or(i64::from(existing.age));
    let fields = validated(&name, &email, age)?;

    let updated = existing.with_fields(fields);
    registry.update(updated.clone()).await?;

    if json {
        println!("{}", format_json(&updated));
    } else {
        println!("Updated #{} {}", updated.id, updated.name);
    }
    Ok(())
}

async fn handle_rm(registry: &Registry, json: bool, id: u64, yes: bool) -> Result<()> {
    let existing = registry.get(id).await?;

    if !yes {
        let who = existing
            .map(|u| format!("#{} {}", u.id, u.name))
            .unwrap_or_else(|| format!("#{}", id));
        return Err(anyhow!("Refusing to delete {} without --yes", who));
    }

    let removed = registry.delete(id).await?;

    if json {
        println!("{}", format_json(&json!({"id": id, "removed": removed})));
    } else if removed {
        println!("Deleted #{}", id);
    } else {
        println!("No user with id {}, nothing deleted", id);
    }
    Ok(())
}

async fn handle_list(
    registry: &Registry,
    config: &Config,
    json: bool,
    params: ViewParams,
    name_width: usize,
) -> Result<()> {
    let outcome = registry.set_params(params.clone()).await;

    if json {
        println!(
            "{}",
            format_json(&json!({
                "params": params,
                "sort_policy": config.view.sort_policy,
                "view": outcome,
            }))
        );
    } else {
        println!("{}", format_sort(&params.sort, config.view.sort_policy));
        println!("{}", format_view(&outcome, &params, name_width));
    }
    Ok(())
}

async fn handle_show(registry: &Registry, json: bool, id: u64) -> Result<()> {
    let user = registry
        .get(id)
        .await?
        .ok_or_else(|| anyhow!("No user with id {}", id))?;

    if json {
        println!("{}", format_json(&user));
    } else {
        println!("{}", format_user(&user));
    }
    Ok(())
}

async fn handle_stats(registry: &Registry, json: bool) -> Result<()> {
    let stats = registry.stats().await?;

    if json {
        println!("{}", format_json(&stats));
    } else {
        println!("{}", format_stats(&stats));
    }
    Ok(())
}

fn handle_config(
    config: Config,
    json: bool,
    page_size: Option<usize>,
    sort_policy: Option<PolicyArg>,
    store_path: Option<String>,
) -> Result<()> {
    let changed = page_size.is_some() || sort_policy.is_some() || store_path.is_some();

    if let Some(size) = page_size {
        if !config.is_allowed_page_size(size) {
            return Err(anyhow!(
                "Page size {} is not one of {:?}",
                size,
                config.view.page_sizes
            ));
        }
    }

    let config = if changed {
        Config::edit(|c| {
            if let Some(size) = page_size {
                c.view.page_size = size;
            }
            if let Some(policy) = sort_policy {
                c.view.sort_policy = policy.into();
            }
            if let Some(path) = store_path {
                c.store.path = Some(path);
            }
        })?
    } else {
        config
    };

    if json {
        println!("{}", format_json(&config));
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
