use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use oscompute::compute::server::STATUS_ACTIVE;
use oscompute::compute::{
    ComputeService, IpVersion, ListOptions, RebootType, RebuildRequest, ServerCreateRequest,
};
use oscompute::openstack::http::format_api_error;
use oscompute::{ComputeError, Config, OpenStackClient};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for the OpenStack / Rackspace compute API
#[derive(Parser, Debug)]
#[command(name = "oscompute", version, about, long_about = None)]
struct Args {
    /// Region to use (overrides OS_REGION_NAME and the config file)
    #[arg(short, long)]
    region: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Run in read-only mode (block all write operations)
    #[arg(long)]
    readonly: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List servers
    Servers {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        /// Follow pagination links until every server is listed
        #[arg(long)]
        all: bool,
    },
    /// Show one server
    Show { id: String },
    /// Create a server
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        image: String,
        #[arg(long)]
        flavor: String,
        /// Network UUID to attach (repeatable)
        #[arg(long = "network")]
        networks: Vec<String>,
        /// Existing keypair to inject
        #[arg(long)]
        key_name: Option<String>,
        /// File to inject (repeatable)
        #[arg(long = "file", value_name = "REMOTE_PATH=LOCAL_PATH")]
        files: Vec<String>,
        /// Metadata item (repeatable)
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,
        /// Wait until the server is ACTIVE
        #[arg(long)]
        wait: bool,
    },
    /// Delete a server
    Delete { id: String },
    /// Reboot a server
    Reboot {
        id: String,
        /// Power cycle instead of a soft reboot
        #[arg(long)]
        hard: bool,
    },
    /// Rebuild a server from an image
    Rebuild {
        id: String,
        #[arg(long)]
        image: String,
        #[arg(long)]
        admin_pass: String,
    },
    /// Resize a server to another flavor
    Resize { id: String, flavor: String },
    ConfirmResize { id: String },
    RevertResize { id: String },
    /// Change the root/administrator password
    SetPassword { id: String, password: String },
    /// Boot into rescue mode and print the temporary password
    Rescue { id: String },
    Unrescue { id: String },
    /// Snapshot a server into a new image
    CreateImage {
        id: String,
        name: String,
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,
    },
    /// Show server metadata
    Metadata { id: String },
    SetMeta { id: String, key: String, value: String },
    DeleteMeta { id: String, key: String },
    /// Show server addresses, optionally for one network
    Ips { id: String, network: Option<String> },
    /// Print the server's public IP of the given version
    Ip {
        id: String,
        #[arg(long, default_value_t = 4)]
        version: u8,
    },
    AttachVolume {
        id: String,
        volume: String,
        #[arg(long)]
        device: Option<String>,
    },
    DetachVolume { id: String, volume: String },
    /// List volume attachments of a server
    Volumes { id: String },
    Flavors,
    Images,
    Networks,
    Keypairs,
    /// Save the default region to the config file
    UseRegion { region: String },
}

impl Command {
    fn is_write(&self) -> bool {
        !matches!(
            self,
            Command::Servers { .. }
                | Command::Show { .. }
                | Command::Metadata { .. }
                | Command::Ips { .. }
                | Command::Ip { .. }
                | Command::Volumes { .. }
                | Command::Flavors
                | Command::Images
                | Command::Networks
                | Command::Keypairs
                | Command::UseRegion { .. }
        )
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("oscompute started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("oscompute").join("oscompute.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".oscompute").join("oscompute.log");
    }
    PathBuf::from("oscompute.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        eprintln!("{}", error_message(&err));
        std::process::exit(1);
    }
}

fn error_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ComputeError>() {
        Some(compute_err) if compute_err.status().is_some() => {
            format!("Error: {}", format_api_error(compute_err))
        }
        Some(compute_err) if compute_err.is_validation() => format!("Invalid request: {}", compute_err),
        _ => format!("Error: {err:?}"),
    }
}

async fn run(args: Args) -> Result<()> {
    if args.readonly && args.command.is_write() {
        anyhow::bail!("Read-only mode: {:?} is a write operation", args.command);
    }

    if let Command::UseRegion { region } = &args.command {
        let path = args
            .config
            .clone()
            .or_else(Config::config_path)
            .context("No config directory available; pass --config")?;
        Config::save_region(&path, region).context("Failed to save configuration")?;
        println!("Default region set to {} in {}", region, path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_overrides(|name| std::env::var(name).ok());
            config
        }
        None => Config::load(),
    };

    if let Some(region) = &args.region {
        config.region = Some(region.clone());
    }

    let auth = config.auth_config()?;
    let client = OpenStackClient::connect(auth)
        .await
        .context("Failed to authenticate")?;

    let service_name = config.effective_service_name();
    let service = match ComputeService::from_catalog(
        client.clone(),
        &service_name,
        config.region.as_deref(),
        config.effective_url_type()?,
    )
    .await
    {
        Ok(service) => service,
        Err(err @ ComputeError::EndpointNotFound { .. }) => {
            let regions = client.credentials.catalog().await?.regions(&service_name);
            anyhow::bail!("{}; available regions: {}", err, regions.join(", "));
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Using compute endpoint {}", service.endpoint());

    execute(&service, args.command).await
}

async fn execute(service: &ComputeService, command: Command) -> Result<()> {
    match command {
        Command::Servers {
            name,
            status,
            limit,
            all,
        } => {
            let mut options = ListOptions::new();
            if let Some(name) = &name {
                options = options.filter("name", name);
            }
            if let Some(status) = &status {
                options = options.filter("status", status);
            }
            if let Some(limit) = limit {
                options = options.limit(limit);
            }

            let collection = service.server_list(true, &options).await?;
            let servers = if all {
                collection.into_all().await?
            } else {
                collection.into_iter().collect()
            };
            print_json(&servers)
        }
        Command::Show { id } => {
            let server = service.server(Some(&id)).await?;
            print_json(server.state())
        }
        Command::Create {
            name,
            image,
            flavor,
            networks,
            key_name,
            files,
            meta,
            wait,
        } => {
            let mut request = ServerCreateRequest::new(&name, &image, &flavor);
            request.networks = networks;
            request.key_name = key_name;
            request.metadata = parse_pairs(&meta)?;

            let mut server = service.server(None).await?;
            for (remote, local) in parse_pairs(&files)? {
                let contents = std::fs::read(&local).with_context(|| format!("Failed to read {}", local))?;
                server.add_file(&remote, contents);
            }

            server.create(&request).await?;

            if wait {
                server
                    .wait_for_status(STATUS_ACTIVE, Duration::from_secs(1800), Duration::from_secs(10))
                    .await?;
            }
            print_json(server.state())
        }
        Command::Delete { id } => {
            let server = handle(service, &id).await?;
            print_status(server.delete().await?)
        }
        Command::Reboot { id, hard } => {
            let reboot_type = if hard { RebootType::Hard } else { RebootType::Soft };
            print_status(handle(service, &id).await?.reboot(reboot_type).await?)
        }
        Command::Rebuild { id, image, admin_pass } => {
            let server = handle(service, &id).await?;
            print_status(server.rebuild(&RebuildRequest::new(&image, &admin_pass)).await?)
        }
        Command::Resize { id, flavor } => print_status(handle(service, &id).await?.resize(&flavor).await?),
        Command::ConfirmResize { id } => print_status(handle(service, &id).await?.confirm_resize().await?),
        Command::RevertResize { id } => print_status(handle(service, &id).await?.revert_resize().await?),
        Command::SetPassword { id, password } => {
            print_status(handle(service, &id).await?.set_password(&password).await?)
        }
        Command::Rescue { id } => {
            let password = handle(service, &id).await?.rescue().await?;
            println!("{}", password);
            Ok(())
        }
        Command::Unrescue { id } => print_status(handle(service, &id).await?.unrescue().await?),
        Command::CreateImage { id, name, meta } => {
            let metadata = parse_pairs(&meta)?;
            match handle(service, &id).await?.create_image(&name, &metadata).await? {
                Some(image_id) => println!("{}", image_id),
                None => println!("Image requested; the service did not report its ID"),
            }
            Ok(())
        }
        Command::Metadata { id } => {
            let metadata = handle(service, &id).await?.metadata().await?;
            print_json(metadata.items())
        }
        Command::SetMeta { id, key, value } => {
            let mut metadata = handle(service, &id).await?.metadata().await?;
            metadata.set_item(&key, &value).await?;
            print_json(metadata.items())
        }
        Command::DeleteMeta { id, key } => {
            let mut metadata = handle(service, &id).await?.metadata().await?;
            metadata.delete_item(&key).await?;
            print_json(metadata.items())
        }
        Command::Ips { id, network } => {
            let addresses = handle(service, &id).await?.ips(network.as_deref()).await?;
            print_json(&addresses)
        }
        Command::Ip { id, version } => {
            let version = match version {
                4 => IpVersion::V4,
                6 => IpVersion::V6,
                other => anyhow::bail!("IP version must be 4 or 6, got {}", other),
            };
            let server = service.server(Some(&id)).await?;
            println!("{}", server.ip(version)?);
            Ok(())
        }
        Command::AttachVolume { id, volume, device } => {
            print_status(handle(service, &id).await?.attach_volume(&volume, device.as_deref()).await?)
        }
        Command::DetachVolume { id, volume } => {
            print_status(handle(service, &id).await?.detach_volume(&volume).await?)
        }
        Command::Volumes { id } => {
            let attachments = handle(service, &id).await?.volume_attachment_list().await?;
            print_json(&attachments.into_all().await?)
        }
        Command::Flavors => {
            let flavors = service.flavor_list(true, &ListOptions::new()).await?;
            print_json(&flavors.into_all().await?)
        }
        Command::Images => {
            let images = service.image_list(true, &ListOptions::new()).await?;
            print_json(&images.into_all().await?)
        }
        Command::Networks => print_json(&service.network_list().await?),
        Command::Keypairs => print_json(&service.keypair_list().await?),
        Command::UseRegion { .. } => Ok(()),
    }
}

/// Server handle addressed by ID, without fetching its state
async fn handle(service: &ComputeService, id: &str) -> Result<oscompute::Server> {
    let mut server = service.server(None).await?;
    server.set_id(id);
    Ok(server)
}

fn parse_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("Expected KEY=VALUE, got '{}'", pair))
        })
        .collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_status(status: reqwest::StatusCode) -> Result<()> {
    println!("{}", status);
    Ok(())
}
