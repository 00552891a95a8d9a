pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use config::Config;
use db::Store;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "daemon" | "-d" | "--daemon" => run_daemon(config, prometheus_handle).await,

        "hostels" => cmd_list_hostels(&config).await,

        "add-hostel" => {
            if args.len() < 4 {
                println!("Usage: gatepass add-hostel <name> <gender> [slug]");
                println!("Example: gatepass add-hostel \"Aravali House\" male");
                return Ok(());
            }
            let slug = args.get(4).cloned();
            cmd_add_hostel(&config, &args[2], &args[3], slug.as_deref()).await
        }

        "students" => {
            if args.len() < 3 {
                println!("Usage: gatepass students <hostel_slug>");
                return Ok(());
            }
            cmd_list_students(&config, &args[2]).await
        }

        "add-student" => {
            if args.len() < 6 {
                println!(
                    "Usage: gatepass add-student <hostel_slug> <name> <email> <roll_number> [room]"
                );
                return Ok(());
            }
            let room = args.get(6).cloned();
            cmd_add_student(
                &config,
                &args[2],
                &args[3],
                &args[4],
                &args[5],
                room.as_deref(),
            )
            .await
        }

        "add-user" => {
            if args.len() < 6 {
                println!("Usage: gatepass add-user <username> <email> <password> <role>");
                println!("Roles: student, warden, guard, admin");
                return Ok(());
            }
            cmd_add_user(&config, &args[2], &args[3], &args[4], &args[5]).await
        }

        "passes" => {
            if args.len() < 3 {
                println!("Usage: gatepass passes <hostel_slug>");
                return Ok(());
            }
            cmd_list_passes(&config, &args[2]).await
        }

        "regen-key" => {
            if args.len() < 3 {
                println!("Usage: gatepass regen-key <username>");
                return Ok(());
            }
            cmd_regen_key(&config, &args[2]).await
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        other => {
            println!("Unknown command: {}", other);
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("gatepass v{} - hostel out-pass lifecycle service", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: gatepass <command> [args]");
    println!();
    println!("Commands:");
    println!("  daemon                    Start the web API");
    println!("  hostels                   List hostels");
    println!("  add-hostel <name> <gender> [slug]");
    println!("  students <hostel_slug>    List hostelers of a hostel");
    println!("  add-student <hostel_slug> <name> <email> <roll_number> [room]");
    println!("  add-user <username> <email> <password> <role>");
    println!("  passes <hostel_slug>      List recent out-passes of a hostel");
    println!("  regen-key <username>      Regenerate a user's API key");
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("Gatepass v{} starting...", env!("CARGO_PKG_VERSION"));

    if !config.server.enabled {
        anyhow::bail!("server.enabled is false; nothing to run");
    }
    let port = config.server.port;

    let state = api::create_app_state_from_config(config, prometheus_handle).await?;
    let app = api::router(state).await;

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("Web API running at http://0.0.0.0:{}", port);
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    server_handle.abort();
    info!("Daemon stopped");

    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::new(&config.general.database_path).await
}

fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

async fn resolve_hostel(store: &Store, slug: &str) -> anyhow::Result<crate::models::Hostel> {
    store
        .get_hostel_by_slug(slug)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No hostel with slug '{slug}'. Run 'gatepass hostels'."))
}

async fn cmd_list_hostels(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let hostels = store.list_hostels().await?;

    if hostels.is_empty() {
        println!("No hostels yet. Add one with: gatepass add-hostel <name> <gender>");
        return Ok(());
    }

    for hostel in hostels {
        println!("#{:<4} {:<24} {:<8} ({})", hostel.id, hostel.name, hostel.gender, hostel.slug);
    }
    Ok(())
}

async fn cmd_add_hostel(
    config: &Config,
    name: &str,
    gender: &str,
    slug: Option<&str>,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let slug = slug.map_or_else(|| slugify(name), str::to_string);

    if store.get_hostel_by_slug(&slug).await?.is_some() {
        println!("Hostel slug '{}' already exists.", slug);
        return Ok(());
    }

    let hostel = store.add_hostel(name, &slug, gender).await?;
    println!("Created hostel #{} ({})", hostel.id, hostel.slug);
    Ok(())
}

async fn cmd_list_students(config: &Config, hostel_slug: &str) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let hostel = resolve_hostel(&store, hostel_slug).await?;

    let hostelers = store.list_hostelers(hostel.id).await?;
    if hostelers.is_empty() {
        println!("No hostelers in {} yet.", hostel.name);
        return Ok(());
    }

    for h in hostelers {
        let ban = if h.banned { " [BANNED]" } else { "" };
        println!(
            "#{:<4} {:<12} {:<24} room {:<8} {}{}",
            h.id, h.roll_number, h.name, h.room_number, h.email, ban
        );
    }
    Ok(())
}

async fn cmd_add_student(
    config: &Config,
    hostel_slug: &str,
    name: &str,
    email: &str,
    roll_number: &str,
    room: Option<&str>,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let hostel = resolve_hostel(&store, hostel_slug).await?;

    if store.get_hosteler_by_email(email).await?.is_some() {
        println!("A hosteler with email {} already exists.", email);
        return Ok(());
    }

    let hosteler = store
        .add_hosteler(&db::NewHosteler {
            name: name.to_string(),
            email: email.to_string(),
            roll_number: roll_number.to_string(),
            hostel_id: hostel.id,
            room_number: room.unwrap_or(domain::UNKNOWN_ROOM).to_string(),
        })
        .await?;

    println!(
        "Registered hosteler #{} ({}) in {}",
        hosteler.id, hosteler.roll_number, hostel.name
    );
    println!("Give them a login with: gatepass add-user <username> {} <password> student", email);
    Ok(())
}

async fn cmd_add_user(
    config: &Config,
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<()> {
    api::auth::Role::parse(role).map_err(|e| anyhow::anyhow!(e))?;

    let store = open_store(config).await?;
    if store.get_user(username).await?.is_some() {
        println!("User '{}' already exists.", username);
        return Ok(());
    }

    let user = store
        .create_user(username, email, password, role, &config.security)
        .await?;

    println!("Created user '{}' with role {}", user.username, user.role);
    println!("API key: {}", user.api_key);
    Ok(())
}

async fn cmd_list_passes(config: &Config, hostel_slug: &str) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let hostel = resolve_hostel(&store, hostel_slug).await?;

    let filter = models::HostelPageFilter {
        limit: config.policy.hostel_page_limit,
        ..Default::default()
    };
    let rows = store.list_outpasses_for_hostel(hostel.id, &filter).await?;

    if rows.is_empty() {
        println!("No out-passes for {} yet.", hostel.name);
        return Ok(());
    }

    for row in rows {
        println!(
            "#{:<4} {:<12} {:<10} {:<10} out {} till {}",
            row.pass.id,
            row.student.roll_number,
            row.pass.reason,
            row.pass.status,
            row.pass.expected_out_time,
            row.pass.valid_till
        );
    }
    Ok(())
}

async fn cmd_regen_key(config: &Config, username: &str) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let key = store.regenerate_user_api_key(username).await?;
    println!("New API key for {}: {}", username, key);
    Ok(())
}
