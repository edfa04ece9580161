//! Split-MAC forgery demonstration.
//!
//! ```bash
//! # Serve the oracle over HTTP
//! splitmac serve --bind 127.0.0.1:5000
//!
//! # Walk through tagging, verification and a forgery against it
//! splitmac demo --server http://127.0.0.1:5000
//! ```

use splitmac::{AttackConfig, MacClient, MacService, SessionStore};

use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "splitmac")]
#[command(about = "Existential forgery against a split MAC")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the MAC oracle over HTTP
    Serve(ServeArgs),
    /// Run the whole attack against a running server
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    bind: String,

    /// Random messages the attacker gets tagged before splicing
    #[arg(long, default_value_t = AttackConfig::default().queries)]
    queries: usize,

    /// Length of each of the attacker's probe messages
    #[arg(long, default_value_t = AttackConfig::default().probe_len)]
    probe_len: usize,

    /// Seed for session ids, generated keys and the attacker's choices
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Base URL of the server
    #[arg(short, long, default_value = "http://127.0.0.1:5000")]
    server: String,

    /// Message to tag first, random if omitted
    #[arg(short, long, default_value = "")]
    message: String,

    /// Key for the oracle, random if omitted
    #[arg(short, long, default_value = "")]
    key: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Demo(args) => demo(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = match args.seed {
        Some(seed) => {
            warn!(seed, "using a fixed seed, session ids and keys are predictable");
            SessionStore::seeded(seed)
        }
        None => SessionStore::from_entropy(),
    };
    let attack = AttackConfig {
        queries: args.queries,
        probe_len: args.probe_len,
    };
    let app = MacService::new(sessions, attack).router();

    let listener = TcpListener::bind(&args.bind).await?;
    info!("MAC server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn demo(args: DemoArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = MacClient::new(&args.server);
    info!("{}", client.status().await?.status);

    let generated = client.generate_tag(&args.message, &args.key).await?;
    info!(
        session_id = %generated.session_id,
        message = %generated.message,
        tag = %generated.tag,
        "oracle tagged message"
    );

    let check = client
        .verify_tag(&generated.message, &generated.key, &generated.tag)
        .await?;
    info!(is_valid = check.is_valid, "verified original tag");

    let forgery = client.run_forgery(&generated.session_id).await?;
    for query in &forgery.attack_steps.oracle_queries {
        info!(step = query.step, message = %query.message, tag = %query.tag, "attacker query");
    }
    let chosen = &forgery.attack_steps.chosen_messages;
    info!(
        first = %chosen.message1,
        second = %chosen.message2,
        "spliced {} + {} with tag {} + {}",
        chosen.m0a,
        chosen.m1b,
        chosen.t0a,
        chosen.t1b
    );
    info!(
        message = %forgery.forged_message,
        tag = %forgery.forged_tag,
        success = forgery.success,
        "forgery result"
    );

    client.discard_session(&generated.session_id).await?;
    Ok(())
}
