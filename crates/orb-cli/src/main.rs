mod oracle;
mod render_loop;
mod server;
mod session;
#[cfg(test)]
mod test_support;

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orb_config::Config;
use orb_core::{AiPhase, FrameTime, InteractionState, PhaseEvent, Session, Submit, Viewport, tick};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::oracle::OracleClient;
use crate::render_loop::RenderLoop;
use crate::session::SessionDriver;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "orb", about = "Interactive oracle orb: render loop, oracle client and HTTP surface")]
struct Cli {
    /// Config file (default: $ORB_CONFIG_DIR/config.toml or ~/.orb/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the render loop and serve the HTTP surface
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Consult the oracle once and print the reply
    Ask {
        /// Prompt text
        prompt: String,

        /// Print the reply text instead of rendered HTML
        #[arg(long)]
        raw: bool,
    },

    /// Print animation frames as JSON lines
    Simulate {
        /// Number of frames
        #[arg(long, default_value_t = 60)]
        frames: u64,

        /// AI phase to hold during the run
        #[arg(long, default_value_t = AiPhase::Idle)]
        phase: AiPhase,

        /// Pointer is over the orb
        #[arg(long)]
        hover: bool,

        /// Click once before the first frame
        #[arg(long)]
        click: bool,
    },

    /// Print the resolved configuration (API key redacted)
    Config,
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::load(cli.config.as_deref()).context("failed to load configuration")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve { bind } => cmd_serve(&cli, *bind).await,
        Commands::Ask { prompt, raw } => cmd_ask(&cli, prompt, *raw).await,
        Commands::Simulate {
            frames,
            phase,
            hover,
            click,
        } => cmd_simulate(&cli, *frames, *phase, *hover, *click),
        Commands::Config => cmd_config(&cli),
    }
}

async fn cmd_serve(cli: &Cli, bind: Option<SocketAddr>) -> Result<()> {
    let config = load_config(cli)?;
    let client = OracleClient::new(&config.oracle)?;
    let driver = SessionDriver::new(Session::new(client.model()), client);

    let viewport = Viewport::new(
        config.render.width,
        config.render.height,
        config.render.pixel_ratio,
    );
    let (render, resize, frames) =
        RenderLoop::new(driver.session().clone(), viewport, config.render.fps)
            .context("failed to initialize render surface")?;

    let addr = match bind {
        Some(addr) => addr.to_string(),
        None => config.server.bind.clone(),
    };
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
        }
        ctrl_c.cancel();
    });

    let render_task = tokio::spawn(render.run(cancel.clone()));
    let state = server::AppState::new(driver.clone(), frames, resize);
    server::serve(listener, state, cancel.clone())
        .await
        .context("http server failed")?;

    cancel.cancel();
    driver.shutdown(SHUTDOWN_GRACE).await;
    let presented = render_task.await.context("render loop panicked")?;
    tracing::info!(presented, "shutdown complete");
    Ok(())
}

async fn cmd_ask(cli: &Cli, prompt: &str, raw: bool) -> Result<()> {
    if prompt.trim().is_empty() {
        return Ok(());
    }
    let config = load_config(cli)?;
    let client = OracleClient::new(&config.oracle)?;

    let mut session = Session::new(client.model());
    let Submit::Accepted { ticket, prompt } = session.submit_text(prompt) else {
        return Ok(());
    };
    let result = client.consult(&prompt).await;
    session.complete(ticket, &result);

    if raw {
        println!("{}", result.text());
    } else {
        println!("{}", session.response().html);
    }
    Ok(())
}

fn cmd_simulate(cli: &Cli, frames: u64, phase: AiPhase, hover: bool, click: bool) -> Result<()> {
    let config = load_config(cli)?;
    let fps = f64::from(config.render.fps);

    let mut state = InteractionState::new();
    for event in events_toward(phase) {
        state.apply(*event);
    }
    if hover {
        state.pointer_enter();
    }
    if click {
        state.click();
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for i in 0..frames {
        let frame = tick(&mut state, FrameTime::at_frame(i, fps));
        let line = serde_json::to_string(&frame).context("failed to serialize frame")?;
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Events that take a fresh state to `phase`.
fn events_toward(phase: AiPhase) -> &'static [PhaseEvent] {
    match phase {
        AiPhase::Idle => &[],
        AiPhase::Typing => &[PhaseEvent::TypingStarted],
        AiPhase::Processing => &[PhaseEvent::RequestSent],
        AiPhase::Responding => &[PhaseEvent::RequestSent, PhaseEvent::ResponseArrived],
    }
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_toward_reach_phase() {
        for phase in AiPhase::ALL {
            let mut state = InteractionState::new();
            for event in events_toward(phase) {
                state.apply(*event);
            }
            assert_eq!(state.phase, phase);
        }
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["orb", "simulate", "--frames", "3", "--phase", "processing"])
            .unwrap();
        match cli.command {
            Commands::Simulate { frames, phase, .. } => {
                assert_eq!(frames, 3);
                assert_eq!(phase, AiPhase::Processing);
            }
            _ => panic!("expected simulate"),
        }
        assert!(Cli::try_parse_from(["orb", "simulate", "--phase", "dreaming"]).is_err());
    }
}
