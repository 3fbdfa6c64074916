//! `waggle` – interactive shell for the decision execution engine.
//!
//! 1. Loads `~/.waggle/config.toml`, writing the defaults on first run.
//! 2. Probes the model server and reports whether the configured model is
//!    available.
//! 3. Builds a simulated body and an [`AgentLoop`] talking to the model.
//! 4. Drops the user into a REPL (`/snapshot`, `/ask`, `/run`, `/status` …).
//!
//! Ctrl-C sets a shutdown flag; the REPL exits at its next prompt.

mod config;
mod ollama;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

use waggle_hal::SimRig;
use waggle_runtime::{AgentLoop, LlmDriver};
use waggle_types::BodyPose;

fn main() {
    // RUST_LOG picks the level; WAGGLE_LOG_FORMAT=json switches to JSON
    // lines and OTEL_EXPORTER_OTLP_ENDPOINT enables span export.
    let _tracer_guard = waggle_runtime::init_tracing("waggle");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after this command …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", config::config_path().display().to_string().bold());
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    // ── Model server probe ────────────────────────────────────────────────
    // Blocking HTTP, so this runs before the tokio runtime exists.
    print!("\n  Probing model server at {} … ", cfg.llm_url.dimmed());
    match ollama::fetch_models(&cfg.llm_url) {
        Ok(models) if ollama::has_model(&models, &cfg.model) => {
            println!("{} (model {} available)", "online".green(), cfg.model.bold());
        }
        Ok(models) => {
            println!("{} ({} model(s) available)", "online".green(), models.len());
            println!(
                "  {} Run `{}` to download it.",
                format!("Model {} not found.", cfg.model).yellow(),
                format!("ollama pull {}", cfg.model).bold()
            );
        }
        Err(_) => {
            println!("{}", "offline".yellow());
            println!(
                "  {}  Use {} to drive the body by hand.",
                "No model server detected.".dimmed(),
                "/decide".bold()
            );
        }
    }

    // ── Engine ────────────────────────────────────────────────────────────
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };

    let timeout = Duration::from_secs(cfg.engine.agent.request_timeout_secs.max(1));
    let driver = match LlmDriver::with_timeout(cfg.llm_url.clone(), cfg.model.clone(), timeout) {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("{}: {}", "Failed to build model client".red(), e);
            std::process::exit(1);
        }
    };

    let mut agent = match AgentLoop::new(&cfg.engine, SimRig::complete(), BodyPose::default(), Arc::new(driver)) {
        Ok(agent) => agent,
        Err(e) => {
            eprintln!("{}: {}", "Invalid engine configuration".red(), e);
            std::process::exit(1);
        }
    };
    info!(model = %cfg.model, tick_hz = cfg.tick_hz, "engine ready");

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(
        shutdown,
        &runtime,
        &mut agent,
        cfg.tick_hz,
        cfg.engine.agent.request_timeout_secs,
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#" _       __                  __    "#.bold().cyan());
    println!("{}", r#"| |     / /___ _____ _____ _/ /__  "#.bold().cyan());
    println!("{}", r#"| | /| / / __ `/ __ `/ __ `/ / _ \ "#.bold().cyan());
    println!("{}", r#"| |/ |/ / /_/ / /_/ / /_/ / /  __/ "#.bold().cyan());
    println!("{}", r#"|__/|__/\__,_/\__, /\__, /_/\___/  "#.bold().cyan());
    println!("{}", r#"             /____//____/           "#.bold().cyan());
    println!();
    println!("  {} {}", "Waggle".bold(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Decision execution engine for an LLM-driven body");
    println!();
}
