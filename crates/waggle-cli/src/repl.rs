//! REPL – drive the engine by hand.
//!
//! Supported slash-commands:
//!   /help              – show this list
//!   /snapshot <text>   – replace the perception text (`\n` starts a new line)
//!   /decide <text>     – execute a raw two-line response
//!   /ask               – request a decision and tick until it is executed
//!   /run <secs>        – advance the simulation in real time
//!   /auto on|off       – toggle automatic requests
//!   /prompt            – print the conversation the next request would send
//!   /status            – pose, timeline states and request state
//!   /memory            – recent decision reasons
//!   /quit | /exit      – leave

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::runtime::Runtime;
use tokio::sync::broadcast::{self, error::TryRecvError};
use waggle_hal::LimbRig;
use waggle_runtime::AgentLoop;
use waggle_types::{EngineEvent, EngineEventKind, Vec3};

const ASK_STEP_SECS: f32 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Snapshot(String),
    Decide(String),
    Ask,
    Run(f32),
    Auto(bool),
    Prompt,
    Status,
    Memory,
    Quit,
    /// Known command with an unusable argument.
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (line, ""),
        };
        match head {
            "/help" => Command::Help,
            "/snapshot" => Command::Snapshot(unescape(rest)),
            "/decide" if !rest.is_empty() => Command::Decide(unescape(rest)),
            "/decide" => Command::Usage("/decide <reason>\\n<x,y,z,speed,actions,path>"),
            "/ask" => Command::Ask,
            "/run" => match rest.parse::<f32>() {
                Ok(secs) if secs > 0.0 && secs.is_finite() => Command::Run(secs),
                _ => Command::Usage("/run <seconds>"),
            },
            "/auto" => match rest {
                "on" => Command::Auto(true),
                "off" => Command::Auto(false),
                _ => Command::Usage("/auto on|off"),
            },
            "/prompt" => Command::Prompt,
            "/status" => Command::Status,
            "/memory" => Command::Memory,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Turn the two-character sequence `\n` into a newline.
fn unescape(s: &str) -> String {
    s.replace("\\n", "\n")
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(shutdown: Arc<AtomicBool>, runtime: &Runtime, agent: &mut AgentLoop<LimbRig>, tick_hz: f32, request_timeout_secs: u64) {
    // Requests are spawned onto the runtime from outside `block_on`.
    let _entered = runtime.enter();
    let mut events = agent.subscribe();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "waggle>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line) {
            Command::Help => cmd_help(),
            Command::Snapshot(text) => {
                agent.observe(&text);
                let snap = agent.snapshot();
                println!(
                    "  entities: {}  reference: {}",
                    snap.entity_count.map_or("?".to_string(), |n| n.to_string()).bold(),
                    if snap.reference.valid {
                        fmt_vec(snap.reference.position).green()
                    } else {
                        "none".yellow()
                    }
                );
            }
            Command::Decide(text) => match agent.apply_response(&text) {
                Ok(report) => {
                    println!("{} {}", "✓ Executing decision".green(), report.decision_id.to_string().dimmed());
                    println!("  target: {}", fmt_vec(report.target).bold());
                    if !report.navigating {
                        println!("  {}", "target too close, navigation skipped".yellow());
                    }
                }
                Err(e) => println!("{}: {}", "Rejected".red(), e),
            },
            Command::Ask => cmd_ask(runtime, agent, tick_hz, request_timeout_secs, &mut events),
            Command::Run(secs) => runtime.block_on(agent.run_for(secs, tick_hz)),
            Command::Auto(on) => {
                agent.set_auto_request(on);
                println!("  auto requests {}", if on { "on".green() } else { "off".yellow() });
            }
            Command::Prompt => {
                for msg in agent.prompt() {
                    println!("{}", format!("── {:?} ──", msg.role).bold());
                    println!("{}", msg.content);
                }
            }
            Command::Status => cmd_status(agent),
            Command::Memory => {
                let memory = agent.controller().memory();
                if memory.is_empty() {
                    println!("  {}", "no decisions yet".dimmed());
                }
                for (i, reason) in memory.reasons().enumerate() {
                    println!("  {}. {}", i + 1, reason);
                }
                if memory.is_repeating() {
                    println!("  {}", "reasons are repeating".yellow());
                }
            }
            Command::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Command::Usage(usage) => println!("{} {}", "Usage:".yellow(), usage.bold()),
            Command::Unknown(other) => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }

        print_events(&mut events);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Waggle Commands".bold().underline());
    println!("  {}  – set the perception text", "/snapshot <text>".bold().cyan());
    println!("  {}    – execute a raw response", "/decide <text>".bold().cyan());
    println!("  {}               – ask the model and wait for its decision", "/ask".bold().cyan());
    println!("  {}        – advance the simulation", "/run <secs>".bold().cyan());
    println!("  {}       – toggle automatic requests", "/auto on|off".bold().cyan());
    println!("  {}            – show the next request", "/prompt".bold().cyan());
    println!("  {}            – pose and timeline states", "/status".bold().cyan());
    println!("  {}            – recent decision reasons", "/memory".bold().cyan());
    println!("  {}      – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_ask(
    runtime: &Runtime,
    agent: &mut AgentLoop<LimbRig>,
    tick_hz: f32,
    timeout_secs: u64,
    events: &mut broadcast::Receiver<EngineEvent>,
) {
    match agent.request_decision() {
        Ok(true) => {}
        Ok(false) => {
            println!("  {}", "a request is already in flight".yellow());
            return;
        }
        Err(e) => {
            println!("{}: {}", "Request failed".red(), e);
            return;
        }
    }
    print!("  Waiting for the model … ");
    io::stdout().flush().ok();

    let budget = timeout_secs as f32 + 1.0;
    runtime.block_on(async {
        let mut waited = 0.0;
        while agent.is_request_pending() && waited < budget {
            agent.run_for(ASK_STEP_SECS, tick_hz).await;
            waited += ASK_STEP_SECS;
        }
    });
    if agent.is_request_pending() {
        println!("{}", "still waiting, the decision will run once it arrives".yellow());
    } else {
        println!("{}", "done".green());
    }
    print_events(events);
}

fn cmd_status(agent: &AgentLoop<LimbRig>) {
    let ctl = agent.controller();
    let pose = ctl.pose();
    println!("{}", "Engine Status".bold().underline());
    println!("  clock       : {:.2} s", agent.clock());
    println!("  position    : {}", fmt_vec(pose.position).bold());
    println!("  facing      : {}", fmt_vec(pose.forward_flat()));
    println!("  navigation  : {:?}", ctl.navigation_state());
    println!("  actions     : {:?}", ctl.action_state());
    println!(
        "  paused      : {}",
        if ctl.is_paused() { "yes".yellow() } else { "no".normal() }
    );
    println!(
        "  decision    : {}",
        ctl.current_decision().map_or("none".to_string(), |id| id.to_string())
    );
    println!(
        "  request     : {}",
        if agent.is_request_pending() { "in flight".cyan() } else { "idle".normal() }
    );
    println!(
        "  auto        : {}",
        if agent.auto_request() { "on".green() } else { "off".normal() }
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Event output
// ─────────────────────────────────────────────────────────────────────────────

fn print_events(events: &mut broadcast::Receiver<EngineEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => println!("  {} {}", "•".cyan(), describe(&event.kind)),
            Err(TryRecvError::Lagged(n)) => println!("  {}", format!("({n} events dropped)").dimmed()),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

fn fmt_vec(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

/// One-line human description of an engine event.
fn describe(kind: &EngineEventKind) -> String {
    match kind {
        EngineEventKind::DecisionStarted { target, path, steps, .. } => {
            format!("decision started: {:?} path to {}, {steps} gesture step(s)", path, fmt_vec(*target))
        }
        EngineEventKind::DecisionRejected { details } => format!("decision rejected: {details}"),
        EngineEventKind::Preempted { previous, .. } => format!("preempted decision {previous}"),
        EngineEventKind::FovCorrected { from, to, side } => {
            format!("target moved {:?} the field of view: {} -> {}", side, fmt_vec(*from), fmt_vec(*to))
        }
        EngineEventKind::NavigationArrived { position } => format!("arrived at {}", fmt_vec(*position)),
        EngineEventKind::GestureDegraded { step_index, kind, details } => {
            format!("gesture {step_index} ({kind:?}) degraded: {details}")
        }
        EngineEventKind::RequestFailed { details } => format!("request failed: {details}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waggle_types::FovSide;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("  /status  "), Command::Status);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/ask"), Command::Ask);
    }

    #[test]
    fn snapshot_and_decide_unescape_newlines() {
        assert_eq!(
            Command::parse("/snapshot [perception|count=0]\\nnothing"),
            Command::Snapshot("[perception|count=0]\nnothing".to_string())
        );
        assert_eq!(
            Command::parse("/decide go\\n1,0,2,1.0,wait:5.0,straight"),
            Command::Decide("go\n1,0,2,1.0,wait:5.0,straight".to_string())
        );
        assert!(matches!(Command::parse("/decide"), Command::Usage(_)));
    }

    #[test]
    fn run_needs_positive_seconds() {
        assert_eq!(Command::parse("/run 2.5"), Command::Run(2.5));
        assert!(matches!(Command::parse("/run"), Command::Usage(_)));
        assert!(matches!(Command::parse("/run -1"), Command::Usage(_)));
        assert!(matches!(Command::parse("/run soon"), Command::Usage(_)));
    }

    #[test]
    fn auto_takes_on_or_off() {
        assert_eq!(Command::parse("/auto on"), Command::Auto(true));
        assert_eq!(Command::parse("/auto off"), Command::Auto(false));
        assert!(matches!(Command::parse("/auto maybe"), Command::Usage(_)));
    }

    #[test]
    fn unknown_command_keeps_its_name() {
        assert_eq!(Command::parse("/dance now"), Command::Unknown("/dance".to_string()));
    }

    #[test]
    fn describes_fov_correction() {
        let text = describe(&EngineEventKind::FovCorrected {
            from: Vec3::new(1.0, 0.0, 0.0),
            to: Vec3::new(0.0, 0.0, 1.0),
            side: FovSide::Outside,
        });
        assert!(text.contains("Outside"));
        assert!(text.contains("(0.00, 0.00, 1.00)"));
    }
}
