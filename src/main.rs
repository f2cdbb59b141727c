//! DevAgent - local AI coding assistant
//!
//! Interactive REPL over the orchestration engine in `devagent-core`. Each goal
//! runs to completion on the main thread; Ctrl-C cancels the active run.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{describe_state, Args, Input, HELP};
use devagent_core::{
    config::ProviderConfig, load_config, publisher_for, DevAgentConfig, LocalTools, Orchestrator,
    ProviderRegistry, RunSettings, SessionStore,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing subscriber (only once)
fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        let default = if verbose {
            "devagent=debug,devagent_core=debug"
        } else {
            "devagent=info,devagent_core=info"
        };
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
            ))
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    });
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<i32> {
    let workspace = resolve_workspace(args.workspace.as_deref())?;

    let mut config = match load_config(&workspace) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            DevAgentConfig::default()
        }
    };
    apply_overrides(&mut config, &args);

    let registry = ProviderRegistry::from_config(&config);
    let provider = registry
        .active()
        .with_context(|| format!("no usable LLM provider `{}`", registry.active_id()))?;
    let status = provider.status();
    if !status.is_ready() {
        eprintln!("Warning: {} is not ready: {:?}", provider.name(), status);
    }

    let orchestrator = Orchestrator::new(
        provider.clone(),
        Arc::new(LocalTools::new(&workspace)),
        publisher_for(config.pr.publisher, &workspace),
        RunSettings::from_config(&config, &workspace),
    )?;
    let store = SessionStore::for_workspace(&workspace);

    let mut session = if args.resume {
        store.load().context("failed to load the saved session")?
    } else {
        None
    };

    if let Some(goal) = args.once {
        let outcome = orchestrator.process_goal(&goal, session);
        println!("{}", outcome.response);
        if let Err(e) = store.save(&outcome.state) {
            tracing::warn!(error = %e, "failed to save session");
        }
        return Ok(if outcome.state.error.is_some() { 1 } else { 0 });
    }

    let running = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(&orchestrator, running.clone())?;

    println!("DevAgent - Your local AI coding assistant");
    println!(
        "Workspace: {}  |  Model: {} ({})",
        workspace.display(),
        provider.name(),
        provider.model()
    );
    if let Some(state) = &session {
        println!("Resumed session {} ({})", state.run_id, state.goal);
    }
    println!("Type /help for commands.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        match Input::parse(&line?) {
            Input::Empty => continue,
            Input::Exit => break,
            Input::Help => println!("{}\n", HELP),
            Input::Reset => {
                session = None;
                store.clear()?;
                println!("Conversation reset.\n");
            }
            Input::State => match &session {
                Some(state) => println!("{}\n", describe_state(state)),
                None => println!("No active session.\n"),
            },
            Input::Unknown(command) => {
                println!("Unknown command {}. Type /help for commands.\n", command)
            }
            Input::Goal(goal) => {
                running.store(true, Ordering::SeqCst);
                let outcome = orchestrator.process_goal(&goal, session.take());
                running.store(false, Ordering::SeqCst);

                println!("\n{}\n", outcome.response);
                if let Err(e) = store.save(&outcome.state) {
                    tracing::warn!(error = %e, "failed to save session");
                }
                session = Some(outcome.state);
            }
        }
    }

    Ok(0)
}

fn resolve_workspace(path: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("cannot read the current directory")?;
    let workspace = match path {
        Some(path) if path.is_dir() => path.to_path_buf(),
        Some(path) => {
            eprintln!(
                "Warning: {} is not a directory, using current directory",
                path.display()
            );
            cwd
        }
        None => cwd,
    };
    Ok(workspace.canonicalize().unwrap_or(workspace))
}

fn apply_overrides(config: &mut DevAgentConfig, args: &Args) {
    if let Some(id) = &args.provider {
        config.llm.default_provider = id.clone();
        config
            .llm
            .providers
            .entry(id.clone())
            .or_insert_with(ProviderConfig::default)
            .enabled = true;
    }
    if let Some(model) = &args.model {
        let id = config.llm.default_provider.clone();
        config
            .llm
            .providers
            .entry(id)
            .or_insert_with(ProviderConfig::default)
            .default_model = Some(model.clone());
    }
    if let Some(max) = args.max_iterations {
        config.workflow.max_iterations = max;
    }
}

/// First Ctrl-C cancels the active run; Ctrl-C while idle quits
fn install_interrupt_handler(orchestrator: &Orchestrator, running: Arc<AtomicBool>) -> Result<()> {
    let token = orchestrator.cancellation_token();
    ctrlc::set_handler(move || {
        if running.load(Ordering::SeqCst) {
            eprintln!("\nCancelling after the current step...");
            token.cancel();
        } else {
            println!();
            std::process::exit(130);
        }
    })
    .context("failed to install the Ctrl-C handler")
}
