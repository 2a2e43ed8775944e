use anyhow::Result;
use clap::{Parser, Subcommand};
use kickoff_core::tui;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kickoff")]
#[command(about = "Scaffold full-stack projects from remote templates")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Name of the project (and directory) to create
    project_name: Option<String>,

    /// Template key to use, skipping selection
    template: Option<String>,

    /// JSON file with pre-answered variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List available templates and exit
    #[arg(short, long)]
    list: bool,

    /// Show details for one template and exit
    #[arg(long, value_name = "TEMPLATE")]
    info: Option<String>,

    /// Refresh the cached template catalog and exit
    #[arg(short, long)]
    update: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    yes: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage GitHub credentials for private template repositories
    Auth(AuthArgs),
}

#[derive(Parser, Debug)]
struct AuthArgs {
    /// Store a personal access token
    #[arg(long)]
    setup: bool,

    /// Show stored credentials (masked)
    #[arg(long)]
    view: bool,

    /// Remove stored credentials
    #[arg(long)]
    clear: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();

    let result = run(args).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    result
}

async fn run(args: Args) -> Result<()> {
    if let Some(Command::Auth(auth)) = args.command {
        return tui::auth(tui::AuthArgs {
            setup: auth.setup,
            view: auth.view,
            clear: auth.clear,
        });
    }

    if args.list {
        return tui::list().await;
    }
    if let Some(key) = &args.info {
        return tui::info(key).await;
    }
    if args.update {
        return tui::update().await;
    }

    tui::create(tui::CreateArgs {
        project_name: args.project_name,
        template: args.template,
        config: args.config,
        yes: args.yes,
    })
    .await
}
