use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use threadsmith_core::{FunctionName, FunctionRegistry, OwnerKey};
use threadsmith_loader::{CommandInstaller, FunctionAuthor, FunctionLoader, ModuleInstaller, NullInstaller};
use threadsmith_openai::{AssistantOptions, OpenAiClient, OpenAiConfig};
use threadsmith_runtime::{AssistantStore, RunCoordinator, RunService, SessionManager};

#[derive(Parser, Debug)]
#[command(name = "threadsmith", version = "0.3.0")]
#[command(about = "Threadsmith CLI - chat with a self-extending assistant")]
struct Cli {
    /// Owner key scoping the assistant and the function registry
    #[arg(long, default_value = "default")]
    owner: String,

    /// Directory holding function modules
    #[arg(long, default_value = "functions")]
    functions_dir: PathBuf,

    /// Command used to fetch a missing module dependency, invoked as
    /// `<command> <module>`. Without it, missing dependencies fail the load.
    #[arg(long)]
    install_command: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive chat loop; type 'exit' to quit
    Chat {
        /// Model used if the owner's assistant has to be created
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,
    },
    /// Manage the owner's registered functions
    Functions {
        #[command(subcommand)]
        functions_command: FunctionsCommands,
    },
}

#[derive(Subcommand, Debug)]
enum FunctionsCommands {
    /// Load declared functions and list what is registered
    List,
    /// Load one function module and publish its schema
    Add {
        /// Function name (module file stem)
        name: String,
    },
    /// Clear and rebuild the owner's registry from declared tools
    Reload,
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "Command failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let owner = OwnerKey::parse(&cli.owner)?;

    let client = Arc::new(OpenAiClient::new(OpenAiConfig::from_env()?));
    let run_service: Arc<dyn RunService> = client.clone();
    let store: Arc<dyn AssistantStore> = client.clone();

    let installer: Arc<dyn ModuleInstaller> = match &cli.install_command {
        Some(command) => Arc::new(CommandInstaller::new(command)),
        None => Arc::new(NullInstaller),
    };

    let coordinator = RunCoordinator::new(
        run_service,
        store,
        Arc::new(FunctionRegistry::new()),
        Arc::new(FunctionLoader::new(&cli.functions_dir, installer)),
        Arc::new(FunctionAuthor::new(&cli.functions_dir)),
    );

    match cli.command {
        Commands::Chat { model } => chat(&client, &coordinator, &owner, model).await,
        Commands::Functions { functions_command } => match functions_command {
            FunctionsCommands::List => {
                coordinator.load_functions(&owner).await?;
                for name in coordinator.registry().function_names(&owner) {
                    println!("{name}");
                }
                Ok(())
            }
            FunctionsCommands::Add { name } => {
                let name = FunctionName::parse(&name)?;
                coordinator.add_function(&owner, &name).await?;
                println!("Function {name} added");
                Ok(())
            }
            FunctionsCommands::Reload => {
                let report = coordinator.reload_functions(&owner).await?;
                println!("Loaded {} function(s)", report.loaded.len());
                for (name, err) in &report.skipped {
                    println!("Skipped {name}: {err}");
                }
                Ok(())
            }
        },
    }
}

async fn chat(
    client: &OpenAiClient,
    coordinator: &RunCoordinator,
    owner: &OwnerKey,
    model: String,
) -> Result<(), Box<dyn std::error::Error>> {
    client
        .ensure_assistant(
            owner,
            AssistantOptions {
                model,
                ..AssistantOptions::default()
            },
        )
        .await?;
    coordinator.publish_builtins(owner).await?;
    let report = coordinator.load_functions(owner).await?;
    println!(
        "Loaded {} function(s) for owner '{owner}'",
        report.loaded.len()
    );

    let session = SessionManager::new_session_id();
    println!("Session {session}. Type 'exit' to quit.");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == "exit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        match coordinator.handle_user_message(owner, &session, line).await {
            Ok(reply) => println!("{reply}"),
            Err(err) => eprintln!("error: {err}"),
        }
    }

    Ok(())
}
