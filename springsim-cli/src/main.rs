use clap::Parser;
use springsim_cli::cli::{Cli, Commands};
use springsim_cli::server::{serve, AppState};
use springsim_cli::stream::stream_run;
use springsim_cli::viewer::run_viewer;
use springsim_core::RunManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "springsim=info,springsim_core=info,springsim_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_command(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run {
            params,
            samples,
            timing,
            limits,
        } => {
            let stdout = std::io::stdout().lock();
            stream_run(
                params.params(),
                limits.limits(),
                timing.run_config(),
                samples,
                stdout,
            )?;
        }
        Commands::Serve {
            bind,
            queue_depth,
            timing,
            limits,
        } => {
            let state = AppState::new(
                RunManager::new(timing.run_config()),
                limits.limits(),
                queue_depth,
            );
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(serve(bind, state))?;
        }
        Commands::View {
            file,
            timing,
            limits,
        } => {
            run_viewer(file, timing.run_config(), limits.limits())?;
        }
        Commands::Limits { limits } => {
            println!("{}", serde_json::to_string_pretty(&limits.limits())?);
        }
    }

    Ok(())
}
