use crate::commands::{run_diagnose, run_symptoms, DiagnoseArgs, SymptomsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use dental_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Dental Intake",
    about = "Run the clinic intake service or try the treatment recommender from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a reason, symptoms and urgency and print the recommended program
    Diagnose(DiagnoseArgs),
    /// List catalog symptoms, optionally filtered by consultation reason
    Symptoms(SymptomsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Diagnose(args) => run_diagnose(args),
        Command::Symptoms(args) => run_symptoms(args),
    }
}
