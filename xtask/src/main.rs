use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Tasks for the project", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project
    Build,
    /// Run the whole test suite
    Test,
    /// Run the CLI, passing the remaining arguments through
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn cargo(args: &[&str], extra: &[String], what: &str) -> Result<()> {
    let status = Command::new("cargo").args(args).args(extra).status()?;
    if !status.success() {
        anyhow::bail!("{what} failed");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Build => {
            println!("Building project...");
            cargo(&["build", "--workspace"], &[], "Build")?;
        }
        Commands::Test => {
            println!("Running tests...");
            cargo(&["test", "--workspace"], &[], "Tests")?;
        }
        Commands::Run { args } => {
            println!("Running CLI...");
            cargo(&["run", "-p", "vmedia-cli", "--"], args, "Run")?;
        }
    }

    Ok(())
}
