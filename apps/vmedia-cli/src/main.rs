use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use vmedia_core::{DriverConfig, NodeHandle, Outcome, VmediaSession};

#[derive(Parser, Debug)]
#[command(author, version, about = "BMC virtual media tool (ipmitool backend)", long_about = None)]
struct Cli {
    #[command(flatten)]
    node: NodeArgs,

    /// Driver configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct NodeArgs {
    /// BMC address
    #[arg(long, env = "IPMI_ADDRESS")]
    address: String,

    /// BMC user
    #[arg(long, env = "IPMI_USERNAME", default_value = "")]
    username: String,

    /// BMC password
    #[arg(long, env = "IPMI_PASSWORD", hide_env_values = true, default_value = "")]
    password: String,

    /// BMC port
    #[arg(long)]
    port: Option<u16>,

    /// ipmitool interface
    #[arg(long, default_value = "lanplus")]
    interface: String,

    /// NFS server hosting the boot images
    #[arg(long)]
    provisioning_server: String,

    /// HTTP port of the provisioning server
    #[arg(long, default_value_t = 80)]
    http_port: u16,

    /// Hardware vendor (ampere, nokia)
    #[arg(long)]
    vendor: String,

    /// Product family (falcon, hw17)
    #[arg(long)]
    product_family: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Attach an image from the share as virtual CD
    Attach { image: String },
    /// Detach the virtual CD and restore default slots
    Detach,
    /// Show the disk attachment status
    Status,
    /// Detach, then attach with retries
    Setup { image: String },
    /// Cold reset the BMC and wait for it
    Reset,
}

impl NodeArgs {
    fn to_node(&self) -> NodeHandle {
        let mut node = NodeHandle::new(self.address.clone(), self.address.clone())
            .with_info("provisioning_server", self.provisioning_server.clone())
            .with_info("provisioning_server_http_port", self.http_port.to_string())
            .with_info("vendor", self.vendor.clone())
            .with_info("product_family", self.product_family.clone())
            .with_info("ipmi_address", self.address.clone())
            .with_info("ipmi_username", self.username.clone())
            .with_info("ipmi_password", self.password.clone())
            .with_info("ipmi_interface", self.interface.clone());
        if let Some(port) = self.port {
            node = node.with_info("ipmi_port", port.to_string());
        }
        node
    }
}

fn load_config(path: Option<&str>) -> Result<DriverConfig> {
    let config = match path {
        Some(path) => DriverConfig::load_from_file(path)
            .with_context(|| format!("loading config {path}"))?,
        None => DriverConfig::default(),
    };
    config.timing.validate().context("invalid [timing] table")?;
    if let Err(e) = config.validate_share_root() {
        warn!("{e:#}");
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let session = VmediaSession::new(cli.node.to_node(), config)?;
    info!(family = session.family(), node = %cli.node.address, "Connected");

    match cli.command {
        Commands::Attach { image } => match session.attach(&image)? {
            Outcome::Completed => info!(image = %image, "Attached"),
            Outcome::Aborted(step) => bail!("Attach aborted at step: {step}"),
        },
        Commands::Detach => match session.detach()? {
            Outcome::Completed => info!("Detached"),
            Outcome::Aborted(step) => bail!("Detach aborted at step: {step}"),
        },
        Commands::Status => println!("{}", session.status()),
        Commands::Setup { image } => {
            session.setup_for_boot(&image)?;
            info!(image = %image, "Node set up for virtual media boot");
        }
        Commands::Reset => {
            session.reset()?;
            info!("BMC is back");
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if cli.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(cli) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
