mod debug;
pub mod net;
mod tui;

use clap::Parser;

#[derive(Parser)]
#[command(name = "netphys-client")]
#[command(about = "Terminal debug client for the netphys replicated-physics server")]
struct Args {
    /// Server address to connect to immediately, skipping the connect menu.
    #[arg(short, long)]
    server: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let initial_server = args.server.map(|s| s.parse()).transpose()?;

    tui::run(initial_server)?;

    Ok(())
}
