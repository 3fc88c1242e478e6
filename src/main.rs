use anyhow::Result;

mod app;
mod logging;

fn main() -> Result<()> {
    let args = zone_transfer::cli::parse();
    app::run(args)
}
