use clap::Parser;
use schemaform::run::{Cli, run};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    println!("{}", run(&cli)?);
    Ok(())
}
