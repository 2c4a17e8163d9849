use clap::Parser;
use segmesh::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let summary = segmesh::run(&cli)?;
    println!("{}", summary);

    Ok(())
}
