use std::{error::Error, fs::File, io::BufReader};

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JPEG or TIFF file to read
    file: String,

    /// Print the tags as JSON
    #[cfg(feature = "json_dump")]
    #[arg(long)]
    json: bool,

    /// Also print entries whose tag id is not known
    #[arg(long)]
    unknown: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "nom_imgmeta=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let reader = BufReader::new(File::open(&cli.file)?);
    let parser = nom_imgmeta::MetadataParser::new().with_unknown_tags(cli.unknown);
    let found = parser.read(reader)?;

    #[cfg(feature = "json_dump")]
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    for tag in &found {
        println!("0x{:04x} {:<32} » {}", tag.id, tag.name, tag.value);
    }

    Ok(())
}
