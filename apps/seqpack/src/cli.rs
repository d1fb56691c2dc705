use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "seqpack")]
#[command(about = "Archive directory trees into a stored ZIP, written strictly front to back")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Directory or file to archive
    #[arg(required_unless_present = "batch")]
    pub source: Option<PathBuf>,

    /// Archive to create; streams to stdout when omitted
    #[arg(conflicts_with = "batch")]
    pub destination: Option<PathBuf>,

    /// Read sources and destination from list files
    #[arg(short, long, conflicts_with = "source")]
    pub batch: bool,

    /// Source list for --batch, one path per line
    #[arg(long, value_name = "FILE", default_value = "src.txt")]
    pub src_list: PathBuf,

    /// Destination list for --batch; the first path is used
    #[arg(long, value_name = "FILE", default_value = "dst.txt")]
    pub dst_list: PathBuf,

    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
