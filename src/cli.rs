use clap::Parser;

#[derive(Parser)]
#[command(
    name = "transcript-api",
    about = "HTTP API that returns YouTube transcripts as JSON",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Address to bind (default 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (default 3001)
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Log request and fetch details
    #[arg(short, long)]
    pub verbose: bool,
}
