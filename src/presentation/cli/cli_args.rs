use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "krishi-chat", about = "Terminal client for the Krishi Sakha assistant")]
pub struct CliArgs {
    /// Open an existing conversation instead of starting a new one.
    #[arg(long)]
    pub conversation: Option<i64>,

    /// Run against a canned in-process backend.
    #[arg(long)]
    pub scaffold: bool,

    #[arg(long, env = "APP_ENVIRONMENT", default_value = "local")]
    pub environment: String,
}
