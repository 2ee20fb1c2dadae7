use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Session token authority service")]
pub struct Cli {
    /// Path to the settings file, without or with its extension.
    #[arg(long)]
    pub settings: Option<String>,
}
