use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use odoo_bill_webhook::{init_logging, submit_bill, CommandIntent, Config};

#[derive(Parser)]
#[command(author, version, about = "Turn text commands into Odoo vendor bills", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a command and print the intent as JSON
    Parse {
        /// Command text, e.g. "Bill: OpenAI 5000 GYD admin software"
        text: String,
    },

    /// Parse a bill command and create it in Odoo using ODOO_* env vars
    Submit {
        /// Command text, e.g. "Bill: OpenAI 5000 GYD admin software"
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Parse { text } => {
            let intent = CommandIntent::parse(&text);
            println!("{}", serde_json::to_string_pretty(&intent)?);
        }
        Command::Submit { text } => run_submit(&text).await?,
    }

    Ok(())
}

async fn run_submit(text: &str) -> Result<()> {
    let intent = CommandIntent::parse(text);
    let Some(bill) = intent.as_bill() else {
        bail!("Unsupported or malformed command: {:?}", text.trim());
    };

    let credentials = Config::from_env()
        .odoo_credentials()
        .context("Odoo is not configured")?;

    let move_id = submit_bill(&credentials, bill)
        .await
        .with_context(|| format!("Failed to create bill for {}", bill.vendor))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "ok": true,
            "move_id": move_id,
            "parsed": intent,
        }))?
    );
    Ok(())
}
