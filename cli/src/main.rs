mod output;

use std::rc::Rc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dialoguer::Input;
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use loyalty_nfc::ap::{LoyaltyAp, NdefAp};
use loyalty_nfc::hex::bytes_to_hex;
use loyalty_nfc::ndef::{NdefMessage, NdefRecord};
use loyalty_nfc::nfc::{HandleError, TagInfo, Technology};
use loyalty_nfc::pcsc::{Context, PcscCard};
use loyalty_nfc::{ap, card, ndef, pcsc, Card, DEFAULT_AID, DEFAULT_LANGUAGE};

use crate::output::Output;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("Could not connect to the reader: {0}")]
    Pcsc(#[from] pcsc::Error),

    #[error(transparent)]
    Card(#[from] card::Error),

    #[error(transparent)]
    Tag(#[from] ap::ndef::Error),

    #[error("Could not build the NDEF message: {0}")]
    Ndef(#[from] ndef::Error),

    #[error("Could not query the tag: {0}")]
    Transport(#[from] HandleError),

    #[error("Could not read the input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not format the output: {0}")]
    Json(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use the first reader whose name contains this
    #[arg(short, long, global = true, env = "LOYALTY_NFC_READER")]
    reader: Option<String>,

    /// Seconds to wait for a card before giving up; waits forever if omitted
    #[arg(short, long, global = true, env = "LOYALTY_NFC_TIMEOUT")]
    timeout: Option<u64>,

    /// AID of the loyalty card service, in hex
    #[arg(long, global = true, env = "LOYALTY_NFC_AID", default_value = DEFAULT_AID)]
    aid: String,

    /// Prints the results in JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shows the account number sent by the loyalty card service
    Account,

    /// Fetches the data object of the loyalty card service
    GetData,

    /// Reads the message kept by the loyalty card service
    Read,

    /// Writes a message to the loyalty card service
    Write {
        /// Message to write; prompted if omitted
        message: Option<String>,
    },

    /// Reads or writes NDEF text on an NFC Forum Type 4 tag
    #[command(subcommand)]
    Ndef(NdefCommands),

    /// Shows the identifier and technologies of the tag
    Info,
}

#[derive(Subcommand)]
enum NdefCommands {
    /// Reads the text record on the tag
    Read,

    /// Writes a text record onto the tag
    Write {
        text: String,

        #[command(flatten)]
        options: TextOptions,
    },

    /// Prints the NDEF message of a text record in hex, without touching any tag
    Encode {
        text: String,

        #[command(flatten)]
        options: TextOptions,
    },
}

#[derive(clap::Args)]
struct TextOptions {
    /// Language code of the text
    #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
    lang: String,

    /// Encodes the text in UTF-16 instead of UTF-8
    #[arg(long)]
    utf16: bool,
}

#[derive(Serialize)]
struct Account<'a> {
    account: &'a str,
}

#[derive(Serialize)]
struct Data<'a> {
    data: &'a str,
}

#[derive(Serialize)]
struct Message<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct TagSummary {
    id: String,
    technologies: Vec<Technology>,
}

type PcscTag = Card<PcscCard, ()>;

impl Cli {
    fn connect(&self) -> Result<Rc<PcscTag>> {
        let ctx = Context::try_new()?;
        let device = ctx.open(self.reader.as_deref())?;
        let pcsc_card = device.connect(&ctx, self.timeout.map(Duration::from_secs))?;

        Ok(Rc::new(Card::new(Box::new(pcsc_card))))
    }

    fn open_loyalty(&self) -> Result<LoyaltyAp<PcscCard, ()>> {
        Ok(LoyaltyAp::open((), self.connect()?, &self.aid)?)
    }

    fn open_ndef(&self) -> Result<NdefAp<PcscCard, ()>> {
        Ok(NdefAp::open((), self.connect()?)?)
    }
}

fn run(cli: Cli) -> Result<()> {
    let output = Output::new(cli.json);

    match &cli.command {
        Commands::Account => {
            let ap = cli.open_loyalty()?;
            let account = ap.account();

            output.print(&Account { account }, account)?;
        }
        Commands::GetData => {
            let data = cli.open_loyalty()?.get_data(())?;

            output.print(&Data { data: &data }, &data)?;
        }
        Commands::Read => {
            let message = cli.open_loyalty()?.read_message(())?;

            output.print(&Message { message: &message }, &message)?;
        }
        Commands::Write { message } => {
            let message = match message {
                Some(m) => m.clone(),
                None => Input::<String>::new()
                    .with_prompt("Message")
                    .interact_text()?,
            };

            let answer = cli.open_loyalty()?.write_message((), &message)?;

            output.print(&Message { message: &answer }, &answer)?;
        }
        Commands::Ndef(NdefCommands::Read) => {
            let record = cli.open_ndef()?.read_text(())?;
            let plain = format!("[{}] {}", record.language, record.text);

            output.print(&record, plain)?;
        }
        Commands::Ndef(NdefCommands::Write { text, options }) => {
            cli.open_ndef()?
                .write_text((), text, &options.lang, options.utf16)?;

            output.print(&Message { message: text }, "Wrote the text onto the tag.")?;
        }
        Commands::Ndef(NdefCommands::Encode { text, options }) => {
            let record = NdefRecord::text(text, &options.lang, options.utf16)?;
            let hex = bytes_to_hex(NdefMessage::from(record).to_bytes());

            output.print(&Message { message: &hex }, &hex)?;
        }
        Commands::Info => {
            let card = cli.connect()?;
            let summary = TagSummary {
                id: bytes_to_hex(card.delegate().tag_id(())?),
                technologies: card.delegate().technologies(()),
            };

            let technologies = summary
                .technologies
                .iter()
                .map(Technology::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let plain = format!("ID: {}\nTechnologies: {}", summary.id, technologies);

            output.print(&summary, plain)?;
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{}", e);
        std::process::exit(1);
    }
}
