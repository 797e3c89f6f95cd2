//! Subcommands and their execution against a connected client.

use clap::{Args, Subcommand};

use boxstore_client::{Client, Error};
use boxstore_proto::BoxRecord;

use crate::formatter::Formatter;

/// A record operation to run against the server.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one box by id
    Get {
        /// Box id
        id: i64,
    },
    /// List every box
    List,
    /// Create a box
    Create(RecordArgs),
    /// Replace a box's fields (id and created_at are kept)
    Update(RecordArgs),
    /// Delete a box by id
    Delete {
        /// Box id
        id: i64,
    },
    /// List boxes in a category (omit for uncategorized boxes)
    Category {
        #[arg(default_value = "")]
        category: String,
    },
    /// List boxes created in [start, end], microseconds since epoch
    Range {
        start: i64,
        end: i64,
    },
    /// Check that the server answers
    Ping,
}

/// Fields of a box given on the command line.
#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Box id
    pub id: i64,

    /// Box name
    pub name: String,

    #[arg(long)]
    pub price: Option<i64>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, default_value = "")]
    pub category: String,

    #[arg(long)]
    pub quantity: Option<i64>,

    /// Creation time in microseconds since epoch; the server stamps it when unset
    #[arg(long)]
    pub created_at: Option<i64>,
}

impl RecordArgs {
    pub fn into_record(self) -> BoxRecord {
        BoxRecord {
            id: self.id,
            name: self.name,
            price: self.price,
            description: self.description,
            category: self.category,
            quantity: self.quantity,
            created_at: self.created_at,
        }
    }
}

/// Result of one command: rendered text and whether the server reported success.
pub struct Outcome {
    pub output: String,
    pub ok: bool,
}

/// Run `command` and render the reply.
pub async fn execute(
    client: &Client,
    command: Command,
    formatter: &dyn Formatter,
) -> Result<Outcome, Error> {
    let outcome = match command {
        Command::Get { id } => {
            let reply = client.get_box(id).await?;
            Outcome {
                output: formatter.format_record(&reply.status, reply.record.as_ref()),
                ok: reply.status.is_ok(),
            }
        }
        Command::List => {
            let reply = client.get_boxes().await?;
            records_outcome(formatter, reply)
        }
        Command::Create(args) => {
            let reply = client.create_box(args.into_record()).await?;
            status_outcome(formatter, reply)
        }
        Command::Update(args) => {
            let reply = client.update_box(args.into_record()).await?;
            status_outcome(formatter, reply)
        }
        Command::Delete { id } => {
            let reply = client.delete_box(id).await?;
            status_outcome(formatter, reply)
        }
        Command::Category { category } => {
            let reply = client.get_boxes_in_category(category).await?;
            records_outcome(formatter, reply)
        }
        Command::Range { start, end } => {
            let reply = client.get_boxes_in_time_range(start, end).await?;
            records_outcome(formatter, reply)
        }
        Command::Ping => {
            client.ping().await?;
            Outcome {
                output: formatter.format_message("pong"),
                ok: true,
            }
        }
    };
    Ok(outcome)
}

fn records_outcome(formatter: &dyn Formatter, reply: boxstore_proto::BoxesReply) -> Outcome {
    Outcome {
        output: formatter.format_records(&reply.status, &reply.records),
        ok: reply.status.is_ok(),
    }
}

fn status_outcome(formatter: &dyn Formatter, reply: boxstore_proto::StatusReply) -> Outcome {
    Outcome {
        output: formatter.format_status(&reply.status),
        ok: reply.status.is_ok(),
    }
}
