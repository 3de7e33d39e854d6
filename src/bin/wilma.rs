use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use wilma_client::config::{config_path, load_config};
use wilma_client::domain::{Folder, MessageId};
use wilma_client::tools::ToolServer;
use wilma_client::{WilmaClient, dates, format};

#[derive(Parser)]
#[command(name = "wilma")]
#[command(about = "Wilma school portal client (schedule, messages, assistant tools)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show one day's lessons
    Schedule {
        /// today, huomenna, friday, 2026-03-15, 15.3.2026, 15.3.
        #[arg(default_value = "today")]
        date: String,
    },

    /// Show seven days of lessons starting at a date
    Week {
        #[arg(default_value = "today")]
        date: String,
    },

    /// List messages in a folder, newest first
    Messages {
        #[arg(long, default_value = "inbox")]
        folder: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Read one message (marks it read)
    Message { id: MessageId },

    /// Mark an inbox message as read
    MarkRead { id: MessageId },

    /// List who messages can be sent to
    Recipients,

    /// Send a new message
    Send {
        recipient_id: String,
        subject: String,
        body: String,
    },

    /// Reply to a message's sender
    Reply { message_id: MessageId, body: String },

    /// Run the assistant tool server on stdin/stdout
    Serve,

    /// Print where the config file lives
    ConfigPath,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let today = Local::now().date_naive();

    let client = match cli.cmd {
        Command::ConfigPath => {
            println!("{}", config_path()?.display());
            return Ok(());
        }
        _ => {
            let cfg = load_config().context("Configuration error")?;
            WilmaClient::new(&cfg)?
        }
    };

    match cli.cmd {
        Command::Schedule { date } => {
            let day = client.schedule().get_schedule(dates::resolve(&date, today)?)?;
            if let Some(diagnostic) = &day.diagnostic {
                eprintln!("warning: schedule page could not be read: {diagnostic}");
            }
            println!("{}", format::day_schedule(&day));
        }

        Command::Week { date } => {
            let week = client
                .schedule()
                .get_week_schedule(dates::resolve(&date, today)?)?;
            for diagnostic in &week.diagnostics {
                eprintln!("warning: {diagnostic}");
            }
            println!("{}", format::week_schedule(&week));
        }

        Command::Messages { folder, limit } => {
            let folder: Folder = folder.parse()?;
            let messages = client.messages().list_messages(folder, limit)?;
            println!("{}", format::message_list(folder, &messages));
        }

        Command::Message { id } => {
            let message = client.messages().get_message(id)?;
            println!("{}", format::message(&message));
        }

        Command::MarkRead { id } => {
            let outcome = client.messages().mark_read(id)?;
            println!("{}", format::mark_read(id, outcome));
        }

        Command::Recipients => {
            let list = client.recipients().list_recipients()?;
            println!("{}", format::recipients(&list));
        }

        Command::Send {
            recipient_id,
            subject,
            body,
        } => {
            let sent = client
                .messages()
                .send_message(Some(&recipient_id), Some(&subject), &body, None)?;
            println!("{}", format::sent(&sent));
        }

        Command::Reply { message_id, body } => {
            let sent = client.messages().reply_to_message(message_id, &body)?;
            println!("{}", format::sent(&sent));
        }

        Command::Serve => ToolServer::new(&client).run_stdio()?,

        Command::ConfigPath => {}
    }
    Ok(())
}
