use clap::{Parser, Subcommand};
use inquire::Text;
use inquire::error::InquireError;

use crate::config::Settings;
use crate::handlers::dispatcher::ToolDispatcher;
use crate::models::booking::Booking;
use crate::models::message::Message;
use crate::runtime::build_services;

#[derive(Parser)]
#[command(name = "bookingBot", about = "Manage cal.com bookings by chatting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat; the conversation lives for the session only.
    Chat,
    /// Run a single chat turn.
    Ask { query: String },
    /// List bookings, active ones unless --all.
    Bookings {
        #[arg(long)]
        all: bool,
    },
    /// List event types, to pick CALCOM_EVENT_TYPE_ID.
    EventTypes,
}

pub async fn cli(settings: Settings) -> anyhow::Result<()> {
    // Fine to exit here on bad arguments
    let cli = Cli::parse();
    let services = build_services(&settings)?;

    match cli.command {
        Commands::Chat => chat_loop(&services.dispatcher).await?,
        Commands::Ask { query } => {
            let history = services.dispatcher.handle_turn(Vec::new(), &query).await?;
            print_reply(&history);
        }
        Commands::Bookings { all } => {
            let bookings = services.calcom.list_bookings().await?;
            let shown: Vec<&Booking> = bookings.iter().filter(|b| all || b.is_active()).collect();
            if shown.is_empty() {
                println!("No bookings.");
            }
            for booking in shown {
                println!(
                    "{:>10}  {}  {:<12}  {}",
                    booking.id,
                    booking.start_time.with_timezone(&settings.time_zone).format("%Y-%m-%d %H:%M %Z"),
                    format!("{:?}", booking.status),
                    booking.title
                );
            }
        }
        Commands::EventTypes => {
            for event_type in services.calcom.list_event_types().await? {
                println!("{:>10}  {}  ({})", event_type.id, event_type.title, event_type.slug);
            }
        }
    }
    Ok(())
}

async fn chat_loop(dispatcher: &ToolDispatcher) -> anyhow::Result<()> {
    let mut history: Vec<Message> = Vec::new();
    loop {
        let query = match Text::new("You:").prompt() {
            Ok(query) => query,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };
        let trimmed = query.trim();
        if trimmed.is_empty() {
            continue;
        }
        if matches!(trimmed, "exit" | "quit") {
            break;
        }

        match dispatcher.handle_turn(history.clone(), trimmed).await {
            Ok(updated) => {
                print_reply(&updated);
                history = updated;
            }
            Err(err) => println!("Failed to process message: {}", err),
        }
    }
    Ok(())
}

fn print_reply(history: &[Message]) {
    let reply = history.last().and_then(Message::text).unwrap_or_default();
    println!("{}", reply);
}
