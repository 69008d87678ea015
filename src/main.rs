use clap::Parser;
use log::{error, info};
use poll_tally::commands::{Cli, Command, option_index, poll};
use poll_tally::lifecycle::RemainingTime;
use poll_tally::tasks::{ObserverEvent, ResultObserver};
use poll_tally::voting::plurality;
use poll_tally::{Clock, Config, Database, Poll, PollError, PollStore, SystemClock, VoteRecorder};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    // Usage and help errors exit here, before the store is touched.
    let command = Cli::parse().command;

    let config = Config::from_env();
    let database = match Database::new(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match handle_command(database, clock, &config, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn handle_command(
    database: Arc<Database>,
    clock: Arc<dyn Clock>,
    config: &Config,
    command: Command,
) -> Result<(), PollError> {
    if let Some(draft) = command.draft() {
        let created = poll::create_poll(database.as_ref(), clock.as_ref(), draft).await?;
        println!("Poll Created! {:?} is open until {}", created.title, created.end_time.to_rfc3339());
        return Ok(());
    }

    match command {
        Command::Create { .. } => {}
        Command::List { query } => {
            let listings =
                poll::search_polls(database.as_ref(), clock.as_ref(), query.as_deref().unwrap_or("")).await?;
            if listings.is_empty() {
                println!("No polls available. Create one!");
            }
            for listing in listings {
                println!(
                    "{} - {}",
                    listing.poll.title,
                    RemainingTime::from(listing.remaining)
                );
            }
        }
        Command::Vote { title, option } => {
            let option_index = option_index(option);
            let recorder = VoteRecorder::new(Arc::clone(&database), Arc::clone(&clock));
            let updated = recorder.cast_vote(&title, option_index).await?;
            println!("You voted for {:?}", updated.options[option_index].text);
            println!("{}", plurality::summary(&updated, &plurality::tally(&updated)));
        }
        Command::Watch { title } => {
            let current = database.get(&title).await?;
            watch(database, clock, config, current).await;
        }
        Command::Delete { title } => {
            poll::delete_poll(database.as_ref(), &title).await?;
            println!("Deleted {:?}", title);
        }
    }
    Ok(())
}

async fn watch(database: Arc<Database>, clock: Arc<dyn Clock>, config: &Config, current: Poll) {
    let template = current.clone();
    let (handle, mut events) =
        ResultObserver::start(database, clock, Some(current), config.observer);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ObserverEvent::Snapshot(snapshot)) => {
                    println!("📊 Live Results: {}", snapshot.title);
                    println!("{}", plurality::summary(&template, &snapshot.tally));
                    println!("{}", RemainingTime::from(snapshot.remaining));
                }
                Some(ObserverEvent::Countdown(left)) => {
                    info!("Leaving results in {} ticks", left);
                }
                Some(ObserverEvent::PollClosed) => {
                    println!("Poll Closed");
                }
                Some(ObserverEvent::SessionExpired) => {
                    println!("Session expired");
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                handle.close();
            }
        }
    }

    info!("Observer finished: {:?}", handle.terminated().await);
}
