use clap::{Parser, Subcommand};
use flashcard_scheduler::models::statistics;
use flashcard_scheduler::*;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "flashcards", version, about = "Spaced repetition flashcard practice")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "flashcards.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Practice the due cards of a deck
    Practice {
        /// Deck JSON file
        deck: PathBuf,
        /// Limit the number of cards in this session
        #[arg(long)]
        max_items: Option<usize>,
        /// Only review cards that were seen before
        #[arg(long)]
        review_only: bool,
    },
    /// Show overall progress
    Stats,
    /// Delete all progress
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Practice {
            deck,
            max_items,
            review_only,
        } => {
            let mut session_config = config.session.clone();
            if max_items.is_some() {
                session_config.max_items = max_items;
            }
            if review_only {
                session_config.include_new = false;
            }
            practice(&config, &session_config, &deck)?;
        }
        Commands::Stats => show_stats(&config)?,
        Commands::Reset { yes } => {
            if !yes {
                println!("This deletes all progress. Re-run with --yes to confirm.");
                return Ok(());
            }
            let mut store = ProgressStore::load_or_default(&config.store_path)?;
            store.reset();
            store.flush()?;
            println!("Progress reset.");
        }
    }
    Ok(())
}

fn practice(
    config: &AppConfig,
    session_config: &SessionConfig,
    deck_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let clock = SystemClock;
    let deck = Deck::from_json_file(deck_path)?;
    let mut store = ProgressStore::load_or_default(&config.store_path)?;
    let manager = SessionManager::new(Scheduler::new(config.scheduler.clone())?);

    println!("Deck '{}' ({} cards)", deck.name, deck.flashcards.len());
    let mut session =
        match manager.start_session(&mut store, session_config, &deck.item_ids(), clock.now()) {
            Ok(session) => session,
            Err(SchedulerError::EmptySession) => {
                println!("Nothing is due. Come back later!");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let show_first = session_config.show_first;
    let cards = deck.cards_by_id();

    while let Some(id) = session.current_item().cloned() {
        let Some(&card) = cards.get(&id) else {
            // queued ids all come from this deck
            session = manager.cancel_session(&session);
            break;
        };

        println!();
        println!("{}", session.progress_message());
        println!("  {}", card.front(show_first));
        prompt("[Enter] to flip, q to quit: ")?;
        match lines.next().transpose()? {
            Some(line) if line.trim() == "q" => {
                session = manager.cancel_session(&session);
                break;
            }
            None => {
                session = manager.cancel_session(&session);
                break;
            }
            Some(_) => {}
        }

        println!("  {}", card.back(show_first));
        let rating = loop {
            prompt("Rate 1=Again 2=Hard 3=Good 4=Easy: ")?;
            let Some(line) = lines.next().transpose()? else {
                return Ok(());
            };
            match line.trim().parse::<u8>().map(Rating::try_from) {
                Ok(Ok(rating)) => break rating,
                _ => println!("Please enter a number from 1 to 4."),
            }
        };

        session = manager.rate_current(&session, &mut store, rating, clock.now())?;
    }

    println!();
    println!("{}", session.progress_message());
    if let Some(accuracy) = session.accuracy() {
        println!(
            "Correct: {}  Incorrect: {}  Accuracy: {:.1}%",
            session.correct_in_session,
            session.incorrect_in_session,
            accuracy * 100.0
        );
    }
    Ok(())
}

fn show_stats(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = ProgressStore::load_or_default(&config.store_path)?;
    let summary = statistics::summarize(&store, SystemClock.now(), &config.mastery);

    println!("Total items: {}", summary.total_items);
    println!("Mastered: {}", summary.mastered);
    println!("Learning: {}", summary.learning);
    println!("New: {}", summary.new_items);
    println!("Items due for review: {}", summary.due);
    match summary.accuracy {
        Some(accuracy) => println!("Accuracy: {:.1}%", accuracy * 100.0),
        None => println!("Accuracy: no reviews yet"),
    }
    Ok(())
}

fn prompt(text: &str) -> io::Result<()> {
    print!("{text}");
    io::stdout().flush()
}
