use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

mod app;
mod config;
mod dates;
mod github;
mod models;
mod snapshot;
mod store;
mod sync;

use app::{App, AutoSync};
use config::Config;
use github::RemoteSyncConfig;
use models::{UserSettings, normalize_tags};

#[derive(Parser)]
#[command(
    name = "lifelog",
    version,
    about = "Track life progress, wish lists, and daily notes, with optional GitHub-backed sync."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the life countdown and current progress
    Status,
    /// Show or update birthday and life expectancy
    Settings {
        /// Birthday as YYYY-MM-DD
        #[arg(long)]
        birthday: Option<NaiveDate>,
        /// Life expectancy in years
        #[arg(long)]
        life_expectancy: Option<u32>,
    },
    /// Daily journal records
    #[command(subcommand)]
    Record(RecordCommand),
    /// Wish lists and their items
    #[command(subcommand)]
    Wish(WishCommand),
    /// Write the full snapshot as JSON to a file, or stdout if omitted
    Export { file: Option<PathBuf> },
    /// Import a snapshot file; sections present in it replace local state
    Import { file: PathBuf },
    /// Configure the GitHub file used for sync
    #[command(subcommand)]
    Remote(RemoteCommand),
    /// Push local state to the configured GitHub file
    Push,
    /// Pull remote state into the local store
    Pull,
}

#[derive(Subcommand)]
enum RecordCommand {
    /// Write (or overwrite) the record for a date
    Write {
        text: String,
        /// Record date, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Tags, separated by commas or spaces
        #[arg(long)]
        tags: Option<String>,
    },
    /// Show the record for a date, defaults to today
    Show { date: Option<NaiveDate> },
    /// Search records by content or tag
    Search { query: String },
    /// List all tags with usage counts
    Tags,
    /// Delete the record for a date
    Delete { date: NaiveDate },
}

#[derive(Subcommand)]
enum WishCommand {
    /// List all wish lists
    Lists,
    /// Show one list's items
    Show { list: String },
    /// Create a wish list
    New { name: String },
    /// Rename a wish list
    Rename { name: String, new_name: String },
    /// Delete a wish list and everything in it
    Delete { name: String },
    /// Add an item to a list
    Add {
        list: String,
        title: String,
        /// Tags, separated by commas or spaces
        #[arg(long)]
        tags: Option<String>,
    },
    /// Toggle an item (by its number) between open and done
    Toggle { list: String, item: usize },
    /// Remove an item (by its number) from a list
    Remove { list: String, item: usize },
    /// Add a progress note to an item
    Note {
        list: String,
        item: usize,
        text: String,
    },
}

#[derive(Subcommand)]
enum RemoteCommand {
    /// Validate and save the sync target
    Set {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        repo: String,
        /// Path of the snapshot file inside the repository
        #[arg(long, default_value = "data/life-tracker.json")]
        path: String,
        /// Personal access token with repo scope
        #[arg(long)]
        token: String,
        #[arg(long, default_value = "main")]
        branch: String,
    },
    /// Forget the sync target and the remembered file revision
    Unset,
    /// Show the configured sync target
    Show,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load();
    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &Config) -> Result<(), String> {
    let mut app = App::new(config).map_err(|e| e.message())?;
    match command {
        Command::Status => show_status(&app),
        Command::Settings {
            birthday,
            life_expectancy,
        } => {
            if birthday.is_none() && life_expectancy.is_none() {
                show_settings(&app.store.settings);
            } else {
                let merged = UserSettings {
                    birthday: birthday.or(app.store.settings.birthday),
                    life_expectancy: life_expectancy.or(app.store.settings.life_expectancy),
                };
                let outcome = app.save_settings(merged).map_err(|e| e.message())?;
                println!("Settings saved.");
                report_auto_sync(&outcome);
            }
        }
        Command::Record(command) => run_record(command, &mut app)?,
        Command::Wish(command) => run_wish(command, &mut app)?,
        Command::Export { file } => {
            let text = snapshot::export(&app.store).map_err(|e| e.message())?;
            match file {
                Some(path) => {
                    fs::write(&path, &text).map_err(|e| e.to_string())?;
                    println!("Exported snapshot to {}.", path.display());
                }
                None => println!("{text}"),
            }
        }
        Command::Import { file } => {
            let text = fs::read_to_string(&file).map_err(|e| e.to_string())?;
            let parsed = snapshot::parse(&text).map_err(|e| e.message())?;
            let report = snapshot::apply(&mut app.store, parsed).map_err(|e| e.message())?;
            println!("{}", report.summary());
        }
        Command::Remote(command) => run_remote(command, &mut app)?,
        Command::Push => {
            app.push().map_err(|e| e.message())?;
            let location = app
                .store
                .remote_config()
                .map(RemoteSyncConfig::location)
                .unwrap_or_default();
            println!("Pushed snapshot to {location}.");
        }
        Command::Pull => {
            let report = app.pull().map_err(|e| e.message())?;
            println!("{}", report.summary());
        }
    }
    Ok(())
}

fn run_record(command: RecordCommand, app: &mut App) -> Result<(), String> {
    match command {
        RecordCommand::Write { text, date, tags } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let tags = tags.as_deref().map(normalize_tags).unwrap_or_default();
            let outcome = app
                .upsert_daily_record(date, &text, tags)
                .map_err(|e| e.message())?;
            println!("Recorded {date}.");
            report_auto_sync(&outcome);
        }
        RecordCommand::Show { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            match app.store.record_for_date(date) {
                Some(record) => {
                    println!("{}  {}", record.date, record.tags.join(" "));
                    println!("{}", record.content);
                }
                None => println!("No record for {date}."),
            }
        }
        RecordCommand::Search { query } => {
            let results = app.store.search_records(&query);
            if results.is_empty() {
                println!("No records match \"{query}\".");
            } else {
                for record in results {
                    let first_line = record.content.lines().next().unwrap_or("");
                    println!("{}  {}  {}", record.date, first_line, record.tags.join(" "));
                }
            }
        }
        RecordCommand::Tags => {
            let tags = app.store.all_tags();
            if tags.is_empty() {
                println!("No tags yet.");
            }
            for (tag, count) in tags {
                println!("{tag}  {count}");
            }
        }
        RecordCommand::Delete { date } => {
            let outcome = app.delete_daily_record(date).map_err(|e| e.message())?;
            println!("Deleted the record for {date}.");
            report_auto_sync(&outcome);
        }
    }
    Ok(())
}

fn run_wish(command: WishCommand, app: &mut App) -> Result<(), String> {
    match command {
        WishCommand::Lists => {
            if app.store.wish_lists.is_empty() {
                println!("No wish lists yet. Create one with `lifelog wish new <name>`.");
            }
            for list in &app.store.wish_lists {
                let done = list.items.iter().filter(|i| i.completed).count();
                println!("{}  ({}/{} done)", list.name, done, list.items.len());
            }
        }
        WishCommand::Show { list } => {
            let found = app
                .store
                .wish_lists
                .iter()
                .find(|l| l.name == list.trim())
                .ok_or_else(|| format!("no wish list named \"{}\"", list.trim()))?;
            println!("{}", found.name);
            for (index, item) in found.items.iter().enumerate() {
                let marker = if item.completed { "[x]" } else { "[ ]" };
                println!("{:>3}. {marker} {}  {}", index + 1, item.title, item.tags.join(" "));
                for record in &item.records {
                    println!(
                        "       - {}  {}",
                        record.created_at.with_timezone(&Local).format("%Y-%m-%d"),
                        record.content
                    );
                }
            }
        }
        WishCommand::New { name } => {
            let outcome = app.create_wish_list(&name).map_err(|e| e.message())?;
            println!("Created list \"{}\".", name.trim());
            report_auto_sync(&outcome);
        }
        WishCommand::Rename { name, new_name } => {
            let outcome = app
                .rename_wish_list(&name, &new_name)
                .map_err(|e| e.message())?;
            println!("Renamed \"{}\" to \"{}\".", name.trim(), new_name.trim());
            report_auto_sync(&outcome);
        }
        WishCommand::Delete { name } => {
            let outcome = app.delete_wish_list(&name).map_err(|e| e.message())?;
            println!("Deleted list \"{}\".", name.trim());
            report_auto_sync(&outcome);
        }
        WishCommand::Add { list, title, tags } => {
            let tags = tags.as_deref().map(normalize_tags).unwrap_or_default();
            let outcome = app
                .add_wish_item(&list, &title, tags)
                .map_err(|e| e.message())?;
            println!("Added \"{}\" to \"{}\".", title.trim(), list.trim());
            report_auto_sync(&outcome);
        }
        WishCommand::Toggle { list, item } => {
            let outcome = app.toggle_wish_item(&list, item).map_err(|e| e.message())?;
            println!("Toggled item {item} in \"{}\".", list.trim());
            report_auto_sync(&outcome);
        }
        WishCommand::Remove { list, item } => {
            let outcome = app.delete_wish_item(&list, item).map_err(|e| e.message())?;
            println!("Removed item {item} from \"{}\".", list.trim());
            report_auto_sync(&outcome);
        }
        WishCommand::Note { list, item, text } => {
            let outcome = app
                .add_wish_record(&list, item, &text)
                .map_err(|e| e.message())?;
            println!("Noted progress on item {item} in \"{}\".", list.trim());
            report_auto_sync(&outcome);
        }
    }
    Ok(())
}

fn run_remote(command: RemoteCommand, app: &mut App) -> Result<(), String> {
    match command {
        RemoteCommand::Set {
            owner,
            repo,
            path,
            token,
            branch,
        } => {
            let config = RemoteSyncConfig {
                owner,
                repo,
                path,
                token,
                branch,
            };
            app.validate_remote(&config).map_err(|e| e.message())?;
            app.set_remote_config(config).map_err(|e| e.message())?;
            println!("GitHub sync configured. Every local change will now be pushed.");
        }
        RemoteCommand::Unset => {
            app.clear_remote_config().map_err(|e| e.message())?;
            println!("GitHub sync disabled and the remembered file revision forgotten.");
        }
        RemoteCommand::Show => match app.store.remote_config() {
            Some(config) => {
                println!("{} (branch {})", config.location(), config.branch);
                println!("token: configured");
            }
            None => println!("GitHub sync is not configured."),
        },
    }
    Ok(())
}

fn show_settings(settings: &UserSettings) {
    match settings.birthday {
        Some(birthday) => println!("birthday: {birthday}"),
        None => println!("birthday: not set"),
    }
    match settings.life_expectancy {
        Some(years) => println!("life expectancy: {years} years"),
        None => println!("life expectancy: not set"),
    }
}

fn show_status(app: &App) {
    let now = Local::now();
    let today = now.date_naive();

    if let Some(birthday) = app.store.settings.birthday
        && let Some(expectancy) = app.store.settings.life_expectancy
    {
        let countdown = dates::life_countdown(birthday, expectancy, today);
        println!(
            "Remaining: {} years, {} months, {} weeks, {} days  ({} days in total)",
            countdown.years, countdown.months, countdown.weeks, countdown.days, countdown.total_days
        );
        println!(
            "Next birthday in {} days, next month in {}, next week in {}.",
            dates::next_birthday_countdown(birthday, today),
            dates::next_month_countdown(today),
            dates::next_week_countdown(today)
        );
    } else {
        println!(
            "Set a birthday and life expectancy to see the countdown:\n  lifelog settings --birthday 1990-05-04 --life-expectancy 80"
        );
    }

    let year = dates::year_progress(today);
    let month = dates::month_progress(today);
    let week = dates::week_progress(today);
    let day = dates::day_progress(now);
    println!(
        "Year {:.1}%  ·  Month {:.1}%  ·  Week {:.1}%  ·  Day {:.1}%",
        year.percentage, month.percentage, week.percentage, day.percentage
    );

    let items: usize = app.store.wish_lists.iter().map(|l| l.items.len()).sum();
    let done: usize = app
        .store
        .wish_lists
        .iter()
        .flat_map(|l| &l.items)
        .filter(|i| i.completed)
        .count();
    println!(
        "{} wish lists, {}/{} items done, {} journal records.",
        app.store.wish_lists.len(),
        done,
        items,
        app.store.daily_records.len()
    );

    match app.store.remote_config() {
        Some(config) => println!("Sync: {} (branch {}).", config.location(), config.branch),
        None => println!("Sync: off."),
    }
}

fn report_auto_sync(outcome: &AutoSync) {
    match outcome {
        AutoSync::RemoteNotConfigured => {}
        AutoSync::Pushed => println!("Synced to GitHub."),
        AutoSync::Failed(err) => {
            eprintln!("Saved locally, but the sync failed: {}", err.message());
        }
    }
}
