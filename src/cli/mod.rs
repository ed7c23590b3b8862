pub mod confirm;
pub mod daemon_path;
pub mod habits;
pub mod process;

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use confirm::{AssumeYes, TerminalConfirm};
use habits::{add_habit, print_habits, remove_habit, toggle_habit};
use process::DaemonReminders;
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::start_daemon,
    registry::{tracker::HabitTracker, Confirm},
    reminder::{notifier::default_notifier, ReminderControl, ReminderState},
    storage::{
        entities::{Icon, ReminderTime},
        habit_store::HabitStore,
        key_value::FileKeyValueStore,
        store_dir,
    },
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
        time::parse_user_date,
    },
};

#[derive(Parser, Debug)]
#[command(name = "Habitual", version, long_about = None)]
#[command(about = "Habit tracker with streaks and daily reminders", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Add a new habit")]
    Add {
        name: String,
        #[arg(short, long, value_enum, default_value = "star")]
        icon: Icon,
        #[arg(short, long, help = "Daily reminder time, for example 09:30")]
        reminder: Option<ReminderTime>,
    },
    #[command(about = "Mark a habit as completed, or undo it", alias = "toggle")]
    Done {
        #[arg(help = "Id or name of the habit")]
        habit: String,
        #[arg(
            short,
            long,
            help = "Date to toggle instead of today. Examples are \"2025-03-15\", \"yesterday\", \"2 days ago\""
        )]
        date: Option<String>,
    },
    #[command(about = "Delete a habit")]
    Remove {
        #[arg(help = "Id or name of the habit")]
        habit: String,
        #[arg(short, long, help = "Don't ask for confirmation")]
        yes: bool,
    },
    #[command(about = "Show habits with their streaks")]
    List {},
    #[command(about = "Enable reminders by starting a daemon")]
    Init {},
    #[command(about = "Disable reminders by stopping the daemon")]
    Stop {},
    #[command(
        about = "Run reminders directly in current console. Used for debugging"
    )]
    Serve {
        #[arg(long = "check-interval", default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
        check_interval: u64,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    let clock = DefaultClock;
    let today = clock.local_now().date();
    let reminders = DaemonReminders::new(app_dir.clone(), default_notifier());
    let store = HabitStore::new(FileKeyValueStore::new(store_dir(&app_dir))?);

    match args.commands {
        Commands::Serve { check_interval } => {
            start_daemon(&app_dir, Duration::from_secs(check_interval)).await
        }
        Commands::Init {} => {
            match reminders.enable().await {
                ReminderState::Enabled => println!("Reminders enabled"),
                ReminderState::Disabled => println!("Notifications are not available"),
            }
            Ok(())
        }
        Commands::Stop {} => {
            reminders.disable().await;
            println!("Reminders disabled");
            Ok(())
        }
        Commands::List {} => {
            let tracker = HabitTracker::init(store, reminders, Box::new(clock)).await;
            print_habits(&tracker.all(), today);
            Ok(())
        }
        Commands::Add {
            name,
            icon,
            reminder,
        } => {
            let mut tracker = HabitTracker::init(store, reminders, Box::new(clock)).await;
            add_habit(&mut tracker, &name, icon, reminder).await
        }
        Commands::Done { habit, date } => {
            let date = date.map_or(Ok(today), |v| parse_user_date(&v))?;
            let mut tracker = HabitTracker::init(store, reminders, Box::new(clock)).await;
            toggle_habit(&mut tracker, &habit, date).await
        }
        Commands::Remove { habit, yes } => {
            let confirm: &dyn Confirm = if yes { &AssumeYes } else { &TerminalConfirm };
            let mut tracker = HabitTracker::init(store, reminders, Box::new(clock)).await;
            remove_habit(&mut tracker, &habit, confirm).await
        }
    }
}
