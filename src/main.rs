//! Eventdesk CLI
//!
//! Command-line front end for the event client:
//! - Sign in, sign up and sign out
//! - Browse and filter the catalog
//! - Join and withdraw from events
//! - Create, edit and delete events
//! - Watch attendee counts live

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

use eventdesk::api::{Event, EventFields, ImageUpload, SignupForm};
use eventdesk::catalog::{CategoryFilter, DateFilter, EventFilter};
use eventdesk::config::generate_default_config;
use eventdesk::gate::{GateDecision, Route};
use eventdesk::logging::init_logging;
use eventdesk::scope::ViewScope;
use eventdesk::sync::ChannelState;
use eventdesk::{ClientError, Config, EventDesk};

#[derive(Parser)]
#[command(name = "eventdesk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Discover events, manage enrollment and watch attendance live")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: platform config dir, then ./eventdesk.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Event service URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Register a member account
    Signup {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// Password confirmation
        #[arg(long)]
        confirm: String,
    },

    /// Register a guest account
    GuestSignup {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },

    /// Sign out and forget cached enrollment
    Logout,

    /// Show the current session
    Whoami,

    /// Check whether a view may be opened (e.g. /dashboard, /event-detail/42)
    Open { path: String },

    /// List events
    Events {
        /// Category to keep ("All" keeps everything)
        #[arg(long, default_value = "All")]
        category: String,
        /// Date window (upcoming, past, any)
        #[arg(long, default_value = "upcoming")]
        when: String,
        /// Case-insensitive name search
        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Show one event
    Show { id: String },

    /// Join an event
    Join { id: String },

    /// Withdraw from an event
    Withdraw { id: String },

    /// List events you are enrolled in
    Enrolled,

    /// Create an event
    Create {
        #[arg(long)]
        name: String,
        /// Event date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        date: String,
        #[arg(long)]
        location: String,
        #[arg(long, default_value = "Conference")]
        category: String,
        #[arg(long, default_value = "0")]
        price: f64,
        #[arg(long, default_value = "")]
        description: String,
        /// Image file to upload
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Edit an event; omitted fields keep their current value
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Delete an event
    Delete { id: String },

    /// Stream attendee counts until Ctrl-C
    Watch,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let config = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, config)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Config written to {}", path.display());
            }
            None => print!("{}", config),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    init_logging(&config.logging);

    let desk = EventDesk::from_config(config).map_err(user_error)?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Login { email, password } => {
            let landing = desk.auth.login(&email, &password).await.map_err(user_error)?;
            let session = desk.auth.session();
            println!("Signed in as {} ({})", email, session.role);
            println!("Continue at {}", landing);
        }

        Commands::Signup {
            email,
            password,
            confirm,
        } => {
            let form = signup_form(email, password, confirm);
            let message = desk.auth.signup(&form).await.map_err(user_error)?;
            println!("{}", message);
            println!("Sign in with: eventdesk login --email {}", form.email);
        }

        Commands::GuestSignup {
            email,
            password,
            confirm,
        } => {
            let form = signup_form(email, password, confirm);
            let message = desk.auth.guest_signup(&form).await.map_err(user_error)?;
            println!("{}", message);
        }

        Commands::Logout => {
            desk.auth.logout().map_err(user_error)?;
            println!("Signed out");
        }

        Commands::Whoami => {
            let session = desk.auth.session();
            if json {
                let body = serde_json::json!({
                    "signed_in": session.has_token(),
                    "user_id": session.user_id,
                    "role": session.role.as_str(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else if session.has_token() {
                println!(
                    "User {} ({})",
                    session.user_id.as_deref().unwrap_or("-"),
                    session.role
                );
            } else {
                println!("Not signed in");
            }
        }

        Commands::Open { path } => match desk.gate.evaluate_path(&path) {
            GateDecision::Render(route) => println!("open {}", route),
            GateDecision::Redirect(route) => println!("redirect {}", route),
        },

        Commands::Events {
            category,
            when,
            search,
        } => {
            let date = DateFilter::parse(&when)
                .ok_or_else(|| anyhow!("unknown date window '{}' (upcoming, past, any)", when))?;
            let filter = EventFilter {
                category: CategoryFilter::parse(&category),
                date,
                search,
            };

            let snapshot = desk.catalog.fetch_all().await;
            if let Some(error) = &snapshot.error {
                bail!("{}", error);
            }
            let events = desk.catalog.filtered(&filter).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else {
                print_events(&events);
            }
        }

        Commands::Show { id } => {
            require(&desk, Route::EventDetail(Some(id.clone())))?;
            let snapshot = desk.catalog.fetch_one(&id).await;
            let event = match (snapshot.error, snapshot.events.into_iter().next()) {
                (None, Some(event)) => event,
                (Some(error), _) => bail!("{}", error),
                (None, None) => bail!("Event not found"),
            };
            desk.sync.reconcile().await.map_err(user_error)?;
            let enrolled = desk.sync.is_enrolled(&id).await;

            if json {
                let body = serde_json::json!({ "event": event, "enrolled": enrolled });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print_event(&event, enrolled);
            }
        }

        Commands::Join { id } => {
            require(&desk, Route::EventDetail(Some(id.clone())))?;
            desk.sync.reconcile().await.map_err(user_error)?;
            if desk.sync.join(&id).await.map_err(user_error)? {
                println!("Joined {}", id);
            } else {
                println!("Already enrolled in {}", id);
            }
        }

        Commands::Withdraw { id } => {
            require(&desk, Route::EventDetail(Some(id.clone())))?;
            desk.sync.reconcile().await.map_err(user_error)?;
            if desk.sync.withdraw(&id).await.map_err(user_error)? {
                println!("Withdrew from {}", id);
            } else {
                println!("Not enrolled in {}", id);
            }
        }

        Commands::Enrolled => {
            require(&desk, Route::Dashboard)?;
            desk.load_home().await.map_err(user_error)?;
            let enrollment = desk.sync.enrollment().await;
            let events: Vec<Event> = desk
                .sync
                .events()
                .await
                .into_iter()
                .filter(|e| enrollment.get(&e.id).copied().unwrap_or(false))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else if events.is_empty() {
                println!("Not enrolled in any events.");
            } else {
                print_events(&events);
            }
        }

        Commands::Create {
            name,
            date,
            location,
            category,
            price,
            description,
            image,
        } => {
            require(&desk, Route::CreateEvent)?;
            let fields = EventFields {
                name,
                date,
                location,
                category,
                price,
                description,
                ..EventFields::default()
            };
            let upload = read_image(image.as_ref())?;
            let created = desk
                .authoring
                .create(&fields, upload.as_ref())
                .await
                .map_err(user_error)?;
            match created {
                Some(event) => println!("Created {} ({})", event.name, event.id),
                None => println!("Created {}", fields.name),
            }
        }

        Commands::Update {
            id,
            name,
            date,
            location,
            category,
            price,
            description,
            image,
        } => {
            require(&desk, Route::EventDetail(Some(id.clone())))?;
            let snapshot = desk.catalog.fetch_one(&id).await;
            let current = match (snapshot.error, snapshot.events.first()) {
                (None, Some(event)) => event.clone(),
                (Some(error), _) => bail!("{}", error),
                (None, None) => bail!("Event not found"),
            };

            let mut fields = EventFields::from_event(&current);
            if let Some(name) = name {
                fields.name = name;
            }
            if let Some(date) = date {
                fields.date = date;
            }
            if let Some(location) = location {
                fields.location = location;
            }
            if let Some(category) = category {
                fields.category = category;
            }
            if let Some(price) = price {
                fields.price = price;
            }
            if let Some(description) = description {
                fields.description = description;
            }

            let upload = read_image(image.as_ref())?;
            desk.authoring
                .update(&id, &fields, upload.as_ref())
                .await
                .map_err(user_error)?;
            println!("Updated {}", id);
        }

        Commands::Delete { id } => {
            require(&desk, Route::Dashboard)?;
            desk.authoring.delete(&id).await.map_err(user_error)?;
            println!("Deleted {}", id);
        }

        Commands::Watch => {
            desk.load_home().await.map_err(user_error)?;
            let names: HashMap<String, String> = desk
                .sync
                .events()
                .await
                .into_iter()
                .map(|e| (e.id, e.name))
                .collect();
            println!("Watching {} events (Ctrl-C to stop)", names.len());

            let mut scope = ViewScope::new("watch");
            scope.listen(&desk.sync, move |update| {
                if json {
                    if let Ok(line) = serde_json::to_string(&update) {
                        println!("{}", line);
                    }
                } else {
                    let name = names.get(&update.event_id).map(String::as_str).unwrap_or("-");
                    println!("{:<30} {:>6} attending", name, update.count);
                }
            });

            let mut states = desk.sync.watch_state();
            desk.sync.start();

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            loop {
                tokio::select! {
                    _ = &mut ctrl_c => break,
                    changed = states.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = *states.borrow_and_update();
                        tracing::info!(?state, "Attendance channel state");
                        if state == ChannelState::Degraded {
                            eprintln!("Live updates paused: the server could not be reached.");
                            break;
                        }
                    }
                }
            }

            drop(scope);
            desk.sync.stop();
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Enforce the access gate before entering a member view
fn require(desk: &EventDesk, route: Route) -> anyhow::Result<()> {
    match desk.gate.evaluate(route) {
        GateDecision::Render(_) => Ok(()),
        GateDecision::Redirect(Route::Login) => {
            bail!("Sign in first: eventdesk login --email <email> --password <password>")
        }
        GateDecision::Redirect(target) => {
            bail!("This view needs a member account (redirected to {})", target)
        }
    }
}

fn user_error(err: ClientError) -> anyhow::Error {
    if err.is_auth() {
        return anyhow!("{}. Sign in again with: eventdesk login", err);
    }
    anyhow!(err.user_message())
}

fn signup_form(email: String, password: String, confirm: String) -> SignupForm {
    SignupForm {
        email,
        password,
        confirm_password: confirm,
    }
}

fn read_image(path: Option<&PathBuf>) -> anyhow::Result<Option<ImageUpload>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    Ok(Some(ImageUpload::new(file_name, bytes)))
}

fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("No events found.");
        return;
    }

    println!(
        "{:<26} {:<30} {:<12} {:<12} {:>8} {:>9}",
        "ID", "Name", "Category", "Date", "Price", "Attending"
    );
    println!("{}", "-".repeat(102));
    for event in events {
        println!(
            "{:<26} {:<30} {:<12} {:<12} {:>8.2} {:>9}",
            event.id,
            truncate(&event.name, 30),
            truncate(&event.category, 12),
            truncate(&event.date, 10),
            event.price,
            event.attendee_count
        );
    }
}

fn print_event(event: &Event, enrolled: bool) {
    println!("{}", event.name);
    println!("{}", "-".repeat(event.name.chars().count().max(10)));
    println!("ID:        {}", event.id);
    println!("Date:      {}", event.date);
    println!("Location:  {}", event.location);
    println!("Category:  {}", event.category);
    println!("Price:     {:.2}", event.price);
    println!("Attending: {}", event.attendee_count);
    if let Some(url) = &event.image_url {
        println!("Image:     {}", url);
    }
    if !event.description.is_empty() {
        println!();
        println!("{}", event.description);
    }
    println!();
    println!("{}", if enrolled { "You are enrolled." } else { "You are not enrolled." });
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}~", cut)
    }
}
