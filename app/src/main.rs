//! Shake Rewards - main entry point
//!
//! Wires the stores, the HTTP client, and the background synchronizer
//! together and drives them from a line-oriented command interface.

mod state;

use shake_core::{threshold_reward, FetchStatus, LastClaimRecord, Points, UserSession};
use shake_engine::{
    actions, BalanceStore, ClaimCoordinator, EventBus, MotionSample, RewardsEvent, ShakeDetector,
    SyncHandle,
};
use shake_networking::{api, AuthTokens, RewardsClient, DEFAULT_BASE_URL};
use shake_persistence::sqlite;
use state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shake_app=debug,shake_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Shake Rewards");

    // Get data directory
    let data_dir = dirs_next::data_local_dir()
        .map(|p| p.join("ShakeRewards"))
        .unwrap_or_else(|| PathBuf::from("."));

    // Derive encryption key from machine fingerprint (Argon2id + machine-uid)
    let encryption_key = match shake_persistence::derive_machine_key() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("FATAL: Failed to derive machine encryption key: {}", e);
            eprintln!("This may happen if the machine-uid cannot be determined.");
            std::process::exit(1);
        }
    };

    let app_state = match AppState::new(data_dir, &encryption_key) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("FATAL: Failed to create application state: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    if let Err(e) = runtime.block_on(run(app_state)) {
        eprintln!("FATAL: {}", e);
        std::process::exit(1);
    }
}

/// A signed-in session plus its background synchronizer
struct ActiveSession {
    session: UserSession,
    sync: SyncHandle,
}

struct App {
    state: AppState,
    auth: Arc<AuthTokens>,
    client: Arc<RewardsClient>,
    balance: Arc<BalanceStore>,
    events: EventBus,
    coordinator: ClaimCoordinator,
    detector: ShakeDetector,
    active: Option<ActiveSession>,
}

impl App {
    async fn pool(&self) -> Result<sqlx::SqlitePool, String> {
        let db_guard = self.state.db.read().await;
        db_guard
            .as_ref()
            .map(|db| db.pool().clone())
            .ok_or_else(|| "Database not initialized".to_string())
    }

    fn email(&self) -> Option<String> {
        self.active.as_ref().map(|a| a.session.email.clone())
    }
}

async fn run(state: AppState) -> Result<(), String> {
    state.init_db().await?;
    tracing::info!("Database initialized at {}", state.data_dir.display());

    let base_url =
        std::env::var("SHAKE_API_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let auth = Arc::new(AuthTokens::new(None, None));
    let client = Arc::new(RewardsClient::new_with_cache(
        &base_url,
        auth.clone(),
        state.definitions_cache.clone(),
    ));
    let balance = Arc::new(BalanceStore::new());
    let events = EventBus::new();
    let coordinator = ClaimCoordinator::new(client.clone(), balance.clone(), events.clone());

    let mut app = App {
        state,
        auth,
        client,
        balance,
        events,
        coordinator,
        detector: ShakeDetector::new(),
        active: None,
    };

    restore_session(&mut app).await;

    println!("Shake Rewards — type 'help' for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        let args: Vec<&str> = parts.collect();

        match command {
            "help" => print_help(),
            "login" => cmd_login(&mut app, &args).await,
            "logout" => cmd_logout(&mut app).await,
            "status" => cmd_status(&app).await,
            "claim" => cmd_claim(&app, parse_points_arg(&args)).await,
            "arm" => {
                app.detector.arm();
                println!("Shake detection armed");
            }
            "disarm" => {
                app.detector.disarm();
                println!("Shake detection disarmed");
            }
            "shake" => cmd_shake(&mut app).await,
            "trade" => cmd_trade(&app, args.first().copied().unwrap_or("BTC/USD")).await,
            "share" => cmd_share(&app, args.first().copied().unwrap_or("app")).await,
            "history" => cmd_history(&app).await,
            "theme" => cmd_theme(&app, args.first().copied()).await,
            "refresh" => {
                if let Some(active) = &app.active {
                    active.sync.refresh_now();
                    println!("Refresh requested");
                } else {
                    println!("Not signed in");
                }
            }
            "pause" => {
                if let Some(active) = &app.active {
                    active.sync.pause().await;
                }
            }
            "resume" => {
                if let Some(active) = &app.active {
                    active.sync.resume().await;
                }
            }
            "quit" | "exit" => break,
            other => println!("Unknown command '{}' — type 'help'", other),
        }
    }

    if let Some(active) = app.active.take() {
        active.sync.stop().await;
    }
    tracing::info!("Shake Rewards exiting");
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  login <email> [id-token]   sign in (token exchange when a token is given)");
    println!("  logout                     clear the stored session");
    println!("  status                     session, balance, and synchronizer state");
    println!("  arm | disarm               toggle shake detection");
    println!("  shake                      simulate a shake gesture (claims when armed)");
    println!("  claim [points]             claim points directly (optionally a fixed amount)");
    println!("  trade [pair]               simulated trade (+1 pt)");
    println!("  share [content]            social share (+2 pts)");
    println!("  history                    recent actions and claims");
    println!("  theme [light|dark]         show or set the UI theme");
    println!("  refresh                    fetch the balance now");
    println!("  pause | resume             control background polling");
    println!("  quit");
}

/// Restore a stored session at startup: decrypt the token, reject
/// expired sessions, and consume any pending last-claim record.
async fn restore_session(app: &mut App) {
    let Ok(pool) = app.pool().await else {
        return;
    };

    let stored = match sqlite::get_session(&pool).await {
        Ok(Some(stored)) => stored,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!("Failed to load stored session: {}", e);
            return;
        }
    };

    let token = match &stored.encrypted_token {
        Some(encrypted) => match app.state.encryptor.decrypt(encrypted) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!("Stored token cannot be decrypted: {}", e);
                None
            }
        },
        None => None,
    };

    let session = UserSession {
        email: stored.email.clone(),
        auth_token: token.clone(),
        login_at: stored.login_at,
    };

    let now = chrono::Utc::now();
    if session.is_expired(now) {
        tracing::info!("Stored session for {} expired, clearing", session.email);
        let _ = sqlite::clear_session(&pool).await;
        return;
    }
    if session.is_expiring_soon(now) {
        println!(
            "Note: session for {} expires in {} hours",
            session.email,
            session.time_remaining(now).num_hours()
        );
    }

    app.auth.set_bearer(token);
    start_session(app, session, &pool).await;
}

/// Attach a session: spawn the synchronizer and apply any pending
/// claim record left behind by a previous run.
async fn start_session(app: &mut App, session: UserSession, pool: &sqlx::SqlitePool) {
    match sqlite::take_last_claim(pool, &session.email).await {
        Ok(Some(record)) => {
            app.balance
                .apply_claim_record(record.available_points, record.new_total_points);
            println!(
                "Applied pending claim result: {} claimed, {} available",
                record.points_claimed, record.available_points
            );
            app.events.publish(RewardsEvent::PointsUpdated {
                record,
                popup_shown: false,
            });
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to read last-claim record: {}", e),
    }

    let sync = shake_engine::spawn_balance_synchronizer(
        app.client.clone(),
        pool.clone(),
        session.email.clone(),
        app.balance.clone(),
        app.events.clone(),
    );

    println!("Signed in as {}", session.display_name());
    app.active = Some(ActiveSession { session, sync });
}

async fn cmd_login(app: &mut App, args: &[&str]) {
    let Some(&email_arg) = args.first() else {
        println!("Usage: login <email> [id-token]");
        return;
    };
    let Ok(pool) = app.pool().await else {
        println!("Database not initialized");
        return;
    };

    if let Some(active) = app.active.take() {
        active.sync.stop().await;
    }

    let mut email = email_arg.to_lowercase();
    let mut token: Option<String> = None;

    // With an identity token, exchange it for a backend session
    if let Some(&id_token) = args.get(1) {
        app.auth.set_id_token(Some(id_token.to_string())).await;
        match api::session::exchange_session(&app.client, id_token).await {
            Ok(exchange) => {
                if let Some(resolved) = exchange.email {
                    email = resolved.to_lowercase();
                }
                token = exchange.token;
            }
            Err(e) => {
                println!("Sign-in failed: {}", e);
                return;
            }
        }
    }

    app.auth.set_bearer(token.clone());
    let session = UserSession::new(&email, token.clone());

    let encrypted = match &token {
        Some(t) => match app.state.encryptor.encrypt(t) {
            Ok(enc) => Some(enc),
            Err(e) => {
                tracing::warn!("Token encryption failed, storing session without it: {}", e);
                None
            }
        },
        None => None,
    };
    if let Err(e) =
        sqlite::save_session(&pool, &session.email, encrypted.as_ref(), session.login_at).await
    {
        println!("Failed to persist session: {}", e);
        return;
    }

    start_session(app, session, &pool).await;
}

async fn cmd_logout(app: &mut App) {
    if let Some(active) = app.active.take() {
        active.sync.stop().await;
        if let Ok(pool) = app.pool().await {
            let _ = sqlite::clear_session(&pool).await;
        }
        app.auth.clear().await;
        app.detector.disarm();
        println!("Signed out {}", active.session.email);
    } else {
        println!("Not signed in");
    }
}

async fn cmd_status(app: &App) {
    let Some(active) = &app.active else {
        println!("Not signed in");
        return;
    };

    let now = chrono::Utc::now();
    let snapshot = app.balance.snapshot();
    println!("User:      {}", active.session.email);
    println!(
        "Session:   {} days remaining{}",
        active.session.time_remaining(now).num_days(),
        if active.session.is_expiring_soon(now) {
            " (expiring soon)"
        } else {
            ""
        }
    );
    println!(
        "Balance:   {} available / {} total ({:?})",
        Points::new(snapshot.available_points),
        Points::new(snapshot.total_points),
        snapshot.last_fetch_status
    );
    println!("Sync:      {:?}", active.sync.status().await);
    println!(
        "Shake:     {}",
        if app.detector.is_armed() {
            "armed"
        } else {
            "disarmed"
        }
    );
    if app.coordinator.is_claiming() {
        println!("Claim:     in flight");
    }
}

/// Optional fixed point amount from a command's arguments; anything
/// non-numeric is ignored and the server-chosen amount applies
fn parse_points_arg(args: &[&str]) -> Option<u32> {
    args.first().and_then(|s| s.parse().ok())
}

async fn cmd_claim(app: &App, override_points: Option<u32>) {
    let Some(email) = app.email() else {
        println!("Not signed in");
        return;
    };
    let Ok(pool) = app.pool().await else {
        println!("Database not initialized");
        return;
    };

    // Degraded mode: the backend is unreachable, so claim whatever the
    // local ledger holds instead
    if app.balance.snapshot().last_fetch_status != FetchStatus::Ok {
        match actions::claim_local(&pool, &email, override_points.unwrap_or(1)).await {
            Ok(claim) => println!(
                "Claimed {} point(s) locally (offline total {})",
                claim.points_claimed, claim.total_after_claim
            ),
            Err(e) => println!("Local claim failed: {}", e),
        }
        return;
    }

    match app.coordinator.claim(&pool, &email, override_points).await {
        Ok(record) => print_claim_result(&record),
        Err(e) => println!("Claim failed: {}", e),
    }
}

/// Simulate one shake gesture through the detector
async fn cmd_shake(app: &mut App) {
    if !app.detector.is_armed() {
        println!("Shake detection is disarmed — 'arm' first");
        return;
    }

    let now = Instant::now();
    app.detector.feed(
        MotionSample {
            x: 0.0,
            y: 0.0,
            z: 9.8,
        },
        now,
    );
    let triggered = app.detector.feed(
        MotionSample {
            x: 14.0,
            y: -9.0,
            z: 9.8,
        },
        now,
    );

    if triggered {
        println!("Shake detected!");
        cmd_claim(app, None).await;
    } else {
        println!("Shake ignored (cooldown)");
    }
}

async fn cmd_trade(app: &App, pair: &str) {
    let Some(email) = app.email() else {
        println!("Not signed in");
        return;
    };
    let Ok(pool) = app.pool().await else {
        println!("Database not initialized");
        return;
    };

    match actions::perform_trade(&app.client, &pool, &email, pair).await {
        Ok(action) => println!("{} (+{} pt)", action.description, action.points),
        Err(e) => println!("Trade failed: {}", e),
    }
}

async fn cmd_share(app: &App, content: &str) {
    let Some(email) = app.email() else {
        println!("Not signed in");
        return;
    };
    let Ok(pool) = app.pool().await else {
        println!("Database not initialized");
        return;
    };

    match actions::perform_share(&app.client, &pool, &email, content).await {
        Ok(action) => println!("{} (+{} pts)", action.description, action.points),
        Err(e) => println!("Share failed: {}", e),
    }
}

async fn cmd_history(app: &App) {
    let Some(email) = app.email() else {
        println!("Not signed in");
        return;
    };
    let Ok(pool) = app.pool().await else {
        println!("Database not initialized");
        return;
    };

    match sqlite::load_ledger(&pool, &email).await {
        Ok(ledger) => {
            println!("Recent actions:");
            for action in ledger.recent_actions(10) {
                println!(
                    "  {} +{} {}",
                    action.timestamp.format("%Y-%m-%d %H:%M"),
                    action.points,
                    action.description
                );
            }
            println!("Recent claims:");
            for claim in ledger.recent_claims(10) {
                println!(
                    "  {} -{} (total {})",
                    claim.timestamp.format("%Y-%m-%d %H:%M"),
                    claim.points_claimed,
                    claim.total_after_claim
                );
            }
        }
        Err(e) => println!("Failed to load history: {}", e),
    }
}

async fn cmd_theme(app: &App, value: Option<&str>) {
    let Ok(pool) = app.pool().await else {
        println!("Database not initialized");
        return;
    };

    match value {
        Some(theme) => match sqlite::set_theme(&pool, theme).await {
            Ok(()) => println!("Theme set to {}", theme),
            Err(e) => println!("Failed to save theme: {}", e),
        },
        None => match sqlite::get_theme(&pool).await {
            Ok(theme) => println!("Theme: {}", theme.as_deref().unwrap_or("light")),
            Err(e) => println!("Failed to read theme: {}", e),
        },
    }
}

fn print_claim_result(record: &LastClaimRecord) {
    let label = record
        .redemption
        .as_ref()
        .and_then(|r| r.reward_def.as_ref())
        .map(|d| d.title.clone())
        .unwrap_or_else(|| threshold_reward(record.points_claimed).to_string());
    println!(
        "Claimed {} — {} ({} remaining)",
        Points::new(record.points_claimed),
        label,
        Points::new(record.available_points)
    );
}
