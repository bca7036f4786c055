//! Dashboard assembly and the operator command loop.

use std::sync::Arc;

use anyhow::Context;
use bedboard_core::{BedDelta, HospitalCollection};
use bedboard_db_memory::InMemoryStore;
use bedboard_storage::RealtimeStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::DashboardConfig;
use crate::mirror::HospitalMirror;
use crate::notice::NoticeBoard;
use crate::subscriber::SnapshotSubscriber;
use crate::transactor::update_bed_status;
use crate::view;

/// One line of operator input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Admit a patient at the given hospital (takes one bed).
    Admit(String),
    /// Discharge a patient at the given hospital (frees one bed).
    Discharge(String),
    /// Select a hospital and show its detail card.
    Show(String),
    /// Redraw the full dashboard.
    List,
    Help,
    Quit,
}

impl Command {
    /// Parses a non-empty input line. The error is the message to print.
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or("");
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(format!("too many arguments for '{verb}' (try 'help')"));
        }

        let needs_id = |arg: Option<&str>| -> Result<String, String> {
            arg.map(str::to_string)
                .ok_or_else(|| format!("'{verb}' needs a hospital id (try 'help')"))
        };

        match verb {
            "admit" => Ok(Command::Admit(needs_id(arg)?)),
            "discharge" => Ok(Command::Discharge(needs_id(arg)?)),
            "show" => Ok(Command::Show(needs_id(arg)?)),
            "list" => Ok(Command::List),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command '{other}' (try 'help')")),
        }
    }
}

fn print_help() {
    println!(
        "commands:\n  \
         admit <id>      admit a patient (takes one bed)\n  \
         discharge <id>  discharge a patient (frees one bed)\n  \
         show <id>       select a hospital and show its details\n  \
         list            redraw the dashboard\n  \
         help            show this help\n  \
         quit            exit"
    );
}

/// Assembles a [`Dashboard`] from configuration.
#[derive(Default)]
pub struct DashboardBuilder {
    config: DashboardConfig,
    store: Option<Arc<InMemoryStore>>,
}

impl DashboardBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: DashboardConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an existing store instead of creating a fresh one.
    pub fn with_store(mut self, store: Arc<InMemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> anyhow::Result<Dashboard> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let mirror = Arc::new(HospitalMirror::new());

        // Subscribe before seeding so the first snapshot is not missed.
        let events = store.watch();

        if let Some(path) = &self.config.store.seed {
            let hospitals = load_seed(path)?;
            let count = hospitals.len();
            store
                .seed(hospitals)
                .await
                .context("failed to seed the store")?;
            tracing::info!(count, path = %path, "Seeded hospital records");
        }

        // Prime the mirror in case the store was already populated.
        let snapshot = store
            .snapshot()
            .await
            .context("failed to read the initial snapshot")?;
        mirror.apply_snapshot(snapshot);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let subscriber = SnapshotSubscriber::new(events, Arc::clone(&mirror));
        let subscriber_handle = tokio::spawn(subscriber.run(shutdown_rx));

        Ok(Dashboard {
            store: store as Arc<dyn RealtimeStore>,
            mirror,
            notices: NoticeBoard::new(self.config.notice_ttl()),
            shutdown_tx,
            subscriber_handle,
        })
    }
}

fn load_seed(path: &str) -> anyhow::Result<HospitalCollection> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {path}"))?;
    let hospitals: HospitalCollection = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse seed file {path}"))?;
    Ok(hospitals)
}

/// The assembled dashboard: store, mirror, subscriber task and notice board.
pub struct Dashboard {
    store: Arc<dyn RealtimeStore>,
    mirror: Arc<HospitalMirror>,
    notices: NoticeBoard,
    shutdown_tx: watch::Sender<bool>,
    subscriber_handle: JoinHandle<()>,
}

impl Dashboard {
    /// Runs the operator command loop until `quit`, end of input, or Ctrl-C.
    pub async fn run(self) -> anyhow::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        self.redraw();
        print_help();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    tracing::info!("Interrupted, shutting down");
                    break;
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            let line = line.trim();
                            if line.is_empty() {
                                self.redraw();
                                continue;
                            }
                            match Command::parse(line) {
                                Ok(Command::Quit) => break,
                                Ok(command) => self.execute(command).await,
                                Err(message) => println!("{message}"),
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            return Err(e).context("failed to read operator input");
                        }
                    }
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn execute(&self, command: Command) {
        match command {
            Command::Admit(id) => self.apply_delta(&id, BedDelta::Admit).await,
            Command::Discharge(id) => self.apply_delta(&id, BedDelta::Discharge).await,
            Command::Show(id) => {
                println!("{}", view::display_hospital_detail(&self.mirror, &id));
            }
            Command::List => self.redraw(),
            Command::Help => print_help(),
            Command::Quit => {}
        }
    }

    async fn apply_delta(&self, id: &str, delta: BedDelta) {
        let notice = update_bed_status(self.store.as_ref(), id, delta).await;
        self.notices.post(notice);
        // Give the subscriber a chance to apply the post-commit snapshot
        // before redrawing.
        tokio::task::yield_now().await;
        self.redraw();
    }

    fn redraw(&self) {
        println!("{}", view::render(&self.mirror.load()));
        if let Some(notice) = self.notices.current() {
            println!("{notice}");
        }
    }

    async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.subscriber_handle.await;
    }
}
