pub mod config;
pub mod edit;
pub mod session;
pub mod views;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use daycal_core::cache::FileCache;
use daycal_core::config::DaycalConfig;
use daycal_core::identity::{Session, SessionFile};
use daycal_core::projection::parse_date;
use daycal_core::remote::DocumentStore;
use daycal_core::{Event, EventStore, StoreOptions};

/// How long to wait for the first snapshot of the live feed.
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a command needs: config, the persisted session and the store.
pub struct App {
    pub config: DaycalConfig,
    pub session: Arc<Session>,
    pub session_file: SessionFile,
    pub store: EventStore,
}

impl App {
    pub async fn open() -> Result<Self> {
        let config = DaycalConfig::load().context("Failed to load config")?;

        let remote = DocumentStore::open(config.store_path())
            .await
            .with_context(|| format!("Failed to open {}", config.store_path().display()))?;
        let cache = FileCache::new(config.cache_path());

        let session_file = SessionFile::new(config.session_path());
        let session = Arc::new(session_file.load().await.context("Failed to load session")?);

        let store = EventStore::new(
            Arc::new(remote),
            Arc::new(cache),
            session.clone(),
            StoreOptions::from(&config),
        );

        Ok(App {
            config,
            session,
            session_file,
            store,
        })
    }

    /// Subscribe for the current identity and return the first list it yields.
    ///
    /// Signed in, that is the live feed's first snapshot; signed out, the
    /// offline mirror.
    pub async fn events(&self) -> Result<Vec<Event>> {
        let mut rx = self.store.watch();
        let owner = self.store.current_owner();
        let live = owner.is_some();

        self.store.subscribe(owner).await;
        if live {
            tokio::time::timeout(SNAPSHOT_TIMEOUT, rx.changed())
                .await
                .context("Timed out waiting for events")?
                .context("Event store closed")?;
        }

        Ok(self.store.events())
    }
}

/// Parse an optional YYYY-MM-DD argument, defaulting to today.
pub fn date_or_today(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => parse_date(s).map_err(|e| anyhow::anyhow!(e)),
        None => Ok(chrono::Local::now().date_naive()),
    }
}
