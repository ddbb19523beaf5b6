pub mod checks;
pub mod webhook;

use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use anyhow::{Context, Result};
use octocrab::{Octocrab, models::InstallationId};
use tokio::sync::Mutex;
use wpt_checks_core::config::GitHubConfig;

pub use crate::checks::GitHubChecks;

#[derive(Clone)]
pub struct GitHub {
    pub installations: Arc<Mutex<Installations>>,
}

pub struct Installations {
    /// JWT-authenticated clients, keyed by app ID.
    pub app_clients: HashMap<u64, Octocrab>,
    pub clients: HashMap<(u64, InstallationId), Octocrab>,
}

impl Installations {
    pub fn client_for_installation(
        &mut self,
        app_id: u64,
        installation_id: InstallationId,
    ) -> Result<Octocrab> {
        match self.clients.entry((app_id, installation_id)) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let app_client = self
                    .app_clients
                    .get(&app_id)
                    .with_context(|| format!("No private key configured for app {app_id}"))?;
                let client = app_client.installation(installation_id)?;
                tracing::debug!("Created client for app {} installation {}", app_id, installation_id);
                entry.insert(client.clone());
                Ok(client)
            }
        }
    }
}

impl GitHub {
    pub async fn new(config: &GitHubConfig) -> Result<Self> {
        let mut app_clients = HashMap::with_capacity(config.apps.len());
        for app_config in &config.apps {
            let app_client = Octocrab::builder()
                .app(
                    app_config.id.into(),
                    jsonwebtoken::EncodingKey::from_rsa_pem(app_config.private_key.as_bytes())
                        .with_context(|| format!("Invalid private key for app {}", app_config.id))?,
                )
                .build()
                .context("Failed to create GitHub client")?;
            app_clients.insert(app_config.id, app_client);
        }
        tracing::info!("Configured {} GitHub app(s)", app_clients.len());
        if !app_clients.contains_key(&config.home.app_id) {
            tracing::warn!(
                "No private key for home app {}; check suites cannot be created for fork PRs",
                config.home.app_id
            );
        }
        let installations = Installations { app_clients, clients: HashMap::new() };
        Ok(Self { installations: Arc::new(Mutex::new(installations)) })
    }

    pub async fn client_for(&self, app_id: u64, installation_id: u64) -> Result<Octocrab> {
        let mut installations = self.installations.lock().await;
        installations.client_for_installation(app_id, installation_id.into())
    }
}
