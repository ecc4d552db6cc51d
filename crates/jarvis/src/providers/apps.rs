use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;

use super::Opener;
use crate::capabilities::{AppLauncher, CapabilityReply, CapabilityResult};

/// Launches programs by friendly name using the configured name mapping
#[derive(Clone)]
pub struct DesktopAppLauncher {
    mappings: BTreeMap<String, String>,
    opener: Arc<dyn Opener>,
}

impl DesktopAppLauncher {
    pub fn new(mappings: BTreeMap<String, String>, opener: Arc<dyn Opener>) -> Self {
        let mappings = mappings
            .into_iter()
            .map(|(name, exe)| (name.to_lowercase(), exe))
            .collect();
        Self { mappings, opener }
    }

    /// Exact mapping, then the first partial match, then the name as given
    pub fn resolve(&self, name: &str) -> String {
        let wanted = name.trim().to_lowercase();

        if let Some(exe) = self.mappings.get(&wanted) {
            return exe.clone();
        }

        self.mappings
            .iter()
            .find(|(key, _)| key.contains(wanted.as_str()) || wanted.contains(key.as_str()))
            .map(|(_, exe)| exe.clone())
            .unwrap_or_else(|| name.trim().to_string())
    }
}

#[async_trait]
impl AppLauncher for DesktopAppLauncher {
    async fn open(&self, name: &str) -> CapabilityResult {
        let executable = self.resolve(name);

        // Store apps and URI schemes go through the default handler
        let launched = if executable.contains(':') {
            self.opener.open(&executable)
        } else {
            self.opener.launch(&executable)
        };

        match launched {
            Ok(()) => {
                tracing::info!("Launched: {} ({})", name, executable);
                Ok(CapabilityReply::ok(format!("{} is opening up!", name)))
            }
            Err(e) => {
                tracing::error!("Failed to launch {}: {}", executable, e);
                Ok(CapabilityReply::failed(format!(
                    "Couldn't open {}. Is it installed?",
                    name
                )))
            }
        }
    }
}
