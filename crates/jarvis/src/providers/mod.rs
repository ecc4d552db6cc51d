//! Default capability providers for a desktop machine

pub mod apps;
pub mod browser;
pub mod dry_run;
pub mod files;
pub mod system;
pub mod typing;

use std::{
    io,
    process::{Child, ExitStatus, Stdio},
    sync::Arc,
    thread::{self, JoinHandle},
};

pub use apps::DesktopAppLauncher;
pub use browser::WebBrowser;
pub use dry_run::{DryRun, RecordedCall};
pub use files::LocalFileManager;
pub use system::CommandSystemControl;
pub use typing::KeystrokeTyping;

use crate::{capabilities::Capabilities, config::JarvisConfig};

/// Hands a URL or program name to the operating system
pub trait Opener: Send + Sync {
    fn open(&self, target: &str) -> io::Result<()>;
    /// Start a program without waiting for it
    fn launch(&self, program: &str) -> io::Result<()>;
}

/// Uses the platform's default handler through the `open` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl Opener for SystemOpener {
    fn open(&self, target: &str) -> io::Result<()> {
        open::that_detached(target)
    }

    fn launch(&self, program: &str) -> io::Result<()> {
        let spawned = std::process::Command::new(program)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                reap(child);
                Ok(())
            }
            // Not on PATH; let the desktop resolve it (app bundles, registered handlers)
            Err(e) if e.kind() == io::ErrorKind::NotFound => open::that_detached(program),
            Err(e) => Err(e),
        }
    }
}

/// Wait for a launched program on its own thread so it never lingers as a zombie
fn reap(mut child: Child) -> JoinHandle<io::Result<ExitStatus>> {
    let pid = child.id();
    thread::spawn(move || {
        let status = child.wait();
        if let Err(e) = &status {
            tracing::debug!(pid, "Failed to reap launched program: {}", e);
        }
        status
    })
}

/// Providers that act on the local machine
pub fn desktop(config: &JarvisConfig) -> Capabilities {
    let opener: Arc<dyn Opener> = Arc::new(SystemOpener);
    Capabilities {
        apps: Arc::new(DesktopAppLauncher::new(config.apps.clone(), opener.clone())),
        browser: Arc::new(WebBrowser::new(opener)),
        files: Arc::new(LocalFileManager::from_config(config)),
        system: Arc::new(CommandSystemControl::from_config(config)),
        typing: Arc::new(KeystrokeTyping::from_config(config)),
    }
}

/// Providers that only record what would have happened
pub fn dry_run() -> (Capabilities, Arc<DryRun>) {
    let recorder = Arc::new(DryRun::new());
    (Capabilities::uniform(recorder.clone()), recorder)
}
