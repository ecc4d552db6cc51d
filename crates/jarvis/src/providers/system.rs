//! System control through the platform's own command-line tools

use std::{path::PathBuf, process::Stdio, sync::Arc};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{
    capabilities::{CapabilityError, CapabilityReply, CapabilityResult, SystemControl},
    config::JarvisConfig,
};

/// Seconds between a shutdown/restart request and the machine going down
pub const SHUTDOWN_DELAY_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCommand {
    VolumeUp,
    VolumeDown,
    Mute,
    Unmute,
    Screenshot,
    Shutdown,
    Restart,
    CancelShutdown,
}

/// Candidate invocations for a command, tried in order until one starts
pub fn command_table(
    platform: Platform,
    command: SystemCommand,
    screenshot_path: &str,
) -> Vec<Vec<String>> {
    let delay = SHUTDOWN_DELAY_SECS.to_string();
    let candidates: Vec<Vec<&str>> = match (platform, command) {
        (Platform::Windows, SystemCommand::VolumeUp) => vec![powershell(VOLUME_UP_KEY)],
        (Platform::Windows, SystemCommand::VolumeDown) => vec![powershell(VOLUME_DOWN_KEY)],
        // Windows only exposes a mute toggle
        (Platform::Windows, SystemCommand::Mute | SystemCommand::Unmute) => {
            vec![powershell(VOLUME_MUTE_KEY)]
        }
        (Platform::Windows, SystemCommand::Screenshot) => {
            return vec![vec![
                "powershell".to_string(),
                "-NoProfile".to_string(),
                "-Command".to_string(),
                format!(
                    "Add-Type -AssemblyName System.Windows.Forms,System.Drawing; \
                     $b=[System.Windows.Forms.Screen]::PrimaryScreen.Bounds; \
                     $i=New-Object System.Drawing.Bitmap $b.Width,$b.Height; \
                     $g=[System.Drawing.Graphics]::FromImage($i); \
                     $g.CopyFromScreen($b.Location,[System.Drawing.Point]::Empty,$b.Size); \
                     $i.Save('{}')",
                    screenshot_path
                ),
            ]]
        }
        (Platform::Windows, SystemCommand::Shutdown) => vec![vec![
            "shutdown",
            "/s",
            "/t",
            &delay,
            "/c",
            "JARVIS shutdown initiated",
        ]],
        (Platform::Windows, SystemCommand::Restart) => {
            vec![vec!["shutdown", "/r", "/t", &delay]]
        }
        (Platform::Windows, SystemCommand::CancelShutdown) => vec![vec!["shutdown", "/a"]],

        (Platform::MacOs, SystemCommand::VolumeUp) => vec![osascript(
            "set volume output volume ((output volume of (get volume settings)) + 10)",
        )],
        (Platform::MacOs, SystemCommand::VolumeDown) => vec![osascript(
            "set volume output volume ((output volume of (get volume settings)) - 10)",
        )],
        (Platform::MacOs, SystemCommand::Mute) => {
            vec![osascript("set volume with output muted")]
        }
        (Platform::MacOs, SystemCommand::Unmute) => {
            vec![osascript("set volume without output muted")]
        }
        (Platform::MacOs, SystemCommand::Screenshot) => {
            vec![vec!["screencapture", "-x", screenshot_path]]
        }
        (Platform::MacOs, SystemCommand::Shutdown) => vec![vec!["shutdown", "-h", "+1"]],
        (Platform::MacOs, SystemCommand::Restart) => vec![vec!["shutdown", "-r", "+1"]],
        (Platform::MacOs, SystemCommand::CancelShutdown) => vec![vec!["killall", "shutdown"]],

        (Platform::Linux, SystemCommand::VolumeUp) => {
            vec![vec!["pactl", "set-sink-volume", "@DEFAULT_SINK@", "+10%"]]
        }
        (Platform::Linux, SystemCommand::VolumeDown) => {
            vec![vec!["pactl", "set-sink-volume", "@DEFAULT_SINK@", "-10%"]]
        }
        (Platform::Linux, SystemCommand::Mute) => {
            vec![vec!["pactl", "set-sink-mute", "@DEFAULT_SINK@", "1"]]
        }
        (Platform::Linux, SystemCommand::Unmute) => {
            vec![vec!["pactl", "set-sink-mute", "@DEFAULT_SINK@", "0"]]
        }
        (Platform::Linux, SystemCommand::Screenshot) => vec![
            vec!["gnome-screenshot", "-f", screenshot_path],
            vec!["scrot", screenshot_path],
            vec!["import", "-window", "root", screenshot_path],
        ],
        (Platform::Linux, SystemCommand::Shutdown) => vec![vec!["shutdown", "-h", "+1"]],
        (Platform::Linux, SystemCommand::Restart) => vec![vec!["shutdown", "-r", "+1"]],
        (Platform::Linux, SystemCommand::CancelShutdown) => vec![vec!["shutdown", "-c"]],
    };

    candidates
        .into_iter()
        .map(|argv| argv.into_iter().map(str::to_string).collect())
        .collect()
}

const VOLUME_UP_KEY: &str = "(New-Object -ComObject WScript.Shell).SendKeys([char]175)";
const VOLUME_DOWN_KEY: &str = "(New-Object -ComObject WScript.Shell).SendKeys([char]174)";
const VOLUME_MUTE_KEY: &str = "(New-Object -ComObject WScript.Shell).SendKeys([char]173)";

fn powershell(script: &str) -> Vec<&str> {
    vec!["powershell", "-NoProfile", "-Command", script]
}

fn osascript(script: &str) -> Vec<&str> {
    vec!["osascript", "-e", script]
}

/// Runs one external program and reports whether it exited successfully
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, argv: &[String]) -> std::io::Result<bool>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, argv: &[String]) -> std::io::Result<bool> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command")
        })?;

        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        Ok(status.success())
    }
}

pub struct CommandSystemControl {
    platform: Platform,
    shutdown_enabled: bool,
    screenshot_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl CommandSystemControl {
    pub fn new(
        platform: Platform,
        shutdown_enabled: bool,
        screenshot_dir: PathBuf,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            platform,
            shutdown_enabled,
            screenshot_dir,
            runner,
        }
    }

    pub fn from_config(config: &JarvisConfig) -> Self {
        Self::new(
            Platform::current(),
            config.features.system_shutdown,
            JarvisConfig::data_dir().join("screenshots"),
            Arc::new(ProcessRunner),
        )
    }

    /// Try each candidate in turn; `Ok(false)` when none of them succeeded
    async fn execute(&self, command: SystemCommand, screenshot_path: &str) -> Result<bool, CapabilityError> {
        let candidates = command_table(self.platform, command, screenshot_path);
        let mut last_error = None;

        for argv in &candidates {
            match self.runner.run(argv).await {
                Ok(true) => return Ok(true),
                Ok(false) => {
                    tracing::warn!(command = ?command, "{} exited with failure", argv[0]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!("{} is not installed", argv[0]);
                }
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) => Err(CapabilityError::Command(format!("{:?}: {}", command, e))),
            None => Ok(false),
        }
    }

    async fn simple(
        &self,
        command: SystemCommand,
        ok: &str,
        failed: &str,
    ) -> CapabilityResult {
        if self.execute(command, "").await? {
            tracing::info!(command = ?command, "System command completed");
            Ok(CapabilityReply::ok(ok))
        } else {
            Ok(CapabilityReply::failed(failed))
        }
    }

    async fn power(&self, command: SystemCommand, confirm: bool) -> CapabilityResult {
        let (noun, ok, failed) = match command {
            SystemCommand::Restart => (
                "Restart",
                "Restarting in 60 seconds. Save your work! 🔄",
                "Couldn't initiate restart.",
            ),
            _ => (
                "Shutdown",
                "Shutting down in 60 seconds. Say 'cancel shutdown' to stop! ⏰",
                "Couldn't initiate shutdown.",
            ),
        };

        if !self.shutdown_enabled {
            return Ok(CapabilityReply::failed(format!(
                "{} is disabled in settings for safety. ⚠️",
                noun
            )));
        }
        if !confirm {
            return Ok(CapabilityReply::failed(format!(
                "Safety first! Please confirm {}. 🛡️",
                noun.to_lowercase()
            )));
        }

        if self.execute(command, "").await? {
            tracing::warn!("System {} initiated", noun.to_lowercase());
            Ok(CapabilityReply::ok(ok))
        } else {
            Ok(CapabilityReply::failed(failed))
        }
    }
}

impl std::fmt::Debug for CommandSystemControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSystemControl")
            .field("platform", &self.platform)
            .field("shutdown_enabled", &self.shutdown_enabled)
            .field("screenshot_dir", &self.screenshot_dir)
            .finish()
    }
}

#[async_trait]
impl SystemControl for CommandSystemControl {
    async fn volume_up(&self) -> CapabilityResult {
        self.simple(SystemCommand::VolumeUp, "Volume up! 🔊", "Couldn't adjust volume. 😅")
            .await
    }

    async fn volume_down(&self) -> CapabilityResult {
        self.simple(SystemCommand::VolumeDown, "Volume down! 🔉", "Couldn't adjust volume. 😅")
            .await
    }

    async fn mute(&self) -> CapabilityResult {
        self.simple(SystemCommand::Mute, "Muted! 🔇", "Couldn't mute. 😅").await
    }

    async fn unmute(&self) -> CapabilityResult {
        self.simple(SystemCommand::Unmute, "Unmuted! 🔈", "Couldn't unmute. 😅")
            .await
    }

    async fn screenshot(&self) -> CapabilityResult {
        tokio::fs::create_dir_all(&self.screenshot_dir).await?;
        let filename = format!(
            "screenshot_{}.png",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.screenshot_dir.join(&filename);

        if self
            .execute(SystemCommand::Screenshot, &path.to_string_lossy())
            .await?
        {
            tracing::info!("Screenshot saved: {}", path.display());
            Ok(CapabilityReply::ok(format!(
                "Screenshot saved! 📸 Check {}",
                filename
            )))
        } else {
            Ok(CapabilityReply::failed("Couldn't take screenshot. 😅"))
        }
    }

    async fn shutdown(&self, confirm: bool) -> CapabilityResult {
        self.power(SystemCommand::Shutdown, confirm).await
    }

    async fn restart(&self, confirm: bool) -> CapabilityResult {
        self.power(SystemCommand::Restart, confirm).await
    }

    async fn cancel_shutdown(&self) -> CapabilityResult {
        let cancelled = self
            .execute(SystemCommand::CancelShutdown, "")
            .await
            .unwrap_or(false);

        if cancelled {
            Ok(CapabilityReply::ok("Shutdown cancelled! Crisis averted. 😅"))
        } else {
            Ok(CapabilityReply::failed(
                "No shutdown to cancel, or failed to cancel.",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeRunner {
        calls: Mutex<Vec<Vec<String>>>,
        missing: Vec<&'static str>,
        succeed: bool,
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, argv: &[String]) -> std::io::Result<bool> {
            self.calls.lock().unwrap().push(argv.to_vec());
            if self.missing.contains(&argv[0].as_str()) {
                return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
            }
            Ok(self.succeed)
        }
    }

    fn control(runner: Arc<FakeRunner>, shutdown_enabled: bool) -> CommandSystemControl {
        let dir = std::env::temp_dir().join("jarvis-screenshot-tests");
        CommandSystemControl::new(Platform::Linux, shutdown_enabled, dir, runner)
    }

    fn succeeding() -> Arc<FakeRunner> {
        Arc::new(FakeRunner {
            succeed: true,
            ..FakeRunner::default()
        })
    }

    #[tokio::test]
    async fn test_shutdown_disabled_by_default() {
        let runner = succeeding();
        let reply = control(runner.clone(), false).shutdown(true).await.unwrap();

        assert!(!reply.success);
        assert_eq!(reply.message, "Shutdown is disabled in settings for safety. ⚠️");
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_requires_confirm() {
        let runner = succeeding();
        let reply = control(runner.clone(), true).restart(false).await.unwrap();

        assert!(!reply.success);
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confirmed_shutdown_schedules_delay() {
        let runner = succeeding();
        let reply = control(runner.clone(), true).shutdown(true).await.unwrap();

        assert!(reply.success);
        assert_eq!(
            runner.calls.lock().unwrap()[0],
            vec!["shutdown", "-h", "+1"]
        );
    }

    #[tokio::test]
    async fn test_cancel_shutdown_failure_message() {
        let runner = Arc::new(FakeRunner::default());
        let reply = control(runner, true).cancel_shutdown().await.unwrap();

        assert!(!reply.success);
        assert_eq!(reply.message, "No shutdown to cancel, or failed to cancel.");
    }

    #[tokio::test]
    async fn test_screenshot_falls_through_missing_tools() {
        let runner = Arc::new(FakeRunner {
            succeed: true,
            missing: vec!["gnome-screenshot"],
            ..FakeRunner::default()
        });
        let reply = control(runner.clone(), false).screenshot().await.unwrap();

        assert!(reply.success);
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1][0], "scrot");
    }

    #[tokio::test]
    async fn test_volume_up_message() {
        let reply = control(succeeding(), false).volume_up().await.unwrap();
        assert_eq!(reply.message, "Volume up! 🔊");
    }

    #[test]
    fn test_windows_table_uses_delay() {
        let table = command_table(Platform::Windows, SystemCommand::Restart, "");
        assert_eq!(table[0], vec!["shutdown", "/r", "/t", "60"]);
    }
}
