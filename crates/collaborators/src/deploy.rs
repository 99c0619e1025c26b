use std::{net::TcpListener, path::Path, process::Stdio};

use async_trait::async_trait;
use tokio::{
    process::{Child, Command},
    sync::Mutex,
};
use tracing::{info, warn};

use crate::{AppDeployer, DeployError};

#[derive(Debug, Clone)]
pub struct DeployerSettings {
    /// Program used to serve the app, invoked as `{command} run {file} --server.port {port}`.
    pub command: String,
    pub base_port: u16,
    pub max_port_attempts: u16,
}

impl Default for DeployerSettings {
    fn default() -> Self {
        Self {
            command: "streamlit".into(),
            base_port: 8501,
            max_port_attempts: 50,
        }
    }
}

struct RunningApp {
    port: u16,
    child: Child,
}

/// Launches each app as a child process. Children are killed when the deployer is dropped.
pub struct ProcessDeployer {
    settings: DeployerSettings,
    running: Mutex<Vec<RunningApp>>,
}

impl ProcessDeployer {
    pub fn new(settings: DeployerSettings) -> Self {
        Self {
            settings,
            running: Mutex::new(Vec::new()),
        }
    }

    /// Ports of apps whose process is still alive.
    pub async fn running_ports(&self) -> Vec<u16> {
        let mut running = self.running.lock().await;
        reap_exited(&mut running);
        running.iter().map(|app| app.port).collect()
    }

    fn pick_port(&self, taken: &[u16]) -> Result<u16, DeployError> {
        let start = self.settings.base_port;
        (0..self.settings.max_port_attempts)
            .filter_map(|offset| start.checked_add(offset))
            .filter(|port| !taken.contains(port))
            .find(|port| TcpListener::bind(("127.0.0.1", *port)).is_ok())
            .ok_or(DeployError::NoFreePort {
                start,
                attempts: self.settings.max_port_attempts,
            })
    }
}

fn reap_exited(running: &mut Vec<RunningApp>) {
    running.retain_mut(|app| match app.child.try_wait() {
        Ok(Some(status)) => {
            info!(port = app.port, %status, "deployed app exited");
            false
        }
        Ok(None) => true,
        Err(error) => {
            warn!(port = app.port, %error, "failed to poll deployed app");
            true
        }
    });
}

#[async_trait]
impl AppDeployer for ProcessDeployer {
    async fn deploy(&self, app_path: &Path) -> Result<u16, DeployError> {
        let mut running = self.running.lock().await;
        reap_exited(&mut running);

        let taken: Vec<u16> = running.iter().map(|app| app.port).collect();
        let port = self.pick_port(&taken)?;

        let child = Command::new(&self.settings.command)
            .arg("run")
            .arg(app_path)
            .arg("--server.port")
            .arg(port.to_string())
            .arg("--server.headless")
            .arg("true")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DeployError::Spawn {
                command: self.settings.command.clone(),
                source,
            })?;

        info!(
            pid = child.id(),
            port,
            app = %app_path.display(),
            "launched app"
        );
        running.push(RunningApp { port, child });
        Ok(port)
    }
}

#[cfg(test)]
#[path = "tests/deploy_tests.rs"]
mod tests;
