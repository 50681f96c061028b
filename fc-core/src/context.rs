//! Application context
//!
//! Everything a front end needs, built once at startup and passed by
//! reference: settings, the event bus, the shared loader and the service
//! controller.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::{self, Loader, LoopHandle, SharedLoader};
use crate::error::Result;
use crate::events::{EventBus, Subscription};
use crate::service::{ServiceController, ServiceManager, SystemdManager};
use crate::settings::AppSettings;

#[derive(Debug)]
pub struct AppContext {
    settings: AppSettings,
    bus: EventBus,
    loader: SharedLoader,
    service: ServiceController,
}

impl AppContext {
    /// Context backed by systemd
    pub fn new(settings: AppSettings) -> Self {
        Self::with_manager(settings, Arc::new(SystemdManager::new()))
    }

    pub fn with_manager(settings: AppSettings, manager: Arc<dyn ServiceManager>) -> Self {
        let bus = EventBus::new();
        let service = ServiceController::new(manager, settings.service_name.clone());

        let mut loader = Loader::new(settings.hwmon_root.clone(), bus.clone());
        if settings.restart_on_save {
            loader.set_service(Some(service.clone()));
        }

        Self {
            settings,
            bus,
            loader: loader.shared(),
            service,
        }
    }

    /// Discover hardware and open the configured file when it exists.
    ///
    /// A missing file leaves a fresh configuration; saving creates it.
    pub fn bootstrap(&self) -> Result<()> {
        let mut loader = self.loader.write();
        let devices = loader.parse_hwmons();
        debug!(devices, "Initial discovery finished");

        let path = &self.settings.config_path;
        if path.exists() {
            loader.open(path)?;
        } else {
            warn!(path = ?path, "Configuration file not found, starting fresh");
        }
        info!(
            devices,
            interval = loader.interval(),
            "fancontrol-gui ready"
        );
        Ok(())
    }

    /// Spawn the polling loop on the current runtime and arm its timer
    pub async fn start(&self) -> Result<LoopHandle> {
        let handle = engine::spawn(self.loader.clone());
        handle.start().await?;
        Ok(handle)
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn loader(&self) -> &SharedLoader {
        &self.loader
    }

    pub fn service(&self) -> &ServiceController {
        &self.service
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::service::MockServiceManager;
    use crate::test_utils::{standard_tree, FakeSysfs, STANDARD_CONFIG};
    use std::fs;

    fn settings_for(fake: &FakeSysfs) -> AppSettings {
        AppSettings {
            hwmon_root: fake.root(),
            config_path: fake.scratch().join("fancontrol"),
            ..AppSettings::default()
        }
    }

    #[test]
    fn test_bootstrap_opens_existing_config() {
        let fake = standard_tree();
        let settings = settings_for(&fake);
        fs::write(&settings.config_path, STANDARD_CONFIG).unwrap();

        let ctx = AppContext::with_manager(settings, Arc::new(MockServiceManager::new()));
        ctx.bootstrap().unwrap();
        let loader = ctx.loader().read();
        assert_eq!(loader.hwmons().len(), 2);
        assert_eq!(loader.model().controls.len(), 2);
        assert_eq!(loader.error(), "");
    }

    #[test]
    fn test_bootstrap_without_config_starts_fresh() {
        let fake = standard_tree();
        let ctx = AppContext::with_manager(settings_for(&fake), Arc::new(MockServiceManager::new()));
        ctx.bootstrap().unwrap();
        let loader = ctx.loader().read();
        assert!(loader.config_path().is_none());
        assert!(loader.model().is_fresh());
    }

    #[test]
    fn test_restart_on_save_reaches_service() {
        let fake = standard_tree();
        let mut settings = settings_for(&fake);
        settings.restart_on_save = true;
        fs::write(&settings.config_path, STANDARD_CONFIG).unwrap();

        let mut mock = MockServiceManager::new();
        mock.expect_exists().returning(|_| Ok(true));
        mock.expect_execute()
            .times(1)
            .returning(|r| Ok(format!("{} succeeded", r.method())));

        let ctx = AppContext::with_manager(settings, Arc::new(mock));
        ctx.bootstrap().unwrap();
        let mut sub = ctx.subscribe();
        ctx.loader().write().save(None).unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let finished = runtime.block_on(async {
            loop {
                match sub.recv().await {
                    Some(Event::ServiceFinished { outcome, .. }) => break outcome,
                    Some(_) => continue,
                    None => panic!("bus closed"),
                }
            }
        });
        assert_eq!(finished, Ok("ReloadOrRestartUnit succeeded".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_arms_loop() {
        let fake = standard_tree();
        let ctx = AppContext::with_manager(settings_for(&fake), Arc::new(MockServiceManager::new()));
        ctx.bootstrap().unwrap();
        let handle = ctx.start().await.unwrap();
        assert_eq!(handle.state(), engine::LoopState::Scheduled);
        handle.stop().await;
    }
}
