use anyhow::Result;
use hubkit::prelude::*;
use hubkit::{HUB_NAME, VERSION};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 2. Load the hub configuration, falling back to defaults.
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "hubdev.toml".to_string());
    let config = HubConfig::load_from(&config_path).unwrap_or_else(|e| {
        warn!("Failed to load {}: {}, using defaults", config_path, e);
        HubConfig::default()
    });
    info!("{} v{} ({})", HUB_NAME, VERSION, config.label);

    // 3. Create the hub and plug the demo components.
    let hub = Hub::with_config(config);
    let backend = Arc::new(Backend::new());
    let frontend = Arc::new(Frontend::new());
    hub.register_component(backend.clone())?
        .register_component_with(frontend.clone(), ComponentConfig::named("ui"))?;

    // 4. Wire the frontend to the backend through the user contract.
    hub.bind(
        Binding::new()
            .component("backend")
            .to("ui")
            .into_member("backend")
            .contract(user_contract()),
    )?;

    // 5. Start everything and exercise events and services.
    hub.start();
    frontend.login("alice")?;

    let backend_ref: ComponentRef = backend.clone();
    hub.publish(&backend_ref, "users/logout", Event::new().with("user", "alice"));

    for reference in hub.get_service_references(Some(&user_contract())) {
        info!(
            "[SERVICE] {} published by {:?}",
            reference.id(),
            reference.property_str(SERVICE_PUBLISHER)
        );
    }

    info!("Logins served: {}", backend.logins.load(Ordering::Relaxed));
    hub.reset();
    Ok(())
}

fn user_contract() -> Contract {
    Contract::new("UserService").method("login")
}

/// Serves logins and publishes itself as the user service once started.
struct Backend {
    hub: Mutex<Option<Hub>>,
    logins: Arc<AtomicU32>,
    members: Members,
}

impl Backend {
    fn new() -> Self {
        let logins = Arc::new(AtomicU32::new(0));
        let counter = logins.clone();
        let members = Members::new().with_method("login", move |args: &[Arg]| {
            counter.fetch_add(1, Ordering::Relaxed);
            let user = args.first().and_then(Arg::as_str).unwrap_or("anonymous");
            json!({ "user": user, "granted": true })
        });
        Self {
            hub: Mutex::new(None),
            logins,
            members,
        }
    }
}

impl Component for Backend {
    fn name(&self) -> String {
        "backend".to_string()
    }

    fn configure(&self, hub: &Hub, _config: &ComponentConfig) {
        *self.hub.lock() = Some(hub.clone());
    }

    fn start(&self) {
        let Some(hub) = self.hub.lock().clone() else {
            return;
        };
        if let Some(me) = hub.get_component("backend") {
            let properties = json!({ "realm": "demo" });
            let properties = properties.as_object().cloned().unwrap_or_default();
            if let Err(e) = hub.register_service_with(&user_contract(), &me, properties) {
                warn!("Backend could not publish its service: {}", e);
            }
        }
    }

    fn stop(&self) {
        info!("[BACKEND] stopped");
    }

    fn members(&self) -> Option<&Members> {
        Some(&self.members)
    }
}

/// Receives the backend through a binding and listens to user topics.
struct Frontend {
    backend: Arc<Mutex<Option<Handle>>>,
    members: Members,
}

impl Frontend {
    fn new() -> Self {
        let backend = Arc::new(Mutex::new(None));
        let slot = backend.clone();
        let members = Members::new().with_setter("backend", move |handle| {
            *slot.lock() = Some(handle);
        });
        Self { backend, members }
    }

    fn login(&self, user: &str) -> Result<()> {
        let Some(backend) = self.backend.lock().clone() else {
            anyhow::bail!("frontend is not bound to a backend");
        };
        let answer = backend.call("login", &[json!(user)])?;
        info!("[FRONTEND] login answer: {}", answer);
        Ok(())
    }
}

impl Component for Frontend {
    fn name(&self) -> String {
        "frontend".to_string()
    }

    fn configure(&self, hub: &Hub, _config: &ComponentConfig) {
        let Some(me) = hub.get_component("ui") else {
            return;
        };
        let on_user = callback(|event| info!("[FRONTEND] <= {:?} {:?}", event.topic(), event.data()));
        if let Err(e) = hub.subscribe(&me, "^users/", on_user, None) {
            warn!("Frontend could not subscribe: {}", e);
        }
    }

    fn start(&self) {}

    fn stop(&self) {
        info!("[FRONTEND] stopped");
    }

    fn members(&self) -> Option<&Members> {
        Some(&self.members)
    }
}
