//! Process-wide table of running driver instances, keyed by driver name.
//!
//! An instance enters the table only after it has been built and
//! initialized, and leaves it through [`remove`], which hands ownership back
//! to the caller for teardown.

use crate::errors::{DriverError, DriverResult};
use crate::sensors::Mpu6000;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tracing::info;

type Instances = HashMap<String, Arc<Mpu6000>>;

static REGISTRY: OnceLock<Mutex<Instances>> = OnceLock::new();

fn instances() -> &'static Mutex<Instances> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Build and register an instance under `name`.
///
/// The table stays locked while `build` runs, so two concurrent starts of
/// the same name cannot both succeed. A failed build leaves nothing behind.
pub async fn register<F, Fut>(name: &str, build: F) -> DriverResult<Arc<Mpu6000>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DriverResult<Mpu6000>>,
{
    let mut table = instances().lock().await;
    if table.contains_key(name) {
        return Err(DriverError::AlreadyRunning {
            name: name.to_string(),
        });
    }

    let driver = Arc::new(build().await?);
    table.insert(name.to_string(), driver.clone());
    info!("[registry] registered driver '{}'", name);
    Ok(driver)
}

pub async fn lookup(name: &str) -> Option<Arc<Mpu6000>> {
    instances().lock().await.get(name).cloned()
}

/// Take an instance out of the table; the caller owns its teardown
pub async fn remove(name: &str) -> Option<Arc<Mpu6000>> {
    let removed = instances().lock().await.remove(name);
    if removed.is_some() {
        info!("[registry] removed driver '{}'", name);
    }
    removed
}

pub async fn names() -> Vec<String> {
    let mut names: Vec<String> = instances().lock().await.keys().cloned().collect();
    names.sort();
    names
}
