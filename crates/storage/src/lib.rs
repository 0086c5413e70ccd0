use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, sync::RwLock};
use tracing::debug;

use shared::domain::{Event, EventId, Organization, UserId, UserProfile};

const EVENTS_FILE: &str = "events.json";
const USERS_FILE: &str = "users.json";
const ORGANIZATIONS_FILE: &str = "organizations.json";

/// Keyed access to the event collection. `save_all` replaces the whole
/// collection.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<Event>>;

    async fn load_by_id(&self, event_id: EventId) -> Result<Option<Event>> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .find(|event| event.id == event_id))
    }

    async fn save_all(&self, events: &[Event]) -> Result<()>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserProfile>>;
}

#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// First organization owned by `owner`, in storage order.
    async fn find_by_owner(&self, owner: UserId) -> Result<Option<Organization>>;
}

/// Flat JSON files under one data directory, one file per collection.
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).await.with_context(|| {
            format!("failed to create data directory '{}'", data_dir.display())
        })?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub async fn load_users(&self) -> Result<Vec<UserProfile>> {
        read_collection(&self.data_dir.join(USERS_FILE)).await
    }

    pub async fn save_users(&self, users: &[UserProfile]) -> Result<()> {
        write_collection(&self.data_dir.join(USERS_FILE), users).await
    }

    pub async fn load_organizations(&self) -> Result<Vec<Organization>> {
        read_collection(&self.data_dir.join(ORGANIZATIONS_FILE)).await
    }

    pub async fn save_organizations(&self, organizations: &[Organization]) -> Result<()> {
        write_collection(&self.data_dir.join(ORGANIZATIONS_FILE), organizations).await
    }
}

#[async_trait]
impl EventStore for Storage {
    async fn load_all(&self) -> Result<Vec<Event>> {
        read_collection(&self.data_dir.join(EVENTS_FILE)).await
    }

    async fn save_all(&self, events: &[Event]) -> Result<()> {
        write_collection(&self.data_dir.join(EVENTS_FILE), events).await
    }

    async fn health_check(&self) -> Result<()> {
        let metadata = fs::metadata(&self.data_dir)
            .await
            .with_context(|| format!("data directory '{}' unreachable", self.data_dir.display()))?;
        anyhow::ensure!(
            metadata.is_dir(),
            "'{}' is not a directory",
            self.data_dir.display()
        );
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for Storage {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        Ok(self
            .load_users()
            .await?
            .into_iter()
            .find(|user| user.id == user_id))
    }
}

#[async_trait]
impl OrganizationDirectory for Storage {
    async fn find_by_owner(&self, owner: UserId) -> Result<Option<Organization>> {
        Ok(self
            .load_organizations()
            .await?
            .into_iter()
            .find(|organization| organization.user_id == owner))
    }
}

/// A missing file is an empty collection.
async fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&raw).with_context(|| format!("failed to parse '{}'", path.display()))
}

/// Writes next to the target and renames over it, so readers see either the
/// old or the new collection.
async fn write_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(items)
        .with_context(|| format!("failed to serialize '{}'", path.display()))?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json)
        .await
        .with_context(|| format!("failed to write '{}'", staging.display()))?;
    fs::rename(&staging, path)
        .await
        .with_context(|| format!("failed to replace '{}'", path.display()))?;
    debug!(path = %path.display(), items = items.len(), "collection saved");
    Ok(())
}

/// Process-local backend with the same semantics as [`Storage`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    events: Arc<RwLock<Vec<Event>>>,
    users: Arc<RwLock<Vec<UserProfile>>>,
    organizations: Arc<RwLock<Vec<Organization>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserProfile) {
        self.users.write().await.push(user);
    }

    pub async fn insert_organization(&self, organization: Organization) {
        self.organizations.write().await.push(organization);
    }
}

#[async_trait]
impl EventStore for MemoryStorage {
    async fn load_all(&self) -> Result<Vec<Event>> {
        Ok(self.events.read().await.clone())
    }

    async fn save_all(&self, events: &[Event]) -> Result<()> {
        *self.events.write().await = events.to_vec();
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStorage {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| user.id == user_id)
            .cloned())
    }
}

#[async_trait]
impl OrganizationDirectory for MemoryStorage {
    async fn find_by_owner(&self, owner: UserId) -> Result<Option<Organization>> {
        Ok(self
            .organizations
            .read()
            .await
            .iter()
            .find(|organization| organization.user_id == owner)
            .cloned())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
