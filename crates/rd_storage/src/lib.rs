use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rd_core::{ArticleStore, Error, Result};

pub mod backends;

pub use backends::*;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://robotics.db";

#[async_trait]
pub trait StorageBackend: ArticleStore + Sized {
    fn get_error_message() -> &'static str;

    /// Open the backend at `url`, or at its default location.
    async fn open(url: Option<&str>) -> Result<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    SQLite,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::SQLite),
            other => Err(Error::Config(format!(
                "Unknown storage backend `{}` (expected memory or sqlite)",
                other
            ))),
        }
    }
}

async fn open_backend<T: StorageBackend + 'static>(url: Option<&str>) -> Result<Arc<dyn ArticleStore>> {
    let storage = T::open(url).await.map_err(|e| {
        tracing::error!("{}: {}", T::get_error_message(), e);
        e
    })?;
    Ok(Arc::new(storage))
}

/// Open the storage backend named by `kind`.
pub async fn create_storage(kind: &str, url: Option<&str>) -> Result<Arc<dyn ArticleStore>> {
    match kind.parse::<StorageKind>()? {
        StorageKind::Memory => open_backend::<InMemoryStorage>(url).await,
        #[cfg(feature = "sqlite")]
        StorageKind::SQLite => open_backend::<SQLiteStorage>(url).await,
        #[cfg(not(feature = "sqlite"))]
        StorageKind::SQLite => Err(Error::Config(
            "SQLite support was not compiled in (enable the `sqlite` feature)".to_string(),
        )),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageBackend, StorageKind};
}
