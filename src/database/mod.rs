use async_trait::async_trait;
use uuid::Uuid;

pub mod library_game;
pub mod memory;

pub use library_game::{DistinctGame, GameStatus, LibraryGame, NewLibraryGame, SubscriptionPatch};
pub use memory::MemStorage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("library game {0} not found")]
    NotFound(Uuid),
    #[error("game {igdb_id} is already in the collection of {user_id}")]
    Duplicate { user_id: String, igdb_id: i64 },
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// What the subscription refresh needs from library storage.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Distinct by `igdb_id` across every user's library.
    async fn list_distinct_library_games(&self) -> Result<Vec<DistinctGame>, StorageError>;

    /// Merge `patch` onto every library row with this `igdb_id`.
    async fn write_subscription_flags(
        &self,
        igdb_id: i64,
        patch: SubscriptionPatch,
    ) -> Result<(), StorageError>;
}
