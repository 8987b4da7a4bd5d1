use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    DistinctGame, GameStatus, LibraryGame, LibraryStore, NewLibraryGame, StorageError,
    SubscriptionPatch,
};

#[derive(Debug, Default)]
pub struct MemStorage {
    games: RwLock<HashMap<Uuid, LibraryGame>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(skip(self, game), fields(igdb_id = game.igdb_id))]
    pub async fn create_game(
        &self,
        user_id: &str,
        game: NewLibraryGame,
    ) -> Result<LibraryGame, StorageError> {
        let mut games = self.games.write().await;

        if games
            .values()
            .any(|g| g.user_id == user_id && g.igdb_id == game.igdb_id)
        {
            return Err(StorageError::Duplicate {
                user_id: user_id.to_string(),
                igdb_id: game.igdb_id,
            });
        }

        let game = LibraryGame::new(user_id, game);
        games.insert(game.id, game.clone());

        tracing::info!(id = %game.id, name = %game.name, "added game to library");
        Ok(game)
    }

    pub async fn get_game(&self, id: Uuid) -> Option<LibraryGame> {
        self.games.read().await.get(&id).cloned()
    }

    /// Oldest first.
    pub async fn get_user_games(&self, user_id: &str) -> Vec<LibraryGame> {
        self.filter_games(|g| g.user_id == user_id).await
    }

    pub async fn get_user_games_by_status(&self, user_id: &str, status: GameStatus) -> Vec<LibraryGame> {
        self.filter_games(|g| g.user_id == user_id && g.status == status)
            .await
    }

    pub async fn find_user_game_by_igdb_id(&self, user_id: &str, igdb_id: i64) -> Option<LibraryGame> {
        self.games
            .read()
            .await
            .values()
            .find(|g| g.user_id == user_id && g.igdb_id == igdb_id)
            .cloned()
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_game_status(
        &self,
        id: Uuid,
        status: GameStatus,
    ) -> Result<LibraryGame, StorageError> {
        let mut games = self.games.write().await;
        let game = games.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        game.status = status;
        Ok(game.clone())
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_game(&self, id: Uuid) -> bool {
        self.games.write().await.remove(&id).is_some()
    }

    async fn filter_games(&self, f: impl Fn(&LibraryGame) -> bool) -> Vec<LibraryGame> {
        let mut games: Vec<LibraryGame> = self
            .games
            .read()
            .await
            .values()
            .filter(|g| f(g))
            .cloned()
            .collect();
        games.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.name.cmp(&b.name)));
        games
    }
}

#[async_trait]
impl LibraryStore for MemStorage {
    async fn list_distinct_library_games(&self) -> Result<Vec<DistinctGame>, StorageError> {
        let games = self.games.read().await;
        let mut distinct: BTreeMap<i64, &LibraryGame> = BTreeMap::new();

        // the earliest added row names the game
        for game in games.values() {
            distinct
                .entry(game.igdb_id)
                .and_modify(|current| {
                    if game.added_at < current.added_at {
                        *current = game;
                    }
                })
                .or_insert(game);
        }

        Ok(distinct
            .into_iter()
            .map(|(igdb_id, game)| DistinctGame {
                igdb_id,
                name: game.name.clone(),
            })
            .collect())
    }

    async fn write_subscription_flags(
        &self,
        igdb_id: i64,
        patch: SubscriptionPatch,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut games = self.games.write().await;

        for game in games.values_mut().filter(|g| g.igdb_id == igdb_id) {
            patch.apply(&mut game.subscriptions);
            game.subscriptions_updated_at = Some(now);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriptions::catalog::SubscriptionFlags;

    fn new_game(igdb_id: i64, name: &str, status: GameStatus) -> NewLibraryGame {
        NewLibraryGame {
            igdb_id,
            name: name.into(),
            cover_url: None,
            release_date: None,
            platforms: vec![],
            metacritic_score: None,
            summary: None,
            genres: vec![],
            status,
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_game_for_same_user() {
        let storage = MemStorage::new();
        storage
            .create_game("alice", new_game(1, "Hades", GameStatus::Playing))
            .await
            .unwrap();

        let err = storage
            .create_game("alice", new_game(1, "Hades", GameStatus::Backlog))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StorageError::Duplicate {
                user_id: "alice".into(),
                igdb_id: 1
            }
        );

        storage
            .create_game("bob", new_game(1, "Hades", GameStatus::Backlog))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn filters_by_user_and_status() {
        let storage = MemStorage::new();
        storage.create_game("alice", new_game(1, "Hades", GameStatus::Playing)).await.unwrap();
        storage.create_game("alice", new_game(2, "Celeste", GameStatus::Completed)).await.unwrap();
        storage.create_game("bob", new_game(3, "Tunic", GameStatus::Playing)).await.unwrap();

        assert_eq!(storage.get_user_games("alice").await.len(), 2);

        let playing = storage.get_user_games_by_status("alice", GameStatus::Playing).await;
        assert_eq!(playing.len(), 1);
        assert_eq!(playing[0].name, "Hades");

        assert!(storage.find_user_game_by_igdb_id("bob", 3).await.is_some());
        assert!(storage.find_user_game_by_igdb_id("alice", 3).await.is_none());
    }

    #[tokio::test]
    async fn updates_status_and_deletes() {
        let storage = MemStorage::new();
        let game = storage.create_game("alice", new_game(1, "Hades", GameStatus::Backlog)).await.unwrap();

        let updated = storage.update_game_status(game.id, GameStatus::Dropped).await.unwrap();
        assert_eq!(updated.status, GameStatus::Dropped);

        assert!(storage.delete_game(game.id).await);
        assert!(!storage.delete_game(game.id).await);
        assert_eq!(
            storage.update_game_status(game.id, GameStatus::Playing).await,
            Err(StorageError::NotFound(game.id))
        );
    }

    #[tokio::test]
    async fn lists_distinct_games_across_users() {
        let storage = MemStorage::new();
        storage.create_game("alice", new_game(20, "Hades", GameStatus::Playing)).await.unwrap();
        storage.create_game("bob", new_game(20, "Hades", GameStatus::Wishlist)).await.unwrap();
        storage.create_game("bob", new_game(10, "Celeste", GameStatus::Backlog)).await.unwrap();

        let distinct = storage.list_distinct_library_games().await.unwrap();

        assert_eq!(
            distinct,
            vec![
                DistinctGame { igdb_id: 10, name: "Celeste".into() },
                DistinctGame { igdb_id: 20, name: "Hades".into() },
            ]
        );
    }

    #[tokio::test]
    async fn flag_patch_touches_every_row_and_keeps_absent_fields() {
        let storage = MemStorage::new();
        let a = storage.create_game("alice", new_game(20, "Hades", GameStatus::Playing)).await.unwrap();
        let b = storage.create_game("bob", new_game(20, "Hades", GameStatus::Wishlist)).await.unwrap();
        let other = storage.create_game("bob", new_game(10, "Celeste", GameStatus::Backlog)).await.unwrap();

        let full = SubscriptionFlags {
            game_pass_console: true,
            game_pass_pc: true,
            ps_plus: false,
            geforce_now: true,
        };
        storage.write_subscription_flags(20, full.into()).await.unwrap();
        storage
            .write_subscription_flags(
                20,
                SubscriptionPatch {
                    geforce_now: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for id in [a.id, b.id] {
            let game = storage.get_game(id).await.unwrap();
            assert_eq!(
                game.subscriptions,
                SubscriptionFlags {
                    geforce_now: false,
                    ..full
                }
            );
            assert!(game.subscriptions_updated_at.is_some());
        }

        let untouched = storage.get_game(other.id).await.unwrap();
        assert_eq!(untouched.subscriptions, SubscriptionFlags::default());
        assert!(untouched.subscriptions_updated_at.is_none());
    }
}
