use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subscriptions::catalog::SubscriptionFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Playing,
    Completed,
    Backlog,
    Dropped,
    Wishlist,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Completed => "completed",
            Self::Backlog => "backlog",
            Self::Dropped => "dropped",
            Self::Wishlist => "wishlist",
        }
    }
}

/// A game in one user's collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryGame {
    pub id: Uuid,
    pub user_id: String,
    pub igdb_id: i64,
    pub name: String,
    pub cover_url: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub platforms: Vec<String>,
    pub metacritic_score: Option<i32>,
    pub summary: Option<String>,
    pub genres: Vec<String>,
    pub status: GameStatus,
    pub added_at: DateTime<Utc>,
    pub subscriptions: SubscriptionFlags,
    pub subscriptions_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLibraryGame {
    pub igdb_id: i64,
    pub name: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub metacritic_score: Option<i32>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub status: GameStatus,
}

impl LibraryGame {
    pub fn new(user_id: impl Into<String>, game: NewLibraryGame) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            igdb_id: game.igdb_id,
            name: game.name,
            cover_url: game.cover_url,
            release_date: game.release_date,
            platforms: game.platforms,
            metacritic_score: game.metacritic_score,
            summary: game.summary,
            genres: game.genres,
            status: game.status,
            added_at: Utc::now(),
            subscriptions: SubscriptionFlags::default(),
            subscriptions_updated_at: None,
        }
    }
}

/// One `(igdb id, name)` pair per distinct catalog game across all users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinctGame {
    pub igdb_id: i64,
    pub name: String,
}

/// Partial flag update. `None` leaves the stored value as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionPatch {
    pub game_pass_console: Option<bool>,
    pub game_pass_pc: Option<bool>,
    pub ps_plus: Option<bool>,
    pub geforce_now: Option<bool>,
}

impl SubscriptionPatch {
    pub fn apply(&self, flags: &mut SubscriptionFlags) {
        if let Some(v) = self.game_pass_console {
            flags.game_pass_console = v;
        }
        if let Some(v) = self.game_pass_pc {
            flags.game_pass_pc = v;
        }
        if let Some(v) = self.ps_plus {
            flags.ps_plus = v;
        }
        if let Some(v) = self.geforce_now {
            flags.geforce_now = v;
        }
    }
}

impl From<SubscriptionFlags> for SubscriptionPatch {
    fn from(flags: SubscriptionFlags) -> Self {
        Self {
            game_pass_console: Some(flags.game_pass_console),
            game_pass_pc: Some(flags.game_pass_pc),
            ps_plus: Some(flags.ps_plus),
            geforce_now: Some(flags.geforce_now),
        }
    }
}
