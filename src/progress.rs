//! Per-user progress: completed skill-tree nodes, XP per skill, and badges.
//!
//! The hosted product keeps this in a document store; the core only needs
//! "mark node complete, add XP" and "is node complete", so the store is a
//! trait with an in-memory implementation.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, instrument};

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkillProgress {
  pub completed_nodes: BTreeSet<String>,
  #[serde(rename = "currentXP")]
  pub current_xp: u64,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct UserProgress {
  pub skills: HashMap<String, SkillProgress>,
  pub badges: HashMap<String, bool>,
}

impl UserProgress {
  pub fn is_node_complete(&self, skill: &str, node_id: &str) -> bool {
    self.skills.get(skill).is_some_and(|s| s.completed_nodes.contains(node_id))
  }
}

/// Outcome of `ProgressStore::mark_node_complete`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeCompletion {
  pub progress: UserProgress,
  /// False when the node was already complete and no XP was credited.
  pub first_time: bool,
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
  async fn get(&self, user_id: &str) -> UserProgress;

  /// Record a completed node. XP is only credited the first time a node completes.
  async fn mark_node_complete(&self, user_id: &str, skill: &str, node_id: &str, xp: u64) -> NodeCompletion;

  async fn is_node_complete(&self, user_id: &str, skill: &str, node_id: &str) -> bool;

  async fn award_badge(&self, user_id: &str, badge: &str) -> UserProgress;
}

#[derive(Default)]
pub struct InMemoryProgress {
  users: RwLock<HashMap<String, UserProgress>>,
}

#[async_trait]
impl ProgressStore for InMemoryProgress {
  async fn get(&self, user_id: &str) -> UserProgress {
    self.users.read().await.get(user_id).cloned().unwrap_or_default()
  }

  #[instrument(level = "debug", skip(self))]
  async fn mark_node_complete(&self, user_id: &str, skill: &str, node_id: &str, xp: u64) -> NodeCompletion {
    let mut users = self.users.write().await;
    let record = users.entry(user_id.to_string()).or_default();
    let skill_progress = record.skills.entry(skill.to_string()).or_default();
    let first_time = skill_progress.completed_nodes.insert(node_id.to_string());
    if first_time {
      skill_progress.current_xp = skill_progress.current_xp.saturating_add(xp);
      info!(target: "progress", %user_id, %skill, %node_id, xp, total_xp = skill_progress.current_xp, "Node completed");
    }
    NodeCompletion { progress: record.clone(), first_time }
  }

  async fn is_node_complete(&self, user_id: &str, skill: &str, node_id: &str) -> bool {
    self.users.read().await.get(user_id).is_some_and(|u| u.is_node_complete(skill, node_id))
  }

  #[instrument(level = "debug", skip(self))]
  async fn award_badge(&self, user_id: &str, badge: &str) -> UserProgress {
    let mut users = self.users.write().await;
    let record = users.entry(user_id.to_string()).or_default();
    record.badges.insert(badge.to_string(), true);
    record.clone()
  }
}
