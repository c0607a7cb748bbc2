//! Application state: AI gateway, challenge bank, and progress store.
//!
//! The bank is built once at startup from built-in seeds plus any entries from
//! the TOML config (config entries win on id clashes). It is read-only afterwards.

use std::{collections::HashMap, sync::Arc};

use tracing::{info, instrument, warn};

use crate::config::{load_agent_config_from_env, BankEntryCfg, Settings};
use crate::domain::ChallengeQuestion;
use crate::gateway::AiGateway;
use crate::llm::TextGenerator;
use crate::openai::OpenAI;
use crate::progress::{InMemoryProgress, ProgressStore};
use crate::seeds::seed_challenges;

/// Static challenges grouped by skill-tree node, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct ChallengeBank {
    by_node: HashMap<String, Vec<ChallengeQuestion>>,
}

impl ChallengeBank {
    pub fn from_entries(configured: Vec<BankEntryCfg>) -> Self {
        let mut bank = Self::default();
        for entry in configured {
            bank.insert(entry.node_id, entry.question);
        }
        // Built-in seeds never overwrite configured ids.
        for (node_id, question) in seed_challenges() {
            if bank.find(&node_id, &question.id).is_none() {
                bank.insert(node_id, question);
            }
        }
        bank
    }

    fn insert(&mut self, node_id: String, question: ChallengeQuestion) {
        let questions = self.by_node.entry(node_id).or_default();
        if let Some(existing) = questions.iter_mut().find(|q| q.id == question.id) {
            warn!(target: "challenge", id = %question.id, "Duplicate challenge id in bank; keeping the last one");
            *existing = question;
        } else {
            questions.push(question);
        }
    }

    pub fn for_node(&self, node_id: &str) -> &[ChallengeQuestion] {
        self.by_node.get(node_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn find(&self, node_id: &str, question_id: &str) -> Option<&ChallengeQuestion> {
        self.for_node(node_id).iter().find(|q| q.id == question_id)
    }

    pub fn len(&self) -> usize {
        self.by_node.values().map(Vec::len).sum()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub gateway: AiGateway,
    pub bank: Arc<ChallengeBank>,
    pub progress: Arc<dyn ProgressStore>,
}

impl AppState {
    /// Build state from env: load config, build the bank, init the model client.
    #[instrument(level = "info", skip_all)]
    pub fn new(settings: &Settings) -> Self {
        let cfg = load_agent_config_from_env().unwrap_or_default();
        let bank = ChallengeBank::from_entries(cfg.challenges);
        info!(target: "challenge", nodes = bank.by_node.len(), challenges = bank.len(), "Startup challenge inventory");

        let model: Option<Arc<dyn TextGenerator>> = match OpenAI::from_env(settings.model_timeout) {
            Some(oa) => {
                info!(target: "codequest_backend", base_url = %oa.base_url, model = %oa.model, timeout = ?settings.model_timeout, "AI model enabled.");
                Some(Arc::new(oa))
            }
            None => {
                warn!(target: "codequest_backend", "AI model disabled (no OPENAI_API_KEY). AI endpoints will answer with errors.");
                None
            }
        };

        Self::with_parts(AiGateway::new(model, cfg.prompts), bank, Arc::new(InMemoryProgress::default()))
    }

    pub fn with_parts(gateway: AiGateway, bank: ChallengeBank, progress: Arc<dyn ProgressStore>) -> Self {
        Self { gateway, bank: Arc::new(bank), progress }
    }
}
