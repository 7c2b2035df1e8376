use std::sync::Arc;
use std::time::Instant;

use chrono_tz::Tz;

use crate::error::{ConfigError, StoreResult};
use crate::models::{Analysis, Conversation, EngineResponse, NewConversation, Role, Settings};
use crate::services::action_executor::ActionExecutor;
use crate::services::behavior_analyzer::BehaviorAnalyzer;
use crate::services::context_compactor::ContextCompactor;
use crate::services::context_loader::{ContextCache, ContextLoader};
use crate::services::entity_extractor::EntityExtractor;
use crate::services::message_analyzer::MessageAnalyzer;
use crate::services::predictive_engine::PredictiveEngine;
use crate::services::profile_builder::ProfileBuilder;
use crate::store::Stores;
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::config;

/// Single entry point: one message in, analysis + compact context +
/// predictions + side effects out.
pub struct ContextEngine {
    analyzer: MessageAnalyzer,
    loader: ContextLoader,
    compactor: ContextCompactor,
    profiles: ProfileBuilder,
    behavior: BehaviorAnalyzer,
    predictor: PredictiveEngine,
    executor: ActionExecutor,
    stores: Stores,
    clock: Arc<dyn Clock>,
}

impl ContextEngine {
    pub fn new(settings: &Settings, stores: Stores) -> Result<Self, ConfigError> {
        Self::with_clock(settings, stores, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: &Settings, stores: Stores, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config::validate(settings)?;
        let timezone: Tz = crate::utils::parse_timezone(&settings.general.timezone)
            .ok_or_else(|| ConfigError::Timezone(settings.general.timezone.clone()))?;

        let extractor = Arc::new(EntityExtractor::new(&settings.extraction)?);
        let analyzer = MessageAnalyzer::new(extractor.clone())?;

        let cache = &settings.cache;
        let context_cache = Arc::new(ContextCache::new(
            cache.context_ttl_secs,
            cache.max_entries,
            clock.clone(),
        ));
        let loader = ContextLoader::new(
            stores.clone(),
            context_cache,
            settings.loader.clone(),
            clock.clone(),
        );
        let compactor = ContextCompactor::new(settings.compaction.clone(), timezone, clock.clone());
        let profiles = ProfileBuilder::new(
            stores.clone(),
            extractor,
            settings.history.clone(),
            cache.profile_ttl_secs,
            cache.max_entries,
            timezone,
            clock.clone(),
        );
        let behavior = BehaviorAnalyzer::new(
            stores.clone(),
            settings.history.behavior_window_days,
            cache.behavior_ttl_secs,
            cache.max_entries,
            timezone,
            clock.clone(),
        );
        let executor = ActionExecutor::new(stores.clone(), settings.actions.clone(), timezone, clock.clone());

        log::info!(
            "[ContextEngine] ready (timezone {}, locales {}/{})",
            timezone.name(),
            settings.extraction.primary_locale,
            settings.extraction.secondary_locale
        );

        Ok(Self {
            analyzer,
            loader,
            compactor,
            profiles,
            behavior,
            predictor: PredictiveEngine::new(timezone),
            executor,
            stores,
            clock,
        })
    }

    pub fn analyzer(&self) -> &MessageAnalyzer {
        &self.analyzer
    }

    pub fn loader(&self) -> &ContextLoader {
        &self.loader
    }

    pub fn predictor_mut(&mut self) -> &mut PredictiveEngine {
        &mut self.predictor
    }

    /// Drop every derived cache entry for `user_id`.
    pub fn invalidate_user(&self, user_id: &str) {
        let dropped = self.loader.invalidate_user(user_id);
        self.profiles.invalidate(user_id);
        self.behavior.invalidate(user_id);
        log::debug!("[ContextEngine] invalidated {} context entries for {}", dropped, user_id);
    }

    /// Never fails: every stage substitutes an empty or fallback value on
    /// error.
    pub async fn handle(&self, user_id: &str, text: &str, session_id: Option<&str>) -> EngineResponse {
        let started = Instant::now();
        let session_id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let analysis = self.analyzer.analyze(text);
        let snapshot = self.loader.load(user_id, &analysis).await;
        let compact_context = self.compactor.compact(&snapshot, &analysis);

        let (profile, behavior) = tokio::join!(self.profiles.build(user_id), self.behavior.analyze(user_id));
        let predictions = self.predictor.predict(
            user_id,
            &analysis,
            &snapshot,
            &profile,
            &behavior,
            self.clock.timestamp(),
        );

        let action_records = self.executor.execute(&analysis.entities, user_id, text).await;
        if action_records.iter().any(|r| r.is_write()) {
            self.invalidate_user(user_id);
        }

        log::info!(
            "[ContextEngine] handled message for {} in {}ms: intent {}, relevance {:.2}, {} predictions, {} actions",
            user_id,
            started.elapsed().as_millis(),
            analysis.intent.as_str(),
            compact_context.relevance_score,
            predictions.total(),
            action_records.len()
        );

        EngineResponse {
            session_id,
            analysis,
            compact_context,
            predictions,
            action_records,
        }
    }

    /// Store a message in the user's conversation history. Cached context
    /// stays valid until it expires.
    pub async fn record_message(
        &self,
        user_id: &str,
        role: Role,
        message: &str,
        analysis: Option<&Analysis>,
    ) -> StoreResult<Conversation> {
        let conversation = NewConversation {
            role,
            message: message.to_string(),
            intent: analysis.map(|a| a.intent),
            urgency: analysis.map(|a| a.urgency),
            timestamp: self.clock.timestamp(),
        };
        self.stores.conversations.create(user_id, conversation).await
    }
}
