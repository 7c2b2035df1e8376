use std::sync::Arc;

use regex::Regex;

use crate::error::ConfigError;
use crate::models::{Analysis, Complexity, Intent, Urgency};
use crate::services::entity_extractor::EntityExtractor;

/// Ordered (label, pattern) rules. The first matching rule decides;
/// `default` applies when none match.
#[derive(Debug)]
pub struct ClassificationRules<L: Copy> {
    rules: Vec<(L, Regex)>,
    default: L,
}

impl<L: Copy> ClassificationRules<L> {
    pub fn new(rules: &[(L, &str)], default: L) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|(label, pattern)| Ok((*label, Regex::new(pattern)?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules, default })
    }

    pub fn classify(&self, text: &str) -> L {
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(label, _)| *label)
            .unwrap_or(self.default)
    }

    pub fn labels(&self) -> Vec<L> {
        self.rules.iter().map(|(label, _)| *label).collect()
    }
}

fn intent_rules() -> Result<ClassificationRules<Intent>, regex::Error> {
    ClassificationRules::new(
        &[
            (
                Intent::TaskCreation,
                r"(?i)\b(?:create|add|new|make|schedule|agendar|crear)\b.*\b(?:task|todo|reminder|tarea|recordatorio)",
            ),
            (
                Intent::ContactLookup,
                r"(?i)\b(?:find|show|get|who\s+is|contact|call|email|encontrar|buscar|llamar)\b",
            ),
            (
                Intent::ProjectStatus,
                r"(?i)\b(?:status|progress|update|how\b.*\bgoing|estado|progreso|actualizar)\b",
            ),
            (
                Intent::Scheduling,
                r"(?i)\b(?:when|schedule|calendar|meeting|appointment|cuándo|agendar|reunión|cita)\b",
            ),
            (
                Intent::DataRetrieval,
                r"(?i)\b(?:show|list|find|search|get|what|where|mostrar|listar|buscar|qué|dónde)\b",
            ),
            (
                Intent::Planning,
                r"(?i)\b(?:plan|organize|prepare|strategy|planear|organizar|preparar|estrategia)\b",
            ),
            (
                Intent::Question,
                r"(?i)\?|\b(?:what|how|when|where|why|who|qué|cómo|cuándo|dónde|por\s+qué|quién)\b",
            ),
            (
                Intent::Command,
                r"(?i)\b(?:create|delete|update|remove|add|send|call|crear|eliminar|actualizar|enviar|llamar)\b",
            ),
            (
                Intent::Greeting,
                r"(?i)\b(?:hello|hi|hola|hey|good\s+morning|good\s+afternoon|good\s+evening|buenos\s+días|buenas\s+tardes|buenas\s+noches)\b",
            ),
        ],
        Intent::Information,
    )
}

fn urgency_rules() -> Result<ClassificationRules<Urgency>, regex::Error> {
    ClassificationRules::new(
        &[
            (
                Urgency::Critical,
                r"(?i)\b(?:urgent|emergency|asap|immediately|critical|now|urgente|emergencia|inmediatamente|crítico|ahora)\b",
            ),
            (
                Urgency::High,
                r"(?i)\b(?:important|priority|soon|today|importante|prioridad|pronto|hoy)\b",
            ),
            (
                Urgency::Low,
                r"(?i)\b(?:later|sometime|eventually|después|algún\s+momento|eventualmente)\b|\bwhen\b.*\btime\b|\bcuando\b.*\btiempo\b",
            ),
        ],
        Urgency::Medium,
    )
}

const ACTION_PATTERN: &str = r"(?i)\b(?:create|add|schedule|remind|call|send|update|delete|crear|agregar|agendar|recordar|llamar|enviar|actualizar|eliminar)";

pub struct MessageAnalyzer {
    extractor: Arc<EntityExtractor>,
    intents: ClassificationRules<Intent>,
    urgency: ClassificationRules<Urgency>,
    action: Regex,
}

impl MessageAnalyzer {
    pub fn new(extractor: Arc<EntityExtractor>) -> Result<Self, ConfigError> {
        Ok(Self {
            extractor,
            intents: intent_rules()?,
            urgency: urgency_rules()?,
            action: Regex::new(ACTION_PATTERN)?,
        })
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    pub fn intent_order(&self) -> Vec<Intent> {
        self.intents.labels()
    }

    /// Classify and extract. Never fails: a faulting entity group is
    /// replaced by its empty value.
    pub fn analyze(&self, text: &str) -> Analysis {
        let (entities, faults) = self.extractor.extract_with_faults(text);
        for fault in &faults {
            log::warn!("[MessageAnalyzer] entity extraction fault, using empty group: {}", fault);
        }

        let entity_count = entities.total_count();
        let length = text.chars().count();
        let complexity = if length > 200 || entity_count > 5 {
            Complexity::Complex
        } else if length < 50 && entity_count < 2 {
            Complexity::Simple
        } else {
            Complexity::Medium
        };

        let analysis = Analysis {
            intent: self.intents.classify(text),
            urgency: self.urgency.classify(text),
            complexity,
            action_required: self.action.is_match(text),
            entities,
        };

        log::debug!(
            "[MessageAnalyzer] intent={} urgency={} entities={} action_required={}",
            analysis.intent.as_str(),
            analysis.urgency.as_str(),
            entity_count,
            analysis.action_required
        );
        analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionSettings;

    fn analyzer() -> MessageAnalyzer {
        let extractor = EntityExtractor::new(&ExtractionSettings::default()).unwrap();
        MessageAnalyzer::new(Arc::new(extractor)).unwrap()
    }

    #[test]
    fn test_scheduling_scenario() {
        let a = analyzer().analyze("Necesito agendar una cita con Carlos Perez el martes a las 3 PM");
        assert_eq!(a.intent, Intent::Scheduling);
        assert!(a.action_required);
        assert!(a.entities.contacts.names.contains(&"Carlos Perez".to_string()));
        assert!(a.entities.dates.days.contains(&"martes".to_string()));
        assert!(a.entities.dates.times.iter().any(|t| t.contains('3')));
    }

    #[test]
    fn test_empty_text_defaults() {
        let a = analyzer().analyze("");
        assert_eq!(a.intent, Intent::Information);
        assert_eq!(a.urgency, Urgency::Medium);
        assert!(!a.action_required);
        assert!(a.entities.is_empty());
        assert_eq!(a.complexity, Complexity::Simple);
    }

    #[test]
    fn test_rule_order_is_first_match_wins() {
        let analyzer = analyzer();
        // matches both data_retrieval ("what") and question ("?")
        assert_eq!(analyzer.analyze("what is pending?").intent, Intent::DataRetrieval);
        // matches task_creation and scheduling; task_creation is listed first
        assert_eq!(
            analyzer.analyze("schedule a reminder for the demo").intent,
            Intent::TaskCreation
        );
        assert_eq!(analyzer.analyze("why?").intent, Intent::Question);
        assert_eq!(analyzer.analyze("hola").intent, Intent::Greeting);
        // "hi" inside "this" is not a greeting
        assert_eq!(analyzer.analyze("this is fine").intent, Intent::Information);
        assert_eq!(analyzer.intent_order().first(), Some(&Intent::TaskCreation));
    }

    #[test]
    fn test_urgency_tiers() {
        let analyzer = analyzer();
        assert_eq!(analyzer.analyze("necesito esto urgente").urgency, Urgency::Critical);
        assert_eq!(analyzer.analyze("es importante, pero hoy no").urgency, Urgency::High);
        assert_eq!(analyzer.analyze("do it later").urgency, Urgency::Low);
        assert_eq!(analyzer.analyze("when you have time").urgency, Urgency::Low);
        assert_eq!(analyzer.analyze("known issue").urgency, Urgency::Medium);
    }

    #[test]
    fn test_complexity_from_length_and_entities() {
        let analyzer = analyzer();
        let long = "a".repeat(201);
        assert_eq!(analyzer.analyze(&long).complexity, Complexity::Complex);
        let medium = "Please look at the quarterly numbers in the spreadsheet soon";
        assert_eq!(analyzer.analyze(medium).complexity, Complexity::Medium);
    }

    #[test]
    fn test_extraction_fault_keeps_other_groups() {
        let settings = ExtractionSettings {
            max_matches_per_group: 1,
            ..Default::default()
        };
        let extractor = EntityExtractor::new(&settings).unwrap();
        let analyzer = MessageAnalyzer::new(Arc::new(extractor)).unwrap();
        let a = analyzer.analyze("budget and contract for Ana Gómez");
        assert!(a.entities.keywords.business.is_empty());
        assert_eq!(a.entities.contacts.names, vec!["Ana Gómez".to_string()]);
    }
}
