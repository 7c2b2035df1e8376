//! Pattern-table entity extraction.
//!
//! Each locale is a flat list of (target field, regex, capture) rules. The
//! extractor runs the locale-neutral table first, then the primary and the
//! secondary locale, so adding a language means adding a table.

use regex::Regex;

use crate::error::{ConfigError, ExtractError};
use crate::models::{EntityField, EntityGroup, EntitySet, ExtractionSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    Spanish,
    English,
}

impl Locale {
    pub fn parse(s: &str) -> Option<Locale> {
        match s.trim().to_lowercase().as_str() {
            "es" | "es-es" | "spanish" => Some(Locale::Spanish),
            "en" | "en-us" | "en-gb" | "english" => Some(Locale::English),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Locale::Spanish => "es",
            Locale::English => "en",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Capture {
    Whole,
    Group(usize),
}

#[derive(Debug)]
struct PatternRule {
    field: EntityField,
    regex: Regex,
    capture: Capture,
}

#[derive(Debug)]
pub struct PatternTable {
    name: &'static str,
    rules: Vec<PatternRule>,
}

impl PatternTable {
    fn build(name: &'static str, specs: &[(EntityField, &str, Capture)]) -> Result<Self, regex::Error> {
        let rules = specs
            .iter()
            .map(|(field, pattern, capture)| {
                Ok(PatternRule {
                    field: *field,
                    regex: Regex::new(pattern)?,
                    capture: *capture,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { name, rules })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

const NAME_WORDS: &str = r"\p{Lu}\p{Ll}+(?:\s+\p{Lu}\p{Ll}+)*";
const PROPER_TOKENS: &str = r"\p{Lu}[\p{L}\d]*(?:\s+\p{Lu}[\p{L}\d]*)*";

fn common_table() -> Result<PatternTable, regex::Error> {
    use Capture::*;
    use EntityField::*;
    PatternTable::build(
        "common",
        &[
            (ContactNames, r"\b\p{Lu}\p{Ll}+(?:\s+\p{Lu}\p{Ll}+)+\b", Whole),
            (ContactEmails, r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b", Whole),
            (
                ContactPhones,
                r"(?:\+\d{1,3}[-.\s]?)?\(?\b\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b",
                Whole,
            ),
            (ProjectNames, r"\b(Alpha|Beta|Gamma|Delta|Omega)\b", Group(1)),
            (
                DateTimes,
                r"(?i)\b(?:a\s+las\s+)?(\d{1,2}(?::\d{2})?(?:\s*(?:am|pm))?)\b",
                Group(1),
            ),
            (
                LocationCities,
                r"(?i)\b(?:Madrid|Barcelona|Valencia|Sevilla|Bilbao|New\s+York|Los\s+Angeles|Chicago|Miami|Mexico\s+City|Guadalajara|Monterrey|Buenos\s+Aires)\b",
                Whole,
            ),
            (
                LocationCountries,
                r"(?i)\b(?:España|Spain|México|Mexico|Estados\s+Unidos|United\s+States|USA|Argentina|Colombia|Chile|Perú|Peru)\b",
                Whole,
            ),
            (LocationVirtual, r"(?i)\b(?:zoom|teams|meet|skype|online|virtual)\b", Whole),
        ],
    )
}

fn spanish_table() -> Result<PatternTable, regex::Error> {
    use Capture::*;
    use EntityField::*;
    let company = format!(r"\b(?i:empresa|compañía|sa|srl)\s+({})", NAME_WORDS);
    let project = format!(r"\b(?i:proyecto)\s+({})", PROPER_TOKENS);
    PatternTable::build(
        "es",
        &[
            (ContactCompanies, company.as_str(), Group(1)),
            (
                TaskActions,
                r"(?i)\b(?:crear|hacer|completar|terminar|agendar|programar|llamar|enviar|recordar)\b",
                Whole,
            ),
            (TaskWords, r"(?i)\b(?:tarea|proyecto|reunión|cita|fecha\s+límite)\b", Whole),
            (TaskUrgency, r"(?i)\b(?:urgente|importante|prioridad|crítico)\b", Whole),
            (TaskDeadlines, r"(?i)\b(?:para|antes\s+del)\s+[^.!?]+", Whole),
            (ProjectNames, project.as_str(), Group(1)),
            (
                DateDays,
                r"(?i)\b(?:el\s+)?(lunes|martes|miércoles|jueves|viernes|sábado|domingo)\b",
                Group(1),
            ),
            (
                DateRelative,
                r"(?i)\b(?:pasado\s+mañana|mañana|hoy|ayer|la\s+próxima\s+semana|el\s+próximo\s+mes)\b",
                Whole,
            ),
            (
                DateSpecific,
                r"(?i)\b\d{1,2}\s+de\s+(?:enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|octubre|noviembre|diciembre)\b",
                Whole,
            ),
            (LocationOffices, r"\b(?i:oficina|sede|edificio)\s+[\p{Lu}\d][\p{L}\d]*", Whole),
            (LocationVirtual, r"(?i)\ben\s+línea\b", Whole),
            (
                KeywordBusiness,
                r"(?i)\b(?:reunión|propuesta|contrato|presupuesto|fecha\s+límite|ingresos|cliente|proveedor)\b",
                Whole,
            ),
            (
                KeywordActions,
                r"(?i)\b(?:revisar|aprobar|rechazar|programar|cancelar|posponer|confirmar)\b",
                Whole,
            ),
            (
                KeywordPriorities,
                r"(?i)\b(?:urgente|importante|crítico|opcional)\b",
                Whole,
            ),
            (
                KeywordTechnology,
                r"(?i)\b(?:base\s+de\s+datos|servidor|nube|móvil|aplicación)\b",
                Whole,
            ),
        ],
    )
}

fn english_table() -> Result<PatternTable, regex::Error> {
    use Capture::*;
    use EntityField::*;
    let company = format!(r"\b(?i:company|corp|inc|ltd|llc)\s+({})", NAME_WORDS);
    let project = format!(r"\b(?i:project)\s+({})", PROPER_TOKENS);
    PatternTable::build(
        "en",
        &[
            (ContactCompanies, company.as_str(), Group(1)),
            (
                TaskActions,
                r"(?i)\b(?:create|make|complete|schedule|call|send|remind|follow\s+up)\b",
                Whole,
            ),
            (TaskWords, r"(?i)\b(?:task|project|meeting|appointment|deadline)\b", Whole),
            (TaskUrgency, r"(?i)\b(?:asap|immediately|priority|critical|urgent)\b", Whole),
            (TaskDeadlines, r"(?i)\b(?:by|before|for)\s+[^.!?]+", Whole),
            (ProjectNames, project.as_str(), Group(1)),
            (
                DateDays,
                r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
                Group(1),
            ),
            (
                DateRelative,
                r"(?i)\b(?:tomorrow|today|yesterday|next\s+week|next\s+month)\b",
                Whole,
            ),
            (
                DateSpecific,
                r"(?i)\b(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}\b",
                Whole,
            ),
            (
                LocationOffices,
                r"\b(?i:office|headquarters|building)\s+[\p{Lu}\d][\p{L}\d]*",
                Whole,
            ),
            (
                KeywordBusiness,
                r"(?i)\b(?:meeting|proposal|contract|budget|deadline|revenue|client|vendor)\b",
                Whole,
            ),
            (
                KeywordActions,
                r"(?i)\b(?:review|approve|reject|schedule|cancel|postpone|confirm)\b",
                Whole,
            ),
            (
                KeywordPriorities,
                r"(?i)\b(?:urgent|important|critical|optional|nice\s+to\s+have)\b",
                Whole,
            ),
            (
                KeywordTechnology,
                r"(?i)\b(?:software|hardware|API|database|server|cloud|mobile|web|website|app|application)\b",
                Whole,
            ),
        ],
    )
}

fn locale_table(locale: Locale) -> Result<PatternTable, regex::Error> {
    match locale {
        Locale::Spanish => spanish_table(),
        Locale::English => english_table(),
    }
}

pub struct EntityExtractor {
    tables: Vec<PatternTable>,
    max_input_chars: usize,
    max_matches_per_group: usize,
}

impl EntityExtractor {
    pub fn new(settings: &ExtractionSettings) -> Result<Self, ConfigError> {
        let primary = Locale::parse(&settings.primary_locale)
            .ok_or_else(|| ConfigError::Locale(settings.primary_locale.clone()))?;
        let secondary = Locale::parse(&settings.secondary_locale)
            .ok_or_else(|| ConfigError::Locale(settings.secondary_locale.clone()))?;

        let mut tables = vec![common_table()?, locale_table(primary)?];
        if secondary != primary {
            tables.push(locale_table(secondary)?);
        }

        Ok(Self {
            tables,
            max_input_chars: settings.max_input_chars,
            max_matches_per_group: settings.max_matches_per_group,
        })
    }

    pub fn tables(&self) -> &[PatternTable] {
        &self.tables
    }

    /// Extract one group. The returned set has only `group` populated.
    pub fn try_extract_group(&self, text: &str, group: EntityGroup) -> Result<EntitySet, ExtractError> {
        let len = text.chars().count();
        if len > self.max_input_chars {
            return Err(ExtractError::InputTooLarge { len, limit: self.max_input_chars });
        }

        let mut set = EntitySet::default();
        let mut matched = 0usize;
        for table in &self.tables {
            for rule in table.rules.iter().filter(|r| r.field.group() == group) {
                for caps in rule.regex.captures_iter(text) {
                    let hit = match rule.capture {
                        Capture::Whole => caps.get(0),
                        Capture::Group(i) => caps.get(i),
                    };
                    let Some(hit) = hit else { continue };
                    let value = hit.as_str().trim();
                    if value.is_empty() {
                        continue;
                    }
                    matched += 1;
                    if matched > self.max_matches_per_group {
                        return Err(ExtractError::TooManyMatches {
                            group,
                            limit: self.max_matches_per_group,
                        });
                    }
                    let list = set.field_mut(rule.field);
                    if !list.iter().any(|existing| existing == value) {
                        list.push(value.to_string());
                    }
                }
            }
        }
        Ok(set)
    }

    /// Extract every group, substituting an empty group for each fault.
    pub fn extract_with_faults(&self, text: &str) -> (EntitySet, Vec<ExtractError>) {
        let mut entities = EntitySet::default();
        let mut faults = Vec::new();
        for group in EntityGroup::ALL {
            match self.try_extract_group(text, group) {
                Ok(partial) => entities.merge_group(group, partial),
                Err(e) => faults.push(e),
            }
        }
        (entities, faults)
    }

    pub fn extract(&self, text: &str) -> EntitySet {
        self.extract_with_faults(text).0
    }
}
