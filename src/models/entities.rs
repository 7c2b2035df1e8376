use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEntities {
    pub names: Vec<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub companies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntities {
    pub actions: Vec<String>,
    pub task_words: Vec<String>,
    pub urgency_indicators: Vec<String>,
    pub deadlines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntities {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateEntities {
    pub days: Vec<String>,
    pub relative: Vec<String>,
    pub times: Vec<String>,
    pub specific_dates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntities {
    pub offices: Vec<String>,
    pub cities: Vec<String>,
    pub countries: Vec<String>,
    #[serde(rename = "virtual")]
    pub virtual_venues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntities {
    pub business: Vec<String>,
    pub actions: Vec<String>,
    pub priorities: Vec<String>,
    pub technology: Vec<String>,
}

/// Everything the extractor pulled out of one message.
///
/// Every group is always present; an empty group means "nothing matched".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    pub contacts: ContactEntities,
    pub tasks: TaskEntities,
    pub projects: ProjectEntities,
    pub dates: DateEntities,
    pub locations: LocationEntities,
    pub keywords: KeywordEntities,
}

/// Identifies a single list inside an [`EntitySet`]. Pattern tables target
/// these rather than holding closures over the struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityField {
    ContactNames,
    ContactEmails,
    ContactPhones,
    ContactCompanies,
    TaskActions,
    TaskWords,
    TaskUrgency,
    TaskDeadlines,
    ProjectNames,
    DateDays,
    DateRelative,
    DateTimes,
    DateSpecific,
    LocationOffices,
    LocationCities,
    LocationCountries,
    LocationVirtual,
    KeywordBusiness,
    KeywordActions,
    KeywordPriorities,
    KeywordTechnology,
}

/// The six top-level groups. Extraction faults are scoped to one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityGroup {
    Contacts,
    Tasks,
    Projects,
    Dates,
    Locations,
    Keywords,
}

impl EntityGroup {
    pub const ALL: [EntityGroup; 6] = [
        EntityGroup::Contacts,
        EntityGroup::Tasks,
        EntityGroup::Projects,
        EntityGroup::Dates,
        EntityGroup::Locations,
        EntityGroup::Keywords,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityGroup::Contacts => "contacts",
            EntityGroup::Tasks => "tasks",
            EntityGroup::Projects => "projects",
            EntityGroup::Dates => "dates",
            EntityGroup::Locations => "locations",
            EntityGroup::Keywords => "keywords",
        }
    }
}

impl std::fmt::Display for EntityGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EntityField {
    pub fn group(&self) -> EntityGroup {
        use EntityField::*;
        match self {
            ContactNames | ContactEmails | ContactPhones | ContactCompanies => EntityGroup::Contacts,
            TaskActions | TaskWords | TaskUrgency | TaskDeadlines => EntityGroup::Tasks,
            ProjectNames => EntityGroup::Projects,
            DateDays | DateRelative | DateTimes | DateSpecific => EntityGroup::Dates,
            LocationOffices | LocationCities | LocationCountries | LocationVirtual => {
                EntityGroup::Locations
            }
            KeywordBusiness | KeywordActions | KeywordPriorities | KeywordTechnology => {
                EntityGroup::Keywords
            }
        }
    }
}

impl EntitySet {
    pub fn field_mut(&mut self, field: EntityField) -> &mut Vec<String> {
        use EntityField::*;
        match field {
            ContactNames => &mut self.contacts.names,
            ContactEmails => &mut self.contacts.emails,
            ContactPhones => &mut self.contacts.phones,
            ContactCompanies => &mut self.contacts.companies,
            TaskActions => &mut self.tasks.actions,
            TaskWords => &mut self.tasks.task_words,
            TaskUrgency => &mut self.tasks.urgency_indicators,
            TaskDeadlines => &mut self.tasks.deadlines,
            ProjectNames => &mut self.projects.names,
            DateDays => &mut self.dates.days,
            DateRelative => &mut self.dates.relative,
            DateTimes => &mut self.dates.times,
            DateSpecific => &mut self.dates.specific_dates,
            LocationOffices => &mut self.locations.offices,
            LocationCities => &mut self.locations.cities,
            LocationCountries => &mut self.locations.countries,
            LocationVirtual => &mut self.locations.virtual_venues,
            KeywordBusiness => &mut self.keywords.business,
            KeywordActions => &mut self.keywords.actions,
            KeywordPriorities => &mut self.keywords.priorities,
            KeywordTechnology => &mut self.keywords.technology,
        }
    }

    /// Copy one group from `other` into `self`, leaving the rest untouched.
    pub fn merge_group(&mut self, group: EntityGroup, other: EntitySet) {
        match group {
            EntityGroup::Contacts => self.contacts = other.contacts,
            EntityGroup::Tasks => self.tasks = other.tasks,
            EntityGroup::Projects => self.projects = other.projects,
            EntityGroup::Dates => self.dates = other.dates,
            EntityGroup::Locations => self.locations = other.locations,
            EntityGroup::Keywords => self.keywords = other.keywords,
        }
    }

    pub fn group_len(&self, group: EntityGroup) -> usize {
        match group {
            EntityGroup::Contacts => {
                let c = &self.contacts;
                c.names.len() + c.emails.len() + c.phones.len() + c.companies.len()
            }
            EntityGroup::Tasks => {
                let t = &self.tasks;
                t.actions.len() + t.task_words.len() + t.urgency_indicators.len() + t.deadlines.len()
            }
            EntityGroup::Projects => self.projects.names.len(),
            EntityGroup::Dates => {
                let d = &self.dates;
                d.days.len() + d.relative.len() + d.times.len() + d.specific_dates.len()
            }
            EntityGroup::Locations => {
                let l = &self.locations;
                l.offices.len() + l.cities.len() + l.countries.len() + l.virtual_venues.len()
            }
            EntityGroup::Keywords => self.keywords().count(),
        }
    }

    /// Sum of every list across every group.
    pub fn total_count(&self) -> usize {
        EntityGroup::ALL.iter().map(|g| self.group_len(*g)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// All keyword matches flattened in group order.
    pub fn keywords(&self) -> impl Iterator<Item = &String> {
        let k = &self.keywords;
        k.business
            .iter()
            .chain(k.actions.iter())
            .chain(k.priorities.iter())
            .chain(k.technology.iter())
    }

    pub fn has_keywords(&self) -> bool {
        self.keywords().next().is_some()
    }

    pub fn has_contacts(&self) -> bool {
        self.group_len(EntityGroup::Contacts) > 0
    }

    pub fn has_tasks(&self) -> bool {
        self.group_len(EntityGroup::Tasks) > 0
    }
}
