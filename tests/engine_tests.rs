use std::sync::Arc;

use contextflow::models::{
    ActionKind, Contact, Conversation, EntityGroup, Importance, Intent, Note, Priority, Project,
    ProjectStatus, Role, Settings, Task, TaskStatus, Urgency,
};
use contextflow::store::memory::MemoryStore;
use contextflow::store::{StoreSource, Stores};
use contextflow::utils::clock::ManualClock;
use contextflow::ContextEngine;

// 2024-01-15 10:00:00 UTC, a Monday
const NOW: i64 = 1_705_312_800;

fn engine() -> (ContextEngine, Arc<MemoryStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_timestamp(NOW));
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let engine = ContextEngine::with_clock(
        &Settings::default(),
        Stores::from_shared(store.clone()),
        clock.clone(),
    )
    .expect("default settings are valid");
    (engine, store, clock)
}

fn contact(i: usize, name: &str) -> Contact {
    Contact {
        id: format!("c{}", i),
        user_id: "u1".into(),
        name: name.into(),
        email: None,
        phone: None,
        company: None,
        relationship: "professional".into(),
        importance: Importance::High,
        last_contact: Some(NOW - 3600),
        preferred_contact: "email".into(),
        source: "manual".into(),
        created_at: 0,
    }
}

fn task(i: usize) -> Task {
    Task {
        id: format!("t{}", i),
        user_id: "u1".into(),
        title: format!("Task {}", i),
        description: String::new(),
        status: TaskStatus::Pending,
        priority: Priority::Medium,
        category: None,
        project_id: None,
        due_date: Some(NOW - 3600),
        progress: 0,
        related_contacts: vec![],
        last_activity: NOW - i as i64,
        created_at: NOW - 86_400,
        completed_at: None,
        archived: false,
        source: "manual".into(),
        original_text: None,
    }
}

fn project(i: usize) -> Project {
    Project {
        id: format!("p{}", i),
        user_id: "u1".into(),
        name: format!("Project {}", i),
        description: String::new(),
        status: ProjectStatus::InProgress,
        priority: Priority::Medium,
        progress: 50,
        start_date: 0,
        target_date: None,
        risk_level: Importance::Low,
        stakeholders: vec![],
        created_at: 0,
        archived: false,
        source: "manual".into(),
    }
}

fn note(i: usize, title: &str) -> Note {
    Note {
        id: format!("n{}", i),
        user_id: "u1".into(),
        title: title.into(),
        content: "x".repeat(500),
        note_type: "general".into(),
        tags: vec![],
        key_topics: vec![],
        pinned: false,
        last_modified: NOW - i as i64,
        archived: false,
    }
}

fn conversation(i: usize, message: &str) -> Conversation {
    Conversation {
        id: format!("m{}", i),
        user_id: "u1".into(),
        role: Role::User,
        message: message.into(),
        intent: None,
        urgency: None,
        timestamp: NOW - 60 * i as i64,
    }
}

fn seed_everything(store: &MemoryStore, n: usize) {
    for i in 0..n {
        store.insert_contact(contact(i, &format!("Person {}", i)));
        store.insert_task(task(i));
        store.insert_project(project(i));
        store.insert_note(note(i, &format!("Presupuesto {}", i)));
        store.insert_conversation(conversation(i, &"palabra ".repeat(40)));
    }
}

#[test]
fn test_carlos_scheduling_scenario() {
    let (engine, _, _) = engine();
    let analysis = engine
        .analyzer()
        .analyze("Necesito agendar una cita con Carlos Perez el martes a las 3 PM");

    assert!(matches!(analysis.intent, Intent::Scheduling | Intent::TaskCreation));
    assert!(analysis.entities.contacts.names.contains(&"Carlos Perez".to_string()));
    assert!(analysis
        .entities
        .dates
        .days
        .iter()
        .any(|d| d.eq_ignore_ascii_case("martes")));
    assert!(analysis.entities.dates.times.iter().any(|t| t.starts_with('3')));
    assert!(analysis.action_required);
}

#[test]
fn test_empty_text_scenario() {
    let (engine, _, _) = engine();
    let analysis = engine.analyzer().analyze("");
    assert_eq!(analysis.intent, Intent::Information);
    assert_eq!(analysis.urgency, Urgency::Medium);
    assert!(!analysis.action_required);
    for group in EntityGroup::ALL {
        assert_eq!(analysis.entities.group_len(group), 0, "group {} not empty", group);
    }
}

#[test]
fn test_every_group_serialized_for_arbitrary_text() {
    let (engine, _, _) = engine();
    for text in ["", "   ", "🙂🙂🙂", "call ana@acme.com +34 600 123 456", "Proyecto Apollo mañana"] {
        let json = serde_json::to_value(engine.analyzer().analyze(text)).expect("serializable");
        for group in EntityGroup::ALL {
            assert!(json["entities"][group.as_str()].is_object(), "{} missing for {:?}", group, text);
        }
    }
}

#[tokio::test]
async fn test_cached_snapshot_is_same_instance() {
    let (engine, store, _) = engine();
    seed_everything(&store, 3);
    let analysis = engine.analyzer().analyze("Revisar el presupuesto");

    let first = engine.loader().load("u1", &analysis).await;
    let second = engine.loader().load("u1", &analysis).await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.query_count(StoreSource::Contacts), 1);
    assert_eq!(store.query_count(StoreSource::Notes), 1);
}

#[tokio::test]
async fn test_expired_snapshot_requeries_stores() {
    let (engine, store, clock) = engine();
    seed_everything(&store, 3);
    let analysis = engine.analyzer().analyze("Revisar el presupuesto");

    let first = engine.loader().load("u1", &analysis).await;
    clock.advance(chrono::Duration::seconds(299));
    let cached = engine.loader().load("u1", &analysis).await;
    assert!(Arc::ptr_eq(&first, &cached));

    clock.advance(chrono::Duration::seconds(2));
    let fresh = engine.loader().load("u1", &analysis).await;
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert_eq!(store.query_count(StoreSource::Tasks), 2);
}

#[tokio::test]
async fn test_snapshot_and_compact_caps() {
    let (engine, store, _) = engine();
    seed_everything(&store, 30);

    let response = engine.handle("u1", "Revisar el presupuesto", None).await;
    let snapshot = engine
        .loader()
        .load("u1", &response.analysis)
        .await;
    assert_eq!(snapshot.contacts.len(), 10);
    assert_eq!(snapshot.tasks.len(), 15);
    assert_eq!(snapshot.projects.len(), 8);
    assert_eq!(snapshot.notes.len(), 5);
    assert_eq!(snapshot.recent_conversations.len(), 5);

    let compact = &response.compact_context;
    assert_eq!(compact.relevant_contacts.len(), 5);
    assert_eq!(compact.active_tasks.len(), 8);
    assert_eq!(compact.current_projects.len(), 5);
    assert_eq!(compact.key_notes.len(), 3);
    assert_eq!(compact.recent_context.len(), 3);
    assert!(compact.recent_context.iter().all(|c| c.message.chars().count() <= 100));
    assert!(compact.active_tasks.iter().all(|t| t.is_overdue));
}

#[tokio::test]
async fn test_relevance_always_within_bounds() {
    let (engine, store, _) = engine();
    let texts = [
        "",
        "hola",
        "Revisar el presupuesto con Carlos Perez",
        "Crear tarea urgente para el proyecto Apollo mañana",
    ];
    for text in texts {
        let score = engine.handle("u1", text, None).await.compact_context.relevance_score;
        assert!((0.1..=1.0).contains(&score), "{} out of range for {:?}", score, text);
    }

    seed_everything(&store, 5);
    store.insert_contact(contact(99, "Carlos Perez"));
    let score = engine
        .handle("u1", "Revisar el presupuesto con Carlos Perez", None)
        .await
        .compact_context
        .relevance_score;
    assert!((0.1..=1.0).contains(&score));
    assert!(score > 0.1);
}

#[tokio::test]
async fn test_ana_gomez_created_then_found() {
    let (engine, store, _) = engine();

    let first = engine.handle("u1", "Enviar la propuesta a Ana Gómez", None).await;
    let created = first
        .action_records
        .iter()
        .filter(|r| r.kind == ActionKind::ContactCreated)
        .count();
    assert_eq!(created, 1);

    let second = engine.handle("u1", "Enviar la propuesta a Ana Gómez", None).await;
    assert!(second
        .action_records
        .iter()
        .all(|r| r.kind != ActionKind::ContactCreated));
    assert_eq!(
        second
            .action_records
            .iter()
            .filter(|r| r.kind == ActionKind::ContactFound)
            .count(),
        1
    );
    assert_eq!(store.contacts_for("u1").len(), 1);
}

#[tokio::test]
async fn test_failing_projects_store_degrades_to_empty_list() {
    let (engine, store, _) = engine();
    store.insert_contact(contact(1, "Carlos Perez"));
    store.insert_task(task(1));
    store.insert_project(project(1));
    store.insert_note(note(1, "Presupuesto anual"));
    store.insert_conversation(conversation(1, "hablamos del presupuesto"));
    store.set_unavailable(StoreSource::Projects, true);

    let analysis = engine
        .analyzer()
        .analyze("Revisar el presupuesto con Carlos Perez");
    let snapshot = engine.loader().load("u1", &analysis).await;
    assert!(snapshot.projects.is_empty());
    assert!(!snapshot.contacts.is_empty());
    assert!(!snapshot.tasks.is_empty());
    assert!(!snapshot.notes.is_empty());
    assert!(!snapshot.recent_conversations.is_empty());

    // the whole pipeline also survives, with fallback profile and analytics
    let response = engine.handle("u1", "Revisar el presupuesto con Carlos Perez", None).await;
    assert!(response.compact_context.current_projects.is_empty());
    assert!(response.predictions.confidence_scores.overall <= 0.95);
}

#[tokio::test]
async fn test_predictions_are_bounded_and_ranked() {
    let (engine, store, _) = engine();
    seed_everything(&store, 12);
    let response = engine.handle("u1", "¿Cuándo es la reunión con el cliente?", None).await;
    let p = &response.predictions;
    assert!(p.immediate_needs.len() <= 5);
    assert!(p.upcoming_actions.len() <= 8);
    assert!(p.potential_blockers.len() <= 6);
    assert!(p.opportunity_windows.len() <= 5);
    assert!(p.collaboration_opportunities.len() <= 4);
    assert!(p.optimization_suggestions.len() <= 6);
    for list in [&p.immediate_needs, &p.upcoming_actions, &p.potential_blockers] {
        assert!(list.windows(2).all(|w| w[0].probability >= w[1].probability));
    }
    assert!(p.all().all(|x| (0.0..=1.0).contains(&x.probability)));
    assert!(p.confidence_scores.overall <= 0.95);
}
