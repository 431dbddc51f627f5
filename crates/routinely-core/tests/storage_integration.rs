//! Integration tests for persistence.
//!
//! Exercises the database file, the key-value store holding a running
//! session, session history, and export/import between two databases.

use chrono::Utc;
use routinely_core::companion::templates_for_companion;
use routinely_core::{
    ConditionalHabitInfo, ConditionalOption, ContextSettings, Database, Event, ExportBundle, Habit,
    HabitType, KeyValueStore, RoutineTemplate, SessionController,
};

const SESSION_KEY: &str = "session.active";

fn morning() -> (RoutineTemplate, String) {
    let rain = ConditionalOption::new("Rain", vec![Habit::task("Umbrella")]);
    let rain_id = rain.id.clone();
    let info =
        ConditionalHabitInfo::new("Weather?", vec![rain, ConditionalOption::new("Sun", vec![])])
            .unwrap();
    let template = RoutineTemplate::new(
        "Morning",
        vec![
            Habit::task("Water"),
            Habit::new("Check weather", HabitType::Conditional(info)),
            Habit::new(
                "Headlines",
                HabitType::Website {
                    url: "https://news.example.com".into(),
                    title: Some("News".into()),
                    duration_secs: 300,
                },
            ),
        ],
    );
    (template, rain_id)
}

#[test]
fn test_session_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routinely.db");
    let (template, rain) = morning();

    {
        let db = Database::open_at(&path).unwrap();
        db.save_template(&template).unwrap();

        let mut controller: SessionController = db.load(SESSION_KEY).unwrap().unwrap_or_default();
        controller.start(db.get_template(&template.id).unwrap().unwrap()).unwrap();
        controller.complete(Some(20), None).unwrap();
        for event in controller.choose(&rain).unwrap() {
            if let Event::BranchChosen { response, .. } = event {
                db.record_response(&response).unwrap();
            }
        }
        db.save(SESSION_KEY, &controller).unwrap();
    }

    let db = Database::open_at(&path).unwrap();
    let mut controller: SessionController = db.load(SESSION_KEY).unwrap().unwrap();
    assert_eq!(
        controller.session().unwrap().current_habit().unwrap().name,
        "Umbrella"
    );

    controller.complete(None, None).unwrap();
    controller.complete(None, None).unwrap();
    let finished = controller.take_finished().unwrap();
    db.record_session(&finished.summary()).unwrap();
    db.mark_template_used(&template.id, Utc::now()).unwrap();
    db.delete(SESSION_KEY).unwrap();

    assert!(!db.exists(SESSION_KEY).unwrap());
    let history = db.list_sessions(10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].habit_count, 4);
    assert_eq!(db.response_counts(&template.habits[1].id).unwrap()[0].option_text, "Rain");
    assert!(db.get_template(&template.id).unwrap().unwrap().last_used_at.is_some());
}

#[test]
fn test_export_then_import_into_fresh_database() {
    let dir = tempfile::tempdir().unwrap();
    let source = Database::open_at(dir.path().join("a.db")).unwrap();
    let (template, _) = morning();
    source.save_template(&template).unwrap();

    let bundle = ExportBundle::from_database(&source, ContextSettings::default()).unwrap();
    let file = dir.path().join("backup.json");
    std::fs::write(&file, bundle.to_json().unwrap()).unwrap();

    let text = std::fs::read_to_string(&file).unwrap();
    let restored = ExportBundle::from_json(&text).unwrap();
    let target = Database::open_at(dir.path().join("b.db")).unwrap();
    let summary = restored.import_into(&target).unwrap();

    assert_eq!(summary.templates, 1);
    assert_eq!(target.list_templates().unwrap(), source.list_templates().unwrap());
}

#[test]
fn test_companion_mirror_of_stored_templates() {
    let db = Database::open_memory().unwrap();
    let (template, _) = morning();
    db.save_template(&template).unwrap();

    let mirrored = templates_for_companion(&db.list_templates().unwrap(), false);
    assert_eq!(mirrored.len(), 1);
    let names: Vec<&str> = mirrored[0].habits.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["Water", "Check weather"]);
}
