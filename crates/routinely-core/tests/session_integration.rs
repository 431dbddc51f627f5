//! Integration tests for running routine sessions.
//!
//! Drives sessions through branching, ad-hoc edits and undo, checking the
//! records and the effective habit list along the way.

use proptest::prelude::*;
use routinely_core::session::apply_modifications;
use routinely_core::{
    ConditionalHabitInfo, ConditionalOption, Event, Habit, HabitType, RoutineSession,
    RoutineTemplate, SessionController,
};

fn names(habits: &[Habit]) -> Vec<String> {
    habits.iter().map(|h| h.name.clone()).collect()
}

fn branching_template() -> (RoutineTemplate, String) {
    let x = ConditionalOption::new("X", vec![Habit::task("C"), Habit::task("D")]);
    let x_id = x.id.clone();
    let y = ConditionalOption::new("Y", vec![Habit::task("F")]);
    let info = ConditionalHabitInfo::new("Which way?", vec![x, y]).unwrap();
    let template = RoutineTemplate::new(
        "Branching",
        vec![
            Habit::task("A"),
            Habit::new("B", HabitType::Conditional(info)),
            Habit::task("E"),
        ],
    );
    (template, x_id)
}

#[test]
fn test_choosing_branch_inserts_path_and_records_question() {
    let (template, x) = branching_template();
    let mut session = RoutineSession::new(template);
    session.complete_current_habit(None, None);

    let b = session.current_habit().unwrap();
    let response = session.complete_conditional_habit(&x).unwrap();

    assert_eq!(names(&session.effective_habits()), vec!["A", "B", "C", "D", "E"]);
    assert!(session.completion_for(&b.id).is_some());
    assert_eq!(session.current_habit().unwrap().name, "C");
    assert_eq!(response.question, "Which way?");
    assert_eq!(response.session_id.as_deref(), Some(session.id.as_str()));
}

#[test]
fn test_full_session_workflow_through_controller() {
    let (template, x) = branching_template();
    let mut controller = SessionController::new();

    let started = controller.start(template).unwrap();
    assert!(matches!(started, Event::SessionStarted { habit_count: 3, .. }));

    controller.complete(Some(60), None).unwrap();
    let events = controller.choose(&x).unwrap();
    assert!(matches!(events[0], Event::BranchChosen { injected_count: 2, .. }));

    // drop D for today, add a habit at the end
    let d_id = controller.session().unwrap().effective_habits()[3].id.clone();
    controller.remove_habit(&d_id).unwrap();
    controller.add_habit(Habit::task("G"), None).unwrap();
    assert_eq!(
        names(&controller.session().unwrap().effective_habits()),
        vec!["A", "B", "C", "E", "G"]
    );

    controller.skip(Some("no time".into())).unwrap();
    controller.complete(Some(30), None).unwrap();
    let events = controller.complete(None, None).unwrap();
    assert_eq!(events.last().unwrap().name(), "SessionCompleted");

    let finished = controller.take_finished().unwrap();
    let summary = finished.summary();
    assert_eq!(summary.habit_count, 5);
    assert_eq!(summary.skipped_count, 1);
    assert_eq!(summary.completed_count, 4);
    assert_eq!(summary.total_duration_secs, 90);
    assert_eq!(finished.template().habits.len(), 3);
}

#[test]
fn test_snapshot_reflects_cursor() {
    let (template, _) = branching_template();
    let mut session = RoutineSession::new(template);
    session.complete_current_habit(None, None);
    match session.snapshot() {
        Event::StateSnapshot {
            current_index,
            current_habit_name,
            habit_count,
            completed,
            ..
        } => {
            assert_eq!(current_index, 1);
            assert_eq!(current_habit_name.as_deref(), Some("B"));
            assert_eq!(habit_count, 3);
            assert!(!completed);
        }
        other => panic!("unexpected {other:?}"),
    }
}

/// One user action against a running session.
#[derive(Debug, Clone)]
enum Action {
    Complete,
    Skip,
    Back,
    Goto(usize),
    Add(Option<usize>),
    RemoveAt(usize),
    Reorder(usize, usize),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => Just(Action::Complete),
        2 => Just(Action::Skip),
        2 => Just(Action::Back),
        1 => (0usize..8).prop_map(Action::Goto),
        1 => prop::option::of(0usize..8).prop_map(Action::Add),
        1 => (0usize..8).prop_map(Action::RemoveAt),
        1 => (0usize..8, 0usize..8).prop_map(|(a, b)| Action::Reorder(a, b)),
    ]
}

fn run(session: &mut RoutineSession, action: &Action) {
    match action {
        Action::Complete => session.complete_current_habit(Some(1), None),
        Action::Skip => session.skip_current_habit(None),
        Action::Back => session.go_to_previous_habit(),
        Action::Goto(i) => session.go_to_habit(*i),
        Action::Add(i) => session.add_habit(Habit::task("extra"), *i),
        Action::RemoveAt(i) => {
            if let Some(h) = session.effective_habits().get(*i) {
                session.remove_habit(&h.id.clone());
            }
        }
        Action::Reorder(a, b) => session.reorder_habits(*a, *b),
    }
}

fn tasks(n: usize) -> RoutineTemplate {
    RoutineTemplate::new("P", (0..n).map(|i| Habit::task(format!("h{i}"))).collect())
}

proptest! {
    #[test]
    fn prop_cursor_stays_in_bounds(
        n in 1usize..6,
        actions in prop::collection::vec(action_strategy(), 0..30),
    ) {
        let mut session = RoutineSession::new(tasks(n));
        for action in &actions {
            run(&mut session, action);
            prop_assert!(session.current_index() <= session.effective_habits().len());
        }
    }

    #[test]
    fn prop_exhausting_session_records_every_habit(
        n in 1usize..8,
        skips in prop::collection::vec(any::<bool>(), 8),
    ) {
        let mut session = RoutineSession::new(tasks(n));
        let mut i = 0;
        while !session.is_completed() {
            if skips[i % skips.len()] {
                session.skip_current_habit(None);
            } else {
                session.complete_current_habit(None, None);
            }
            i += 1;
        }
        prop_assert!(session.completed_at().is_some());
        prop_assert_eq!(session.completions().len(), session.effective_habits().len());
    }

    #[test]
    fn prop_undo_then_redo_keeps_record_shape(n in 2usize..8, done in 1usize..8) {
        let done = done.min(n - 1);
        let mut session = RoutineSession::new(tasks(n));
        for _ in 0..done {
            session.complete_current_habit(None, None);
        }
        let shape = |s: &RoutineSession| -> Vec<(String, bool)> {
            s.completions().iter().map(|c| (c.habit_id.clone(), c.is_skipped)).collect()
        };
        let before = shape(&session);
        let cursor = session.current_index();

        session.go_to_previous_habit();
        session.complete_current_habit(None, None);

        prop_assert_eq!(shape(&session), before);
        prop_assert_eq!(session.current_index(), cursor);
    }

    #[test]
    fn prop_replay_is_deterministic(
        n in 1usize..6,
        actions in prop::collection::vec(action_strategy(), 0..30),
    ) {
        let mut session = RoutineSession::new(tasks(n));
        for action in &actions {
            run(&mut session, action);
        }
        let base = session.template().active_habits();
        let first = apply_modifications(&base, session.modifications());
        let second = apply_modifications(&base, session.modifications());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, session.effective_habits());
    }

    #[test]
    fn prop_session_survives_json(
        n in 1usize..6,
        actions in prop::collection::vec(action_strategy(), 0..20),
    ) {
        let mut session = RoutineSession::new(tasks(n));
        for action in &actions {
            run(&mut session, action);
        }
        let json = serde_json::to_string(&session).unwrap();
        let back: RoutineSession = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.effective_habits(), session.effective_habits());
        prop_assert_eq!(back.current_index(), session.current_index());
    }
}
