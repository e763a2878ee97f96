use std::{
    ops::ControlFlow,
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use approx::assert_relative_eq;
use gridlearn::{
    algo::QTableAgentConfig,
    config::TrainingConfig,
    grid::{CellKind, LayoutConfig},
    scheduler::{FastForwardOutcome, Scheduler, Status, TickEvent},
    yield_point::{FastForwardProgress, NoYield},
};

fn seeded(seed: u64) -> Scheduler {
    Scheduler::new(TrainingConfig {
        agent: QTableAgentConfig {
            seed: Some(seed),
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn learns_a_safe_route_on_the_default_grid() {
    let mut scheduler = seeded(7);
    let report = scheduler.run_fast_forward(500, &mut NoYield);
    assert_eq!(report.outcome, FastForwardOutcome::Completed);

    let layout = LayoutConfig::default();
    let path = scheduler.greedy_path(50);
    assert_eq!(path.first(), Some(&layout.start));
    assert_eq!(path.last(), layout.goal.as_ref(), "greedy route reaches the goal");
    assert!(
        layout.hazard.map_or(true, |h| !path.contains(&h)),
        "greedy route avoids the hazard: {path:?}"
    );

    // Eight steps at -0.1 each, the last one adding the goal bonus
    let snapshot = scheduler.snapshot();
    let best = snapshot.best_score.unwrap();
    assert_relative_eq!(best, 9.2, epsilon = 1e-4);
    assert_eq!(snapshot.best_trajectory.len(), 9);
}

#[test]
fn fast_forward_of_500_episodes() {
    let mut scheduler = seeded(1);
    scheduler.run_fast_forward(40, &mut NoYield);
    let before = scheduler.session().episodes_completed();

    let report = scheduler.run_fast_forward(500, &mut NoYield);
    assert_eq!(report.episodes, 500);
    assert_eq!(scheduler.status(), Status::Paused);
    assert_eq!(scheduler.session().episodes_completed(), before + 500);
    assert_eq!(scheduler.session().agent().epsilon(), 0.05);

    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.history.len(), 200);
    assert_eq!(snapshot.history.last().map(|r| r.episode), Some(540));
    assert_eq!(snapshot.position, (0, 0), "paused at an episode boundary");
}

#[test]
fn reset_from_another_thread_stops_the_batch() {
    let mut scheduler = seeded(2);
    let handle = scheduler.handle();
    let (started_tx, started_rx) = mpsc::channel();

    let resetter = thread::spawn(move || {
        started_rx.recv().unwrap();
        handle.request_reset();
    });

    let mut notified = false;
    let report = scheduler.run_fast_forward(1_000_000, &mut |_: &FastForwardProgress| {
        if !notified {
            started_tx.send(()).unwrap();
            notified = true;
        }
        ControlFlow::Continue(())
    });
    resetter.join().unwrap();

    assert_eq!(report.outcome, FastForwardOutcome::Reset);
    assert!(report.episodes < 1_000_000);
    assert_eq!(scheduler.status(), Status::Idle);
    assert_eq!(scheduler.session().episodes_completed(), 0);
    assert_eq!(scheduler.session().agent().epsilon(), 0.3);
    assert!(scheduler.session().agent().table().is_zeroed());
    assert!(scheduler.snapshot().history.is_empty());
}

#[test]
fn timed_training_with_items() {
    let mut scheduler = seeded(3);
    scheduler.edit_cell((0, 2), CellKind::Item).unwrap();
    scheduler.set_item_reward(2.0);
    assert_eq!(scheduler.session().agent().table().states(), 50);

    let mut now = Instant::now();
    scheduler.start(now);
    let mut episodes = 0;
    while episodes < 3 {
        now = scheduler.next_deadline().unwrap().max(now);
        match scheduler.tick(now) {
            Some(TickEvent::Step(report)) if report.finished.is_some() => episodes += 1,
            Some(_) => {}
            None => panic!("tick at the deadline must fire"),
        }
        now += Duration::from_millis(1);
    }

    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.status, Status::Running);
    assert_eq!(snapshot.history.len(), 3);
    assert_eq!(snapshot.episode, 3);
}

#[test]
fn resize_during_training() {
    let mut scheduler = seeded(4);
    scheduler.run_fast_forward(20, &mut NoYield);
    assert!(scheduler.resize(3, 6));

    let snapshot = scheduler.snapshot();
    assert_eq!((snapshot.layout.rows(), snapshot.layout.cols()), (3, 6));
    assert!(snapshot.best_score.is_none());
    assert_eq!(scheduler.session().agent().table().states(), 18);

    let report = scheduler.run_fast_forward(20, &mut NoYield);
    assert_eq!(report.episodes, 20);
    assert_eq!(scheduler.session().episodes_completed(), 40);
}
