use std::ops::ControlFlow;

use gridlearn::{
    config::TrainingConfig,
    grid::LayoutConfig,
    scheduler::{FastForwardOutcome, Scheduler, SchedulerConfig},
    viz,
    yield_point::FastForwardProgress,
};

const BATCH: u32 = 500;
const NUM_BATCHES: u32 = 20;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut scheduler = Scheduler::new(TrainingConfig {
        layout: LayoutConfig {
            rows: 7,
            cols: 7,
            goal: Some((6, 6)),
            hazard: Some((3, 3)),
            items: vec![(0, 6), (6, 0), (2, 4)],
            ..Default::default()
        },
        scheduler: SchedulerConfig {
            yield_every: 5,
            ..Default::default()
        },
        ..Default::default()
    })?;

    let (handle, tx) = viz::init(scheduler.handle());
    let _ = tx.send(viz::Update::Snapshot(Box::new(scheduler.snapshot())));

    for _ in 0..NUM_BATCHES {
        let report = scheduler.run_fast_forward(BATCH, &mut |p: &FastForwardProgress| {
            match tx.send(viz::Update::Progress(*p)) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            }
        });
        let snapshot = viz::Update::Snapshot(Box::new(scheduler.snapshot()));
        if tx.send(viz::Update::Finished(report)).is_err() || tx.send(snapshot).is_err() {
            break;
        }
        if report.outcome == FastForwardOutcome::Cancelled {
            break;
        }
    }

    drop(tx);
    viz::join(handle)?;
    Ok(())
}
