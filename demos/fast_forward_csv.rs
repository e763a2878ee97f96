use std::{error::Error, fs, ops::ControlFlow, path::Path};

use gridlearn::{
    config::TrainingConfig,
    grid::{CellKind, LayoutConfig},
    scheduler::Scheduler,
    yield_point::FastForwardProgress,
};

const NUM_EPISODES: u32 = 2000;

fn main() -> Result<(), Box<dyn Error>> {
    let path = Path::new("demos/out");
    fs::create_dir_all(path)?;

    let mut scheduler = Scheduler::new(TrainingConfig {
        layout: LayoutConfig {
            rows: 6,
            cols: 6,
            goal: Some((5, 5)),
            items: vec![(0, 5), (4, 1)],
            ..Default::default()
        },
        ..Default::default()
    })?;
    scheduler.edit_cell((3, 3), CellKind::Wall);

    let mut progress = Vec::new();
    let report = scheduler.run_fast_forward(NUM_EPISODES, &mut |p: &FastForwardProgress| {
        progress.push((p.episode, p.epsilon));
        ControlFlow::Continue(())
    });
    println!(
        "{:?} after {} episodes ({} steps), {} checkpoints",
        report.outcome,
        report.episodes,
        report.steps,
        progress.len()
    );

    let snapshot = scheduler.snapshot();
    let mut wtr = csv::Writer::from_path(path.join("scores.csv"))?;
    wtr.write_record(["episode", "score", "average"])?;
    for record in &snapshot.history {
        wtr.write_record(&[
            record.episode.to_string(),
            record.score.to_string(),
            record.average.to_string(),
        ])?;
    }
    wtr.flush()?;

    print!("{}", snapshot.layout);
    println!(
        "best {:?} in episode {:?}, greedy route {:?}",
        snapshot.best_score,
        snapshot.best_episode,
        scheduler.greedy_path(100)
    );

    Ok(())
}
