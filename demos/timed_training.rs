use std::{
    error::Error,
    thread,
    time::{Duration, Instant},
};

use gridlearn::{
    config::{Settings, TrainingConfig},
    scheduler::{Scheduler, TickEvent},
};

const NUM_EPISODES: u64 = 5;

/// Drives the timed scheduler the way an interactive host would: sleep until the next
/// deadline, tick, redraw.
fn main() -> Result<(), Box<dyn Error>> {
    let mut settings = Settings::default();
    let speed = settings.set_speed("20");

    let mut scheduler = Scheduler::new(TrainingConfig::default())?;
    scheduler.set_speed(speed);
    scheduler.start(Instant::now());

    while let Some(deadline) = scheduler.next_deadline() {
        thread::sleep(deadline.saturating_duration_since(Instant::now()));
        match scheduler.tick(Instant::now()) {
            Some(TickEvent::EpisodeStarted { episode }) => println!("episode {episode}"),
            Some(TickEvent::Step(report)) => {
                if let Some(record) = report.finished {
                    println!(
                        "  finished with {:.2}, average {:.2}",
                        record.score, record.average
                    );
                    if record.episode >= NUM_EPISODES {
                        scheduler.pause();
                    }
                }
            }
            None => thread::sleep(Duration::from_millis(1)),
        }
    }

    let snapshot = scheduler.snapshot();
    print!("{}", snapshot.layout);
    println!(
        "{:?} after {} episodes, epsilon {:.3}, best {:?}",
        snapshot.status, snapshot.episode, snapshot.epsilon, snapshot.best_score
    );
    Ok(())
}
