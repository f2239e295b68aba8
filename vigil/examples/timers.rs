//! Example: periodic and one-shot timers on the reactor

use std::time::Duration;

use vigil::{OneShotTimer, PeriodicTimer, Reactor};

fn main() -> vigil::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut reactor = Reactor::new();

    // Tick every 200ms
    let mut ticks = 0;
    reactor.add_timer(PeriodicTimer::new(Duration::from_millis(200), move || {
        ticks += 1;
        log::info!("tick {ticks}");
    }))?;

    // Stop after one second
    let handle = reactor.handle();
    reactor.add_timer(OneShotTimer::new(Duration::from_secs(1), move || {
        log::info!("one second elapsed, stopping");
        handle.stop();
    }))?;

    reactor.run()?;
    println!("Done!");
    Ok(())
}
