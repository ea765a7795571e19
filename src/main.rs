use rpendulum::{Lab, LabConfig};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(LevelFilter::DEBUG)
            .finish(),
    )?;

    // Release a 1 m pendulum from 0.1 rad and time one period.
    let mut config = LabConfig::with_period_timer();
    config.pendula[0].length = 1.0;
    let mut lab = Lab::new(config)?;

    lab.set_user_controlled(0, true)?;
    lab.drag_pendulum(0, 0.1)?;
    lab.set_user_controlled(0, false)?;

    let env = lab.environment();
    info!(
        approximate = lab.pendulum(0)?.approximate_period(env),
        "small-angle period"
    );

    lab.set_period_timer_visible(true);
    lab.set_period_timer_running(true);

    let dt = 1.0 / 60.0;
    let mut frames = 0;
    while lab.period_timer().is_some_and(|t| t.is_running()) && frames < 600 {
        lab.step(dt);
        frames += 1;
    }

    let measured = lab.period_timer().map(|t| t.elapsed_time()).unwrap_or(0.0);
    // lab time runs TIMER_OFFSET faster than the host clock
    info!(measured, frames, "period timer stopped");

    let p = lab.pendulum(0)?;
    println!("angle = {:+.5} rad, omega = {:+.5} rad/s", p.angle(), p.angular_velocity());
    println!(
        "KE = {:.6} J, PE = {:.6} J, thermal = {:.6} J",
        p.kinetic_energy(),
        p.potential_energy(),
        p.thermal_energy()
    );
    Ok(())
}
