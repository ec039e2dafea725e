use embassy_executor::task;

use quadrature_sim::drivers::quadrature::PulseEngine;
use quadrature_sim::link::{self, ConfigChannel};

/// Snapshot consumer on the pulse side. Runs on the high priority interrupt
/// executor, just below the tick interrupt.
#[task]
pub async fn pulse_task(channel: &'static ConfigChannel, engine: &'static PulseEngine) -> ! {
    defmt::info!("pulse consumer started");
    link::pump(channel, engine).await
}
