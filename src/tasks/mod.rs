//! Background scheduled tasks for the application.
//!
//! The AutoDrawScheduler lives here: one recurring sweep that applies raffle
//! status transitions (activation, expiry close, capacity promotion with
//! draw scheduling) and then executes every draw whose scheduled time has
//! arrived. Call `spawn_all` once during startup to launch it.

use crate::services::{DrawService, RaffleService};

/// Spawn all background tasks.
///
/// Notes
/// - The sweep is idempotent: both services tolerate redundant invocation,
///   so overlapping restarts or manual triggers are harmless.
/// - Each raffle is processed independently inside the services; a failure
///   is logged and retried on the next tick rather than escalated.
/// - This function detaches the task via `tokio::spawn`; it does not block.
pub fn spawn_all(
    raffle_service: RaffleService,
    draw_service: DrawService,
    sweep_interval_secs: u64,
) {
    tokio::spawn(async move {
        loop {
            match raffle_service.sweep_transitions().await {
                Ok(n) if n > 0 => log::info!("Raffle transitions applied: {n}"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to sweep raffle transitions: {e:?}"),
            }

            match draw_service.sweep_due_draws().await {
                Ok(n) if n > 0 => log::info!("Automatic draws executed: {n}"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to sweep due draws: {e:?}"),
            }

            tokio::time::sleep(std::time::Duration::from_secs(sweep_interval_secs)).await;
        }
    });
}
