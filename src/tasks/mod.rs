pub mod console_task;
pub mod pulse_task;
