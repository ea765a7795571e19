pub mod period_timer;
pub mod period_trace;
