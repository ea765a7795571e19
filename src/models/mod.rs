pub mod body;
pub mod pendulum;
