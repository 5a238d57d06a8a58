pub mod commands;
pub mod generation;
pub mod keyboards;
pub mod wizard;
