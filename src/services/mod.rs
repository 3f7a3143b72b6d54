pub mod ai;
pub mod board;
pub mod broadcast;
pub mod reaper;
pub mod session;
