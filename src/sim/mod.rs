pub mod action;
pub mod event;
pub mod fleet;
pub mod level;
pub mod motion;
pub mod save;
pub mod step;
pub mod switcher;
pub mod world;
