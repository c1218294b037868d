pub mod ai;
pub mod entity;
pub mod geometry;
pub mod obstacle;
pub mod path;
pub mod route;
