pub mod camera;
pub mod check;
pub mod sale;
pub mod scan;
pub mod search;
