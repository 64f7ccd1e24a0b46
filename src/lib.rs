pub mod inference;
pub mod input;
pub mod model;
pub mod observe;
pub mod pipeline;
pub mod report;
