pub mod applications;
pub mod cvs;
pub mod queue;
pub mod workflows;
