pub mod dispatcher;
pub mod queue;
pub mod trigger;
pub mod worker;
