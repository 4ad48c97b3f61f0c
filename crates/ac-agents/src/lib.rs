pub mod agent;
pub mod coordinator;
pub mod executor;
pub mod memory;
pub mod recommendation;
pub mod registry;
pub mod task_queue;
pub mod team;
pub mod worker;
