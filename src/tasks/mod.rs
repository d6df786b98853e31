//! Task/project store boundary consumed by the review workflow.

pub mod json_store;
pub mod repository;

pub use json_store::JsonTaskRepository;
pub use repository::{
    Project, ProjectFilter, ProjectStatus, Task, TaskFilter, TaskPatch, TaskRepository, TaskStatus,
};
