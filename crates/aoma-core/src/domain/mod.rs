//! Domain model: step definitions, the dependency graph, runs and the
//! interfaces of external collaborators.

pub mod collaborators;
pub mod context;
pub mod dependency_graph;
pub mod events;
pub mod repository;
pub mod run;
pub mod step_definition;
