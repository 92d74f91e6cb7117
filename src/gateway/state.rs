//! Shared handler state.

use std::sync::Arc;

use crate::pipeline::Engine;
use crate::tasks::TaskManager;

#[derive(Clone)]
pub struct HandlerState {
    pub engine: Arc<Engine>,
    pub tasks: Arc<TaskManager>,
}

impl HandlerState {
    pub fn new(engine: Arc<Engine>, tasks: Arc<TaskManager>) -> Self {
        Self { engine, tasks }
    }
}
