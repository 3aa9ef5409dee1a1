use std::sync::Arc;

use crate::service::CalculatorService;

/// Request body cap used unless configured otherwise.
pub const DEFAULT_BODY_LIMIT: usize = 1 << 20;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn CalculatorService>,
    pub body_limit: usize,
}

impl AppState {
    pub fn new(service: Arc<dyn CalculatorService>) -> Self {
        Self {
            service,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }
}
