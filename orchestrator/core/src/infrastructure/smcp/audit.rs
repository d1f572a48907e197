// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::mcp::PolicyViolation;
use tracing::{info, warn};

pub struct SmcpAuditLogger {
}

impl SmcpAuditLogger {
    pub fn new() -> Self {
        Self {}
    }
    
    pub async fn log_violation(&self, violation: &PolicyViolation) {
        warn!("SMCP Policy Violation Detected: {:?}", violation);
        // We could also publish a DomainEvent to the EventBus here.
        info!("In a full implementation, SMCP policy violation events are forwarded to the event bus for auditing");
    }
}
