// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// ============================================================================
// ADR-034: OpenBao for Secrets Management (DEFERRED to Phase 4)
// ============================================================================
// Purpose: Centralized secrets storage, dynamic credential generation, encryption-as-a-service
// Current Status: Not implemented - Phase 1 uses environment variables only
// 
// Phase 1 Workaround:
// - Credentials passed as environment variables to agent containers
// - No encryption at rest
// - No dynamic secret generation
// - No audit trail
//
// Phase 4 Implementation Plan:
// 1. OpenBao Deployment: HA setup with Raft backend
// 2. Orchestrator Integration: AppRole authentication (Role ID + Secret ID)
// 3. Dynamic Secrets: Database credentials with auto-rotation
// 4. Transit Engine: Encryption-as-a-service for signing/encryption
// 5. Keymaster Pattern: Only orchestrator accesses vault, agents never do
//
// See: adrs/034-openbao-secrets-management.md
// ============================================================================

use anyhow::Result;
use async_trait::async_trait;

/// Placeholder for OpenBao/Vault integration
/// TODO: ADR-034 implementation for Phase 4
pub struct SecretsManager {
    // TODO: VaultClient connection
}

impl SecretsManager {
    pub fn new() -> Self {
        // TODO: Initialize OpenBao client
        todo!("ADR-034: OpenBao secrets integration not yet implemented")
    }

    /// Read a secret from OpenBao
    pub async fn read_secret(&self, path: &str) -> Result<String> {
        // TODO: Implement secret read with caching
        todo!("ADR-034: Secret read not implemented")
    }

    /// Generate a dynamic secret (e.g., database credentials with TTL)
    pub async fn generate_dynamic_secret(&self, engine: &str, role: &str) -> Result<String> {
        // TODO: Implement dynamic secret generation with lease management
        todo!("ADR-034: Dynamic secret generation not implemented")
    }

    /// Sign data using OpenBao Transit Engine
    pub async fn sign(&self, key_name: &str, data: &[u8]) -> Result<String> {
        // TODO: Implement signing for SMCP/non-repudiation
        todo!("ADR-034: Transit engine signing not implemented")
    }

    /// Encrypt data using OpenBao Transit Engine
    pub async fn encrypt(&self, key_name: &str, plaintext: &[u8]) -> Result<String> {
        // TODO: Implement encryption for at-rest storage
        todo!("ADR-034: Transit engine encryption not implemented")
    }
}
