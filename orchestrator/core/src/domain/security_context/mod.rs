// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod capability;
pub mod repository;
pub mod security_context;

pub use capability::{Capability, RateLimit};
pub use repository::SecurityContextRepository;
pub use security_context::{SecurityContext, SecurityContextMetadata};
