//! REST transport adapters for the migration engine
//!
//! Implements the `mig-core` capability traits over `reqwest`:
//!
//! - [`HttpResourceClient`]: one per resource kind, routed by [`Routes`]
//! - [`HttpLineageClient`], [`HttpPolicyClient`], [`HttpDeploymentClient`]
//! - [`Environment`]: every adapter for one configured environment
//!
//! # Example
//!
//! ```ignore
//! use mig_http::Environment;
//!
//! let source = Environment::connect(&config.source)?;
//! let target = Environment::connect(&config.target)?;
//! let engine = MigrationEngine::builder(config)
//!     .source(source.registry())
//!     .target(target.registry())
//!     .lineage(source.lineage())
//!     .build()?;
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod resource;
pub mod services;
pub mod transport;

pub use resource::{HttpResourceClient, Routes};
pub use services::{HttpDeploymentClient, HttpLineageClient, HttpPolicyClient};
pub use transport::HttpTransport;

use mig_core::{
    ClientRegistry, DeploymentClient, EnvironmentConfig, LineageClient, MigrationError, PolicyClient,
};
use mig_types::ResourceKind;
use std::sync::Arc;

/// Build a registry with an [`HttpResourceClient`] for every kind
///
/// # Errors
/// `Config` if the environment settings are invalid
pub fn registry_for(env: &EnvironmentConfig) -> Result<ClientRegistry, MigrationError> {
    Ok(Environment::connect(env)?.registry())
}

/// All adapters of one platform environment
#[derive(Debug, Clone)]
pub struct Environment {
    transport: HttpTransport,
}

impl Environment {
    /// Connect to an environment
    ///
    /// # Errors
    /// `Config` if the environment settings are invalid
    pub fn connect(env: &EnvironmentConfig) -> Result<Self, MigrationError> {
        let transport = HttpTransport::new(env)?;
        tracing::debug!("Configured environment at {}", transport.base_url());
        Ok(Self { transport })
    }

    /// Resource clients for every kind
    #[must_use]
    pub fn registry(&self) -> ClientRegistry {
        ResourceKind::ALL.iter().fold(ClientRegistry::new(), |registry, kind| {
            registry.with(*kind, Arc::new(HttpResourceClient::new(*kind, self.transport.clone())))
        })
    }

    /// Lineage adapter
    #[must_use]
    pub fn lineage(&self) -> Arc<dyn LineageClient> {
        Arc::new(HttpLineageClient::new(self.transport.clone()))
    }

    /// Policy adapter
    #[must_use]
    pub fn policy(&self) -> Arc<dyn PolicyClient> {
        Arc::new(HttpPolicyClient::new(self.transport.clone()))
    }

    /// Deployment adapter
    #[must_use]
    pub fn deployments(&self) -> Arc<dyn DeploymentClient> {
        Arc::new(HttpDeploymentClient::new(self.transport.clone()))
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
