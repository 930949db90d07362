// # IP Source Trait
//
// Defines the interface for discovering the public IPv4 address.
//
// ## Implementations
//
// - HTTP echo service (ipify): `cfddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//     let ip = source.current().await?;
//     println!("public address: {}", ip);
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IP discovery
///
/// Called once per reconciliation cycle by the
/// [`Reconciler`](crate::engine::Reconciler).
///
/// # Rules
///
/// - One lookup per call. Do not retry internally; a failed lookup is
///   retried on the next scheduler tick.
/// - Do not cache across calls. Every cycle must see a fresh address.
/// - Must be usable from multiple tasks (`Send + Sync`).
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Fetch the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The discovered address
    /// - `Err(Error)`: Network failure or malformed response
    async fn current(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Name of this source (for logging)
    fn source_name(&self) -> &'static str;
}
