pub mod codestral;

use anyhow::bail;
use anyhow::Result;

use crate::domain::models::GatewayBox;
use crate::infrastructure::proxy_client::ProxyClient;

/// Where code actions are executed: directly against the provider, or through
/// a running HTTP host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayTarget {
    Provider,
    Proxy,
}

pub struct GatewayManager {}

impl GatewayManager {
    pub fn get(target: GatewayTarget) -> Result<GatewayBox> {
        if target == GatewayTarget::Provider {
            return Ok(Box::<codestral::Codestral>::default());
        }

        if target == GatewayTarget::Proxy {
            return Ok(Box::<ProxyClient>::default());
        }

        bail!(format!("No gateway implemented for {target:?}"))
    }
}
