//! Gateway resolution
//!
//! Every token crosses the rollup through exactly one gateway pair, chosen by
//! the parent-chain router. The route is recomputed from chain state on each
//! call and never cached, so registrations done in the meantime are picked up.

use alloy::primitives::Address;
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::evm::client::{ChainClient, ChainProvider};
use crate::evm::contracts::{ArbToken, L1GatewayRouter, L1TokenGateway, DISABLED_GATEWAY};
use crate::networks::TokenBridge;
use crate::types::{Direction, GatewayKind, GatewayRoute};

/// A gateway whose kind is known from the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownGateway {
    pub kind: GatewayKind,
    pub parent_gateway: Address,
    pub child_gateway: Address,
}

/// Classify the gateway the router registered for `parent_token`
///
/// Returns `Ok(None)` for a gateway the registry does not know; such a
/// gateway is treated as custom once its counterpart has been read.
pub fn classify_gateway(
    bridge: &TokenBridge,
    parent_token: Address,
    registered: Address,
) -> Result<Option<KnownGateway>, BridgeError> {
    let weth = KnownGateway {
        kind: GatewayKind::WrappedNative,
        parent_gateway: bridge.l1_weth_gateway,
        child_gateway: bridge.l2_weth_gateway,
    };
    let standard = KnownGateway {
        kind: GatewayKind::Standard,
        parent_gateway: bridge.l1_erc20_gateway,
        child_gateway: bridge.l2_erc20_gateway,
    };
    let custom = KnownGateway {
        kind: GatewayKind::Custom,
        parent_gateway: bridge.l1_custom_gateway,
        child_gateway: bridge.l2_custom_gateway,
    };

    // WETH always goes through its own gateway
    if !bridge.l1_weth.is_zero() && parent_token == bridge.l1_weth {
        return Ok(Some(weth));
    }

    if registered == DISABLED_GATEWAY {
        return Err(BridgeError::TokenNotBridgeable(parent_token));
    }

    if registered.is_zero() {
        if bridge.l1_erc20_gateway.is_zero() {
            return Err(BridgeError::TokenNotBridgeable(parent_token));
        }
        return Ok(Some(standard));
    }

    let known = [standard, custom, weth]
        .into_iter()
        .find(|g| !g.parent_gateway.is_zero() && g.parent_gateway == registered);
    Ok(known)
}

/// Treat an unregistered gateway as custom once its counterpart is known
///
/// A gateway that rejects `counterpartGateway()` is not a token gateway.
/// Any other failure (RPC down, rate limited) is passed through unchanged.
pub fn unknown_gateway(
    parent_token: Address,
    registered: Address,
    counterpart: Result<Address, BridgeError>,
) -> Result<KnownGateway, BridgeError> {
    match counterpart {
        Ok(child_gateway) => Ok(KnownGateway {
            kind: GatewayKind::Custom,
            parent_gateway: registered,
            child_gateway,
        }),
        Err(e) if e.is_revert() || e.is_empty_return() => {
            debug!(gateway = %registered, error = %e, "counterpartGateway rejected");
            Err(BridgeError::UnsupportedGateway {
                token: parent_token,
                gateway: registered,
            })
        }
        Err(e) => Err(e),
    }
}

/// Resolves gateway routes and token counterparts from chain state
#[derive(Debug, Clone)]
pub struct GatewayResolver<PP, CP> {
    parent: ChainClient<PP>,
    child: ChainClient<CP>,
    token_bridge: TokenBridge,
}

impl<PP: ChainProvider, CP: ChainProvider> GatewayResolver<PP, CP> {
    pub fn new(parent: ChainClient<PP>, child: ChainClient<CP>, token_bridge: TokenBridge) -> Self {
        Self {
            parent,
            child,
            token_bridge,
        }
    }

    pub fn token_bridge(&self) -> &TokenBridge {
        &self.token_bridge
    }

    /// Gateway the router has registered for `parent_token` (zero when none)
    pub async fn registered_gateway(&self, parent_token: Address) -> Result<Address, BridgeError> {
        let router = L1GatewayRouter::new(self.token_bridge.l1_gateway_router, self.parent.provider());
        Ok(router.l1TokenToGateway(parent_token).call().await?._0)
    }

    /// Gateway the router would use for `parent_token`
    pub async fn parent_gateway(&self, parent_token: Address) -> Result<Address, BridgeError> {
        let router = L1GatewayRouter::new(self.token_bridge.l1_gateway_router, self.parent.provider());
        Ok(router.getGateway(parent_token).call().await?.gateway)
    }

    /// Deterministic child-chain address of `parent_token`
    pub async fn child_token_address(&self, parent_token: Address) -> Result<Address, BridgeError> {
        let router = L1GatewayRouter::new(self.token_bridge.l1_gateway_router, self.parent.provider());
        Ok(router.calculateL2TokenAddress(parent_token).call().await?._0)
    }

    /// Parent-chain token behind a child-chain token
    ///
    /// The answer is only trusted when the router maps it back to `child_token`.
    pub async fn parent_token_address(&self, child_token: Address) -> Result<Address, BridgeError> {
        let parent_token =
            if !self.token_bridge.l2_weth.is_zero() && child_token == self.token_bridge.l2_weth {
                self.token_bridge.l1_weth
            } else {
                ArbToken::new(child_token, self.child.provider())
                    .l1Address()
                    .call()
                    .await?
                    ._0
            };

        let round_trip = self.child_token_address(parent_token).await?;
        if round_trip != child_token {
            warn!(
                child_token = %child_token,
                parent_token = %parent_token,
                round_trip = %round_trip,
                "Child token does not map back to its parent token"
            );
            return Err(BridgeError::TokenNotBridgeable(child_token));
        }
        Ok(parent_token)
    }

    /// Route for moving `parent_token` in `direction`
    pub async fn resolve_gateway(
        &self,
        parent_token: Address,
        direction: Direction,
    ) -> Result<GatewayRoute, BridgeError> {
        let registered = if parent_token == self.token_bridge.l1_weth {
            Address::ZERO
        } else {
            self.registered_gateway(parent_token).await?
        };

        let gateway = match classify_gateway(&self.token_bridge, parent_token, registered)? {
            Some(known) => known,
            None => {
                let counterpart = L1TokenGateway::new(registered, self.parent.provider())
                    .counterpartGateway()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(BridgeError::from);
                unknown_gateway(parent_token, registered, counterpart)?
            }
        };

        let child_token = self.child_token_address(parent_token).await?;
        let route = GatewayRoute {
            direction: Direction::Deposit,
            kind: gateway.kind,
            source_gateway: gateway.parent_gateway,
            dest_gateway: gateway.child_gateway,
            parent_token,
            child_token,
        };

        debug!(
            token = %parent_token,
            kind = %route.kind,
            parent_gateway = %route.parent_gateway(),
            child_gateway = %route.child_gateway(),
            "Resolved gateway route"
        );

        Ok(match direction {
            Direction::Deposit => route,
            Direction::Withdraw => route.reversed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use crate::networks::default_local_networks;
    use alloy::transports::TransportErrorKind;

    fn bridge() -> TokenBridge {
        default_local_networks().1.token_bridge
    }

    #[test]
    fn test_unregistered_token_uses_standard_gateway() {
        let bridge = bridge();
        let known = classify_gateway(&bridge, Address::repeat_byte(1), Address::ZERO)
            .unwrap()
            .unwrap();
        assert_eq!(known.kind, GatewayKind::Standard);
        assert_eq!(known.parent_gateway, bridge.l1_erc20_gateway);
        assert_eq!(known.child_gateway, bridge.l2_erc20_gateway);
    }

    #[test]
    fn test_registered_gateways() {
        let bridge = bridge();
        let token = Address::repeat_byte(1);
        let custom = classify_gateway(&bridge, token, bridge.l1_custom_gateway)
            .unwrap()
            .unwrap();
        assert_eq!(custom.kind, GatewayKind::Custom);
        assert_eq!(custom.child_gateway, bridge.l2_custom_gateway);

        let weth = classify_gateway(&bridge, token, bridge.l1_weth_gateway)
            .unwrap()
            .unwrap();
        assert_eq!(weth.kind, GatewayKind::WrappedNative);
    }

    #[test]
    fn test_weth_is_forced() {
        let bridge = bridge();
        // Even if the router reports something else
        let known = classify_gateway(&bridge, bridge.l1_weth, bridge.l1_erc20_gateway)
            .unwrap()
            .unwrap();
        assert_eq!(known.kind, GatewayKind::WrappedNative);
        assert_eq!(known.parent_gateway, bridge.l1_weth_gateway);
    }

    #[test]
    fn test_disabled_token() {
        let err = classify_gateway(&bridge(), Address::repeat_byte(1), DISABLED_GATEWAY).unwrap_err();
        assert!(matches!(err, BridgeError::TokenNotBridgeable(_)));
    }

    #[test]
    fn test_no_standard_gateway_deployed() {
        let mut bridge = bridge();
        bridge.l1_erc20_gateway = Address::ZERO;
        let err = classify_gateway(&bridge, Address::repeat_byte(1), Address::ZERO).unwrap_err();
        assert!(matches!(err, BridgeError::TokenNotBridgeable(_)));
    }

    #[test]
    fn test_unknown_gateway_needs_counterpart() {
        let known = classify_gateway(&bridge(), Address::repeat_byte(1), Address::repeat_byte(0x77))
            .unwrap();
        assert!(known.is_none());
    }

    #[test]
    fn test_unknown_gateway_with_counterpart_is_custom() {
        let known = unknown_gateway(
            Address::repeat_byte(1),
            Address::repeat_byte(0x77),
            Ok(Address::repeat_byte(0x78)),
        )
        .unwrap();
        assert_eq!(known.kind, GatewayKind::Custom);
        assert_eq!(known.parent_gateway, Address::repeat_byte(0x77));
        assert_eq!(known.child_gateway, Address::repeat_byte(0x78));
    }

    #[test]
    fn test_unknown_gateway_revert_is_unsupported() {
        let reverted = BridgeError::Rpc(TransportErrorKind::custom_str("execution reverted"));
        let err = unknown_gateway(Address::repeat_byte(1), Address::repeat_byte(0x77), Err(reverted))
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedGateway { .. }));
        assert_eq!(err.class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_unknown_gateway_rpc_failure_stays_transient() {
        let reset = BridgeError::Rpc(TransportErrorKind::custom_str("connection reset by peer"));
        let err = unknown_gateway(Address::repeat_byte(1), Address::repeat_byte(0x77), Err(reset))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Rpc(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_classification_is_stable() {
        let bridge = bridge();
        let token = Address::repeat_byte(5);
        let a = classify_gateway(&bridge, token, bridge.l1_custom_gateway).unwrap();
        let b = classify_gateway(&bridge, token, bridge.l1_custom_gateway).unwrap();
        assert_eq!(a, b);
    }
}
