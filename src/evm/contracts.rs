//! Rollup bridge contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the parent-chain
//! bridge contracts, the token gateways on both chains and the child-chain
//! precompiles.

#![allow(clippy::too_many_arguments)]

use alloy::{primitives::address, primitives::Address, sol};

/// `ArbSys` precompile
pub const ARB_SYS_ADDRESS: Address = address!("0000000000000000000000000000000000000064");

/// `ArbRetryableTx` precompile
pub const ARB_RETRYABLE_TX_ADDRESS: Address = address!("000000000000000000000000000000000000006e");

/// `NodeInterface` virtual contract (only reachable through eth_call/eth_estimateGas)
pub const NODE_INTERFACE_ADDRESS: Address = address!("00000000000000000000000000000000000000c8");

/// Gateway value the router stores for tokens that may not be bridged
pub const DISABLED_GATEWAY: Address = address!("0000000000000000000000000000000000000001");

/// Value `isArbitrumEnabled()` returns for tokens that opted into custom bridging
pub const ARBITRUM_ENABLED: u8 = 0xb1;

sol! {
    // ========================================================================
    // Parent chain: delayed inbox
    // ========================================================================

    /// Delayed inbox accepting retryable tickets and ETH deposits
    #[sol(rpc)]
    contract Inbox {
        function createRetryableTicket(
            address to,
            uint256 l2CallValue,
            uint256 maxSubmissionCost,
            address excessFeeRefundAddress,
            address callValueRefundAddress,
            uint256 gasLimit,
            uint256 maxFeePerGas,
            bytes calldata data
        ) external payable returns (uint256);

        /// Same as createRetryableTicket but without refund address aliasing or deposit checks
        function unsafeCreateRetryableTicket(
            address to,
            uint256 l2CallValue,
            uint256 maxSubmissionCost,
            address excessFeeRefundAddress,
            address callValueRefundAddress,
            uint256 gasLimit,
            uint256 maxFeePerGas,
            bytes calldata data
        ) external payable returns (uint256);

        function depositEth() external payable returns (uint256);

        function calculateRetryableSubmissionFee(uint256 dataLength, uint256 baseFee)
            external view returns (uint256);

        function bridge() external view returns (address);

        function sequencerInbox() external view returns (address);

        event InboxMessageDelivered(uint256 indexed messageNum, bytes data);

        event InboxMessageDeliveredFromOrigin(uint256 indexed messageNum);
    }

    /// Bridge contract holding the delayed message accumulator
    #[sol(rpc)]
    contract Bridge {
        function delayedMessageCount() external view returns (uint256);

        function delayedInboxAccs(uint256 index) external view returns (bytes32);

        function sequencerInbox() external view returns (address);

        event MessageDelivered(
            uint256 indexed messageIndex,
            bytes32 indexed beforeInboxAcc,
            address inbox,
            uint8 kind,
            address sender,
            bytes32 messageDataHash,
            uint256 baseFeeL1,
            uint64 timestamp
        );
    }

    /// Sequencer inbox, used to force-include stale delayed messages
    #[sol(rpc)]
    contract SequencerInbox {
        function totalDelayedMessagesRead() external view returns (uint256);

        function maxTimeVariation() external view returns (
            uint256 delayBlocks,
            uint256 futureBlocks,
            uint256 delaySeconds,
            uint256 futureSeconds
        );

        function forceInclusion(
            uint256 _totalDelayedMessagesRead,
            uint8 kind,
            uint64[2] calldata l1BlockAndTime,
            uint256 baseFeeL1,
            address sender,
            bytes32 messageDataHash
        ) external;
    }

    /// Outbox executing child-to-parent messages
    #[sol(rpc)]
    contract Outbox {
        function isSpent(uint256 index) external view returns (bool);
    }

    // ========================================================================
    // Token gateways
    // ========================================================================

    /// Parent-chain gateway router
    #[sol(rpc)]
    contract L1GatewayRouter {
        function outboundTransfer(
            address _token,
            address _to,
            uint256 _amount,
            uint256 _maxGas,
            uint256 _gasPriceBid,
            bytes calldata _data
        ) external payable returns (bytes memory);

        function getGateway(address _token) external view returns (address gateway);

        function l1TokenToGateway(address _token) external view returns (address);

        function defaultGateway() external view returns (address);

        function calculateL2TokenAddress(address l1ERC20) external view returns (address);

        function counterpartGateway() external view returns (address);

        function setGateways(
            address[] memory _token,
            address[] memory _gateway,
            uint256 _maxGas,
            uint256 _gasPriceBid,
            uint256 _maxSubmissionCost
        ) external payable returns (uint256);

        function owner() external view returns (address);
    }

    /// Child-chain gateway router
    #[sol(rpc)]
    contract L2GatewayRouter {
        function outboundTransfer(
            address _l1Token,
            address _to,
            uint256 _amount,
            bytes calldata _data
        ) external payable returns (bytes memory);

        function getGateway(address _token) external view returns (address gateway);

        function calculateL2TokenAddress(address l1ERC20) external view returns (address);

        function setGateway(address[] memory _l1Token, address[] memory _gateway) external;
    }

    /// Any parent-chain token gateway
    #[sol(rpc)]
    contract L1TokenGateway {
        function getOutboundCalldata(
            address _token,
            address _from,
            address _to,
            uint256 _amount,
            bytes memory _data
        ) external view returns (bytes memory outboundCalldata);

        function counterpartGateway() external view returns (address);

        function calculateL2TokenAddress(address l1ERC20) external view returns (address);

        function router() external view returns (address);
    }

    /// Parent-chain custom gateway
    #[sol(rpc)]
    contract L1CustomGateway {
        function l1ToL2Token(address l1Token) external view returns (address);
    }

    /// Child-chain custom gateway
    #[sol(rpc)]
    contract L2CustomGateway {
        function registerTokenFromL1(address[] calldata l1Address, address[] calldata l2Address) external;

        function l1ToL2Token(address l1Token) external view returns (address);
    }

    /// Parent-chain token able to register itself with the custom gateway
    #[sol(rpc)]
    contract CustomToken {
        function registerTokenOnL2(
            address l2CustomTokenAddress,
            uint256 maxSubmissionCostForCustomGateway,
            uint256 maxSubmissionCostForRouter,
            uint256 maxGasForCustomGateway,
            uint256 maxGasForRouter,
            uint256 gasPriceBid,
            uint256 valueForGateway,
            uint256 valueForRouter,
            address creditBackAddress
        ) external payable;

        function isArbitrumEnabled() external view returns (uint8);
    }

    /// Child-chain token minted by a gateway
    #[sol(rpc)]
    contract ArbToken {
        function l1Address() external view returns (address);
    }

    // ========================================================================
    // Child chain precompiles
    // ========================================================================

    /// Retryable ticket management precompile
    #[sol(rpc)]
    contract ArbRetryableTx {
        function redeem(bytes32 ticketId) external returns (bytes32);

        function getLifetime() external view returns (uint256);

        function getTimeout(bytes32 ticketId) external view returns (uint256);

        function keepalive(bytes32 ticketId) external returns (uint256);

        function getBeneficiary(bytes32 ticketId) external view returns (address);

        function cancel(bytes32 ticketId) external;

        event TicketCreated(bytes32 indexed ticketId);

        event LifetimeExtended(bytes32 indexed ticketId, uint256 newTimeout);

        event RedeemScheduled(
            bytes32 indexed ticketId,
            bytes32 indexed retryTxHash,
            uint64 indexed sequenceNum,
            uint64 donatedGas,
            address gasDonor,
            uint256 maxRefund,
            uint256 submissionFeeRefund
        );

        event Canceled(bytes32 indexed ticketId);
    }

    /// System precompile, entry point for withdrawals
    #[sol(rpc)]
    contract ArbSys {
        function withdrawEth(address destination) external payable returns (uint256);

        function arbBlockNumber() external view returns (uint256);

        event L2ToL1Tx(
            address caller,
            address indexed destination,
            uint256 indexed hash,
            uint256 indexed position,
            uint256 arbBlockNum,
            uint256 ethBlockNum,
            uint256 timestamp,
            uint256 callvalue,
            bytes data
        );
    }

    /// Gas estimation entry points of the child chain node
    #[sol(rpc)]
    contract NodeInterface {
        function estimateRetryableTicket(
            address sender,
            uint256 deposit,
            address to,
            uint256 l2CallValue,
            address excessFeeRefundAddress,
            address callValueRefundAddress,
            bytes calldata data
        ) external;
    }

    // ========================================================================
    // ERC20 Interface for token operations
    // ========================================================================

    /// Standard ERC20 interface
    #[sol(rpc)]
    contract ERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);

        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::{SolCall, SolEvent};

    #[test]
    fn test_precompile_addresses() {
        assert_eq!(ARB_SYS_ADDRESS, Address::with_last_byte(0x64));
        assert_eq!(ARB_RETRYABLE_TX_ADDRESS, Address::with_last_byte(0x6e));
        assert_eq!(NODE_INTERFACE_ADDRESS, Address::with_last_byte(0xc8));
        assert_eq!(DISABLED_GATEWAY, Address::with_last_byte(1));
    }

    #[test]
    fn test_known_selectors() {
        // depositEth()
        assert_eq!(Inbox::depositEthCall::SELECTOR, [0x43, 0x93, 0x70, 0xb1]);
        // balanceOf(address)
        assert_eq!(ERC20::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
        // approve(address,uint256)
        assert_eq!(ERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
    }

    #[test]
    fn test_event_signatures_are_distinct() {
        assert_ne!(
            ArbRetryableTx::RedeemScheduled::SIGNATURE_HASH,
            ArbRetryableTx::TicketCreated::SIGNATURE_HASH
        );
        assert_ne!(
            Bridge::MessageDelivered::SIGNATURE_HASH,
            Inbox::InboxMessageDelivered::SIGNATURE_HASH
        );
    }
}
