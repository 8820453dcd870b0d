//! Calldata builders for the lending actions the host offers.
//!
//! Each builder returns a [`TransactionRequest`] ready for `perform_action`; the
//! action name the host reports alongside it is up to the caller.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::domain::{ChainId, TransactionRequest};

sol! {
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface IAaveV3Pool {
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
        function withdraw(address asset, uint256 amount, address to) external returns (uint256);
    }

    interface ICometMarket {
        function supply(address asset, uint256 amount) external;
        function withdraw(address asset, uint256 amount) external;
    }
}

fn request(chain_id: ChainId, to: Address, data: Vec<u8>) -> TransactionRequest {
    TransactionRequest::new(chain_id, to, Bytes::from(data))
}

pub fn erc20_approve(
    chain_id: ChainId,
    token: Address,
    spender: Address,
    amount: U256,
) -> TransactionRequest {
    let call = IERC20::approveCall { spender, amount };
    request(chain_id, token, call.abi_encode())
}

pub fn aave_supply(
    chain_id: ChainId,
    pool: Address,
    asset: Address,
    amount: U256,
    on_behalf_of: Address,
) -> TransactionRequest {
    let call = IAaveV3Pool::supplyCall {
        asset,
        amount,
        onBehalfOf: on_behalf_of,
        referralCode: 0,
    };
    request(chain_id, pool, call.abi_encode())
}

/// `amount == U256::MAX` withdraws the full position.
pub fn aave_withdraw(
    chain_id: ChainId,
    pool: Address,
    asset: Address,
    amount: U256,
    to: Address,
) -> TransactionRequest {
    let call = IAaveV3Pool::withdrawCall { asset, amount, to };
    request(chain_id, pool, call.abi_encode())
}

pub fn compound_supply(
    chain_id: ChainId,
    comet: Address,
    asset: Address,
    amount: U256,
) -> TransactionRequest {
    let call = ICometMarket::supplyCall { asset, amount };
    request(chain_id, comet, call.abi_encode())
}

pub fn compound_withdraw(
    chain_id: ChainId,
    comet: Address,
    asset: Address,
    amount: U256,
) -> TransactionRequest {
    let call = ICometMarket::withdrawCall { asset, amount };
    request(chain_id, comet, call.abi_encode())
}
