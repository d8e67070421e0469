//! Shared types for external-chain integration
//!
//! This crate mirrors the events emitted by the monitored Example contract
//! (`Deposit` and `Swap`) so they can be decoded from raw EVM logs.
//!
//! ```solidity
//! event Deposit(address indexed user, string token, uint256 amount);
//! event Swap(address indexed user, string tokenIn, string tokenOut, uint256 amountIn);
//! ```

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, Log, H160, H256, U256};
use hex_literal::hex;
use thiserror::Error;

/// Address of the Example contract deployed on Polygon Amoy
pub const EXAMPLE_CONTRACT_ADDRESS: &str = "0x102a91394927a2b44020f72cF96162142c242DA4";

/// [`EXAMPLE_CONTRACT_ADDRESS`] as an address
pub const EXAMPLE_CONTRACT: Address = H160(hex!("102a91394927a2b44020f72cF96162142c242DA4"));

/// keccak256("Deposit(address,string,uint256)")
pub const DEPOSIT_EVENT_SIGNATURE: H256 = H256(hex!(
    "2d4b597935f3cd67fb2eebf1db4debc934cee5c7baa7153f980fdbeb2e74084e"
));

/// keccak256("Swap(address,string,string,uint256)")
pub const SWAP_EVENT_SIGNATURE: H256 = H256(hex!(
    "363ba239c72b81c4726aba8829ad4df22628bf7d09efc5f7a18063a53ec1c4ba"
));

/// Errors raised while decoding a contract log
#[derive(Error, Debug)]
pub enum EventDecodeError {
    #[error("log has no indexed user topic")]
    MissingUserTopic,

    #[error("unexpected event signature {0:?}")]
    UnexpectedSignature(H256),

    #[error("invalid ABI data: {0}")]
    Abi(#[from] abi::Error),

    #[error("ABI field `{0}` has an unexpected type")]
    UnexpectedToken(&'static str),
}

/// Event kinds recognized by topic 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Deposit,
    Swap,
}

impl EventKind {
    /// Classify a log by its signature topic
    pub fn from_signature(topic: &H256) -> Option<Self> {
        if *topic == DEPOSIT_EVENT_SIGNATURE {
            Some(Self::Deposit)
        } else if *topic == SWAP_EVENT_SIGNATURE {
            Some(Self::Swap)
        } else {
            None
        }
    }

    /// Signature topic for this kind
    pub fn signature(self) -> H256 {
        match self {
            Self::Deposit => DEPOSIT_EVENT_SIGNATURE,
            Self::Swap => SWAP_EVENT_SIGNATURE,
        }
    }
}

/// `Deposit` event (matches Example.sol)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositEvent {
    /// Indexed depositor, taken from topic 1
    pub user: Address,
    pub token: String,
    pub amount: U256,
}

impl DepositEvent {
    const DATA: [ParamType; 2] = [ParamType::String, ParamType::Uint(256)];

    /// Decode from a raw log. Only the non-indexed fields live in `data`.
    pub fn decode(log: &Log) -> Result<Self, EventDecodeError> {
        let user = indexed_user(log, EventKind::Deposit)?;
        let mut tokens = abi::decode(&Self::DATA, &log.data)?.into_iter();

        let token = next_string(&mut tokens, "token")?;
        let amount = next_uint(&mut tokens, "amount")?;

        Ok(Self { user, token, amount })
    }

    /// Build the log the contract would emit for this event
    pub fn to_log(&self, contract: Address) -> Log {
        let data = abi::encode(&[Token::String(self.token.clone()), Token::Uint(self.amount)]);
        event_log(contract, EventKind::Deposit, self.user, data)
    }
}

/// `Swap` event (matches Example.sol)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapEvent {
    /// Indexed swapper, taken from topic 1
    pub user: Address,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: U256,
}

impl SwapEvent {
    const DATA: [ParamType; 3] = [ParamType::String, ParamType::String, ParamType::Uint(256)];

    /// Decode from a raw log
    pub fn decode(log: &Log) -> Result<Self, EventDecodeError> {
        let user = indexed_user(log, EventKind::Swap)?;
        let mut tokens = abi::decode(&Self::DATA, &log.data)?.into_iter();

        let token_in = next_string(&mut tokens, "tokenIn")?;
        let token_out = next_string(&mut tokens, "tokenOut")?;
        let amount_in = next_uint(&mut tokens, "amountIn")?;

        Ok(Self {
            user,
            token_in,
            token_out,
            amount_in,
        })
    }

    /// Build the log the contract would emit for this event
    pub fn to_log(&self, contract: Address) -> Log {
        let data = abi::encode(&[
            Token::String(self.token_in.clone()),
            Token::String(self.token_out.clone()),
            Token::Uint(self.amount_in),
        ]);
        event_log(contract, EventKind::Swap, self.user, data)
    }
}

fn indexed_user(log: &Log, kind: EventKind) -> Result<Address, EventDecodeError> {
    match log.topics.first() {
        Some(topic) if *topic == kind.signature() => {}
        Some(topic) => return Err(EventDecodeError::UnexpectedSignature(*topic)),
        None => return Err(EventDecodeError::MissingUserTopic),
    }

    log.topics
        .get(1)
        .map(|topic| Address::from(*topic))
        .ok_or(EventDecodeError::MissingUserTopic)
}

fn next_string(
    tokens: &mut impl Iterator<Item = Token>,
    field: &'static str,
) -> Result<String, EventDecodeError> {
    tokens
        .next()
        .and_then(Token::into_string)
        .ok_or(EventDecodeError::UnexpectedToken(field))
}

fn next_uint(
    tokens: &mut impl Iterator<Item = Token>,
    field: &'static str,
) -> Result<U256, EventDecodeError> {
    tokens
        .next()
        .and_then(Token::into_uint)
        .ok_or(EventDecodeError::UnexpectedToken(field))
}

fn event_log(contract: Address, kind: EventKind, user: Address, data: Vec<u8>) -> Log {
    Log {
        address: contract,
        topics: vec![kind.signature(), H256::from(user)],
        data: Bytes::from(data),
        ..Default::default()
    }
}
