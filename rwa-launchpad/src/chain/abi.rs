//! Minimal ABI codec for the contract surface this crate talks to.
//!
//! Covers exactly the types the factory, property, and payments contracts
//! use: `address`, `uint256`, `bool`, `string`, `bytes`, `bytes4`,
//! `address[]`, and `uint256[]`. This is deliberately not a general-purpose
//! ABI implementation; anything outside that surface is a codec error.

use alloy_primitives::{Address, B256, U256, keccak256};

use crate::error::{LaunchpadError, Result};

const WORD: usize = 32;

/// A decoded or to-be-encoded ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// 20-byte address.
    Address(Address),
    /// 256-bit unsigned integer.
    Uint(U256),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    String(String),
    /// Raw byte string (`bytes`).
    Bytes(Vec<u8>),
    /// 4-byte fixed array (`bytes4`), as in ERC165 interface ids.
    FixedBytes4([u8; 4]),
    /// Homogeneous address array.
    AddressArray(Vec<Address>),
    /// Homogeneous uint256 array.
    UintArray(Vec<U256>),
}

impl Token {
    /// Returns the address value, if this token is one.
    #[must_use]
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(a) => Some(*a),
            _ => None,
        }
    }

    /// Returns the uint value, if this token is one.
    #[must_use]
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint(u) => Some(*u),
            _ => None,
        }
    }

    /// Returns the bool value, if this token is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string value, if this token is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the address array, if this token is one.
    #[must_use]
    pub fn as_address_array(&self) -> Option<&[Address]> {
        match self {
            Self::AddressArray(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the uint array, if this token is one.
    #[must_use]
    pub fn as_uint_array(&self) -> Option<&[U256]> {
        match self {
            Self::UintArray(u) => Some(u),
            _ => None,
        }
    }

    fn is_dynamic(&self) -> bool {
        matches!(
            self,
            Self::String(_) | Self::Bytes(_) | Self::AddressArray(_) | Self::UintArray(_)
        )
    }
}

/// ABI parameter type, for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// 20-byte address.
    Address,
    /// 256-bit unsigned integer.
    Uint,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
    /// Raw byte string (`bytes`).
    Bytes,
    /// 4-byte fixed array (`bytes4`).
    FixedBytes4,
    /// Homogeneous address array.
    AddressArray,
    /// Homogeneous uint256 array.
    UintArray,
}

impl ParamType {
    /// Whether values of this type live in the tail section.
    #[must_use]
    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::String | Self::Bytes | Self::AddressArray | Self::UintArray)
    }
}

/// Computes the 4-byte function selector for a signature like
/// `pay(address)`.
#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Computes the topic-0 hash for an event signature like
/// `PropertyLaunched(address,address,string,string,uint256)`.
#[must_use]
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// Encodes a function call: selector followed by the encoded arguments.
#[must_use]
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend_from_slice(&encode(args));
    out
}

/// Encodes a token sequence using standard head/tail layout.
#[must_use]
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail: Vec<u8> = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            let offset = U256::from(head_len + tail.len());
            head.extend_from_slice(&offset.to_be_bytes::<WORD>());
            tail.extend_from_slice(&encode_tail(token));
        } else {
            head.extend_from_slice(&encode_word(token));
        }
    }

    head.extend_from_slice(&tail);
    head
}

fn encode_word(token: &Token) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    match token {
        Token::Address(address) => word[12..].copy_from_slice(address.as_slice()),
        Token::Uint(value) => word = value.to_be_bytes::<WORD>(),
        Token::Bool(true) => word[WORD - 1] = 1,
        Token::FixedBytes4(bytes) => word[..4].copy_from_slice(bytes),
        Token::Bool(false)
        | Token::String(_)
        | Token::Bytes(_)
        | Token::AddressArray(_)
        | Token::UintArray(_) => {}
    }
    word
}

fn encode_byte_tail(bytes: &[u8]) -> Vec<u8> {
    let mut out = U256::from(bytes.len()).to_be_bytes::<WORD>().to_vec();
    out.extend_from_slice(bytes);
    let padding = bytes.len().div_ceil(WORD) * WORD - bytes.len();
    out.extend(std::iter::repeat_n(0u8, padding));
    out
}

fn encode_tail(token: &Token) -> Vec<u8> {
    match token {
        Token::String(s) => encode_byte_tail(s.as_bytes()),
        Token::Bytes(bytes) => encode_byte_tail(bytes),
        Token::AddressArray(addresses) => {
            let mut out = U256::from(addresses.len()).to_be_bytes::<WORD>().to_vec();
            for address in addresses {
                out.extend_from_slice(&encode_word(&Token::Address(*address)));
            }
            out
        }
        Token::UintArray(values) => {
            let mut out = U256::from(values.len()).to_be_bytes::<WORD>().to_vec();
            for value in values {
                out.extend_from_slice(&encode_word(&Token::Uint(*value)));
            }
            out
        }
        _ => Vec::new(),
    }
}

/// Decodes a token sequence from return data or log data.
///
/// # Errors
///
/// Returns [`LaunchpadError::Abi`] for truncated data, out-of-bounds
/// offsets, oversized lengths, or invalid UTF-8 in strings.
pub fn decode(kinds: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
    let mut tokens = Vec::with_capacity(kinds.len());
    for (index, kind) in kinds.iter().enumerate() {
        let word = read_word(data, index * WORD)?;
        if kind.is_dynamic() {
            let offset = word_to_usize(word, data.len())?;
            tokens.push(decode_tail(*kind, data, offset)?);
        } else {
            tokens.push(decode_word(*kind, word)?);
        }
    }
    Ok(tokens)
}

/// Decodes a single static 32-byte word, as found in an indexed event
/// topic.
///
/// # Errors
///
/// Returns [`LaunchpadError::Abi`] for dynamic types: indexed dynamic
/// parameters are stored as hashes and cannot be recovered from the topic.
pub fn decode_word(kind: ParamType, word: &[u8; WORD]) -> Result<Token> {
    match kind {
        ParamType::Address => Ok(Token::Address(Address::from_slice(&word[12..]))),
        ParamType::Uint => Ok(Token::Uint(U256::from_be_bytes(*word))),
        ParamType::Bool => Ok(Token::Bool(word[WORD - 1] != 0)),
        ParamType::FixedBytes4 => {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&word[..4]);
            Ok(Token::FixedBytes4(bytes))
        }
        ParamType::String | ParamType::Bytes | ParamType::AddressArray | ParamType::UintArray => {
            Err(LaunchpadError::Abi("dynamic type has no word representation".to_owned()))
        }
    }
}

fn decode_tail(kind: ParamType, data: &[u8], offset: usize) -> Result<Token> {
    let length_word = read_word(data, offset)?;
    let length = word_to_usize(length_word, data.len())?;
    let start = offset + WORD;

    match kind {
        ParamType::String | ParamType::Bytes => {
            let end = start
                .checked_add(length)
                .filter(|end| *end <= data.len())
                .ok_or_else(|| LaunchpadError::Abi("byte string exceeds data bounds".to_owned()))?;
            if kind == ParamType::Bytes {
                return Ok(Token::Bytes(data[start..end].to_vec()));
            }
            let text = std::str::from_utf8(&data[start..end])
                .map_err(|e| LaunchpadError::Abi(format!("invalid UTF-8 in string: {e}")))?;
            Ok(Token::String(text.to_owned()))
        }
        ParamType::AddressArray => {
            let mut addresses = Vec::with_capacity(length);
            for index in 0..length {
                let word = read_word(data, start + index * WORD)?;
                if let Token::Address(address) = decode_word(ParamType::Address, word)? {
                    addresses.push(address);
                }
            }
            Ok(Token::AddressArray(addresses))
        }
        ParamType::UintArray => {
            let mut values = Vec::with_capacity(length);
            for index in 0..length {
                let word = read_word(data, start + index * WORD)?;
                if let Token::Uint(value) = decode_word(ParamType::Uint, word)? {
                    values.push(value);
                }
            }
            Ok(Token::UintArray(values))
        }
        _ => Err(LaunchpadError::Abi("static type decoded as tail".to_owned())),
    }
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8; WORD]> {
    data.get(offset..offset + WORD)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| LaunchpadError::Abi(format!("truncated word at offset {offset}")))
}

fn word_to_usize(word: &[u8; WORD], bound: usize) -> Result<usize> {
    let value = U256::from_be_bytes(*word);
    let value: usize = value
        .try_into()
        .map_err(|_| LaunchpadError::Abi("offset or length overflows usize".to_owned()))?;
    if value > bound {
        return Err(LaunchpadError::Abi(format!("offset or length {value} exceeds data bounds")));
    }
    Ok(value)
}
