//! Event log extraction from transaction receipts.
//!
//! After a transaction is mined, the emitted parameters live in the
//! receipt's logs alongside logs from unrelated contracts and events. This
//! module decodes each log against a known event descriptor and takes the
//! first success; per-log decode misses are expected and skipped silently.
//! When no log matches at all, extraction returns `None` and the caller
//! falls back to a state query (for property launches: the count-indexed
//! getter on the factory).

use alloy_primitives::B256;
use tracing::trace;

use crate::chain::abi::{self, ParamType, Token};
use crate::chain::rpc::{LogEntry, TransactionReceipt};

/// One event parameter: name, ABI type, and whether it is indexed.
#[derive(Debug, Clone, Copy)]
pub struct EventParam {
    /// Parameter name as declared in the event.
    pub name: &'static str,
    /// ABI type.
    pub kind: ParamType,
    /// Indexed parameters are carried in topics, the rest in log data.
    pub indexed: bool,
}

/// A known event shape to decode logs against.
#[derive(Debug, Clone, Copy)]
pub struct EventDescriptor {
    /// Canonical signature, e.g. `Transfer(address,address,uint256)`.
    pub signature: &'static str,
    /// Parameters in declaration order.
    pub params: &'static [EventParam],
}

impl EventDescriptor {
    /// Returns the topic-0 hash identifying this event.
    #[must_use]
    pub fn topic(&self) -> B256 {
        abi::event_topic(self.signature)
    }
}

/// The factory's `PropertyLaunched` event.
pub const PROPERTY_LAUNCHED: EventDescriptor = EventDescriptor {
    signature: "PropertyLaunched(address,address,string,string,uint256)",
    params: &[
        EventParam { name: "propertyContract", kind: ParamType::Address, indexed: true },
        EventParam { name: "issuer", kind: ParamType::Address, indexed: true },
        EventParam { name: "assetName", kind: ParamType::String, indexed: false },
        EventParam { name: "assetType", kind: ParamType::String, indexed: false },
        EventParam { name: "propertyId", kind: ParamType::Uint, indexed: true },
    ],
};

/// A successfully decoded event occurrence.
#[derive(Debug, Clone)]
pub struct DecodedEvent {
    args: Vec<(&'static str, Token)>,
}

impl DecodedEvent {
    /// Returns the named argument, if the event declares it.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&Token> {
        self.args.iter().find(|(n, _)| *n == name).map(|(_, token)| token)
    }
}

/// Attempts to decode a single log against an event descriptor.
///
/// Returns `None` on any mismatch — wrong topic, wrong topic count,
/// malformed data. A mismatch is not an error: most logs in a receipt
/// belong to other events.
#[must_use]
pub fn decode_log(log: &LogEntry, event: &EventDescriptor) -> Option<DecodedEvent> {
    if log.topics.first() != Some(&event.topic()) {
        return None;
    }

    let indexed_count = event.params.iter().filter(|p| p.indexed).count();
    if log.topics.len() != indexed_count + 1 {
        return None;
    }

    let data_kinds: Vec<ParamType> =
        event.params.iter().filter(|p| !p.indexed).map(|p| p.kind).collect();
    let data_tokens = abi::decode(&data_kinds, &log.data).ok()?;

    let mut topics = log.topics.iter().skip(1);
    let mut data_tokens = data_tokens.into_iter();
    let mut args = Vec::with_capacity(event.params.len());
    for param in event.params {
        let token = if param.indexed {
            abi::decode_word(param.kind, &topics.next()?.0).ok()?
        } else {
            data_tokens.next()?
        };
        args.push((param.name, token));
    }

    Some(DecodedEvent { args })
}

/// Extracts a named argument of `event` from the first matching log in the
/// receipt.
///
/// Logs are tried in order; the first successful decode wins regardless of
/// how many unrelated logs surround it. Returns `None` when nothing
/// decodes — callers apply their fallback query path rather than treating
/// this as fatal.
#[must_use]
pub fn extract_event_arg(
    receipt: &TransactionReceipt,
    event: &EventDescriptor,
    arg_name: &str,
) -> Option<Token> {
    for log in &receipt.logs {
        if let Some(decoded) = decode_log(log, event) {
            return decoded.arg(arg_name).cloned();
        }
        trace!(address = %log.address, "log did not match event, skipping");
    }
    None
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, Bytes, U256};

    use super::*;
    use crate::chain::abi::encode;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn word_of(address: Address) -> B256 {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(address.as_slice());
        B256::from(word)
    }

    fn property_launched_log(property: Address, issuer: Address, id: u64) -> LogEntry {
        LogEntry {
            address: addr(0xfa),
            topics: vec![
                PROPERTY_LAUNCHED.topic(),
                word_of(property),
                word_of(issuer),
                B256::from(U256::from(id).to_be_bytes::<32>()),
            ],
            data: Bytes::from(encode(&[
                Token::String("Harbor Tower".to_owned()),
                Token::String("Real Estate".to_owned()),
            ])),
        }
    }

    fn unrelated_log(topic_byte: u8) -> LogEntry {
        LogEntry {
            address: addr(0x55),
            topics: vec![B256::from([topic_byte; 32])],
            data: Bytes::from(vec![0u8; 32]),
        }
    }

    fn receipt_with(logs: Vec<LogEntry>) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: B256::from([0x11; 32]),
            status: Some(alloy_primitives::U64::from(1)),
            block_number: None,
            gas_used: None,
            contract_address: None,
            logs,
        }
    }

    #[test]
    fn test_decode_matching_log() {
        let log = property_launched_log(addr(0xaa), addr(0xbb), 7);
        let decoded = decode_log(&log, &PROPERTY_LAUNCHED).unwrap();
        assert_eq!(decoded.arg("propertyContract").unwrap().as_address(), Some(addr(0xaa)));
        assert_eq!(decoded.arg("issuer").unwrap().as_address(), Some(addr(0xbb)));
        assert_eq!(decoded.arg("propertyId").unwrap().as_uint(), Some(U256::from(7u64)));
        assert_eq!(decoded.arg("assetName").unwrap().as_str(), Some("Harbor Tower"));
        assert_eq!(decoded.arg("assetType").unwrap().as_str(), Some("Real Estate"));
    }

    #[test]
    fn test_decode_wrong_topic_is_miss() {
        let log = unrelated_log(0x01);
        assert!(decode_log(&log, &PROPERTY_LAUNCHED).is_none());
    }

    #[test]
    fn test_decode_wrong_topic_count_is_miss() {
        let mut log = property_launched_log(addr(0xaa), addr(0xbb), 1);
        log.topics.pop();
        assert!(decode_log(&log, &PROPERTY_LAUNCHED).is_none());
    }

    #[test]
    fn test_decode_malformed_data_is_miss() {
        let mut log = property_launched_log(addr(0xaa), addr(0xbb), 1);
        log.data = Bytes::from(vec![0u8; 8]);
        assert!(decode_log(&log, &PROPERTY_LAUNCHED).is_none());
    }

    #[test]
    fn test_extract_finds_match_among_unrelated_logs_any_order() {
        let target = property_launched_log(addr(0xcc), addr(0xdd), 3);

        for position in 0..3 {
            let mut logs =
                vec![unrelated_log(0x01), unrelated_log(0x02)];
            logs.insert(position, target.clone());
            let receipt = receipt_with(logs);

            let token =
                extract_event_arg(&receipt, &PROPERTY_LAUNCHED, "propertyContract").unwrap();
            assert_eq!(token.as_address(), Some(addr(0xcc)));
        }
    }

    #[test]
    fn test_extract_no_match_returns_none() {
        let receipt = receipt_with(vec![unrelated_log(0x01), unrelated_log(0x02)]);
        assert!(extract_event_arg(&receipt, &PROPERTY_LAUNCHED, "propertyContract").is_none());
    }

    #[test]
    fn test_extract_empty_receipt_returns_none() {
        let receipt = receipt_with(Vec::new());
        assert!(extract_event_arg(&receipt, &PROPERTY_LAUNCHED, "propertyContract").is_none());
    }

    #[test]
    fn test_extract_unknown_arg_name() {
        let receipt = receipt_with(vec![property_launched_log(addr(0xaa), addr(0xbb), 1)]);
        assert!(extract_event_arg(&receipt, &PROPERTY_LAUNCHED, "missingArg").is_none());
    }
}
