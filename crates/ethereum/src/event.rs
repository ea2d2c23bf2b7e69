//! Event descriptors and log decoding

use std::fmt;

use ethers::types::{Address, Filter, Log, ValueOrArray, H256, U256};
use serde_json::{json, Map, Value};

use bindery_core::{Error, Result};

use crate::abi::parser::{check_identifier, parse_param_list, split_signature};
use crate::abi::{self, AbiType, AbiValue, WORD};

/// Topic slots available to indexed parameters of a named event
pub const MAX_INDEXED: usize = 3;

/// Topic slots available to indexed parameters of an anonymous event
pub const MAX_INDEXED_ANONYMOUS: usize = 4;

/// One event parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventParam {
    pub name: String,
    pub kind: AbiType,
    pub indexed: bool,
}

impl EventParam {
    pub fn new(name: impl Into<String>, kind: AbiType, indexed: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed,
        }
    }
}

/// One contract event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventDescriptor {
    name: String,
    params: Vec<EventParam>,
    anonymous: bool,
    signature: String,
    topic: H256,
}

impl EventDescriptor {
    pub fn new(name: impl Into<String>, params: Vec<EventParam>, anonymous: bool) -> Result<Self> {
        let name = name.into();
        check_identifier(&name)?;
        for param in &params {
            param.kind.validate()?;
        }

        let indexed = params.iter().filter(|p| p.indexed).count();
        let max = if anonymous { MAX_INDEXED_ANONYMOUS } else { MAX_INDEXED };
        if indexed > max {
            return Err(Error::descriptor(format!(
                "event {} has {} indexed parameters, at most {} allowed",
                name, indexed, max
            )));
        }

        let signature = abi::signature(&name, params.iter().map(|p| &p.kind));
        let topic = abi::topic(&signature);

        Ok(Self {
            name,
            params,
            anonymous,
            signature,
            topic,
        })
    }

    /// Parse `event Name(type [indexed] [name], ...) [anonymous]`.
    pub fn parse(signature: &str) -> Result<Self> {
        let parts = split_signature(signature, "event")?;
        let anonymous = match parts.rest {
            "" => false,
            "anonymous" => true,
            other => {
                return Err(Error::descriptor(format!(
                    "unexpected '{}' after event parameters in '{}'",
                    other, signature
                )))
            }
        };
        let params = parse_param_list(parts.params)?
            .into_iter()
            .map(|p| EventParam::new(p.name, p.kind, p.indexed))
            .collect();
        Self::new(parts.name, params, anonymous)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[EventParam] {
        &self.params
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Canonical signature, e.g. `Transfer(address,address,uint256)`
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Keccak-256 of the signature. Anonymous events never emit it.
    pub fn topic(&self) -> H256 {
        self.topic
    }

    pub fn indexed_count(&self) -> usize {
        self.params.iter().filter(|p| p.indexed).count()
    }

    /// Number of topics a log of this event carries
    pub fn topic_count(&self) -> usize {
        self.indexed_count() + usize::from(!self.anonymous)
    }

    /// Decode a log given its topics and data.
    ///
    /// Indexed parameters come from the topics after the signature topic, the
    /// rest from `data`. Any mismatch fails the whole decode.
    pub fn decode_log(&self, topics: &[H256], data: &[u8]) -> Result<DecodedEvent> {
        let indexed_topics = if self.anonymous {
            topics
        } else {
            let expected = format!("{:?}", self.topic);
            match topics.first() {
                Some(first) if *first == self.topic => &topics[1..],
                Some(first) => return Err(Error::topic_mismatch(expected, Some(format!("{:?}", first)))),
                None => return Err(Error::topic_mismatch(expected, None::<String>)),
            }
        };

        if topics.len() != self.topic_count() {
            return Err(Error::decode(format!(
                "event {} expects {} topics but the log has {}",
                self.signature,
                self.topic_count(),
                topics.len()
            )));
        }

        let data_types: Vec<AbiType> = self.params.iter().filter(|p| !p.indexed).map(|p| p.kind.clone()).collect();
        let mut data_values = abi::decode(&data_types, data)
            .map_err(|e| Error::decode(format!("event {} data: {}", self.signature, e)))?
            .into_iter();
        let mut topic_values = indexed_topics.iter();

        let mut params = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let value = if param.indexed {
                let topic = topic_values
                    .next()
                    .ok_or_else(|| Error::decode(format!("missing topic for {}", param.name)))?;
                if param.kind.is_hashed_in_topic() {
                    EventArg::Hashed(*topic)
                } else {
                    EventArg::Value(abi::decode_single(&param.kind, topic.as_bytes())?)
                }
            } else {
                EventArg::Value(
                    data_values
                        .next()
                        .ok_or_else(|| Error::decode(format!("missing data value for {}", param.name)))?,
                )
            };
            params.push(DecodedParam {
                name: param.name.clone(),
                indexed: param.indexed,
                value,
            });
        }

        Ok(DecodedEvent {
            name: self.name.clone(),
            signature: self.signature.clone(),
            params,
            address: None,
            block_number: None,
            transaction_hash: None,
            log_index: None,
        })
    }

    /// Decode an RPC log, keeping its position metadata.
    pub fn decode(&self, log: &Log) -> Result<DecodedEvent> {
        let mut event = self.decode_log(&log.topics, &log.data)?;
        event.address = Some(log.address);
        event.block_number = log.block_number.map(|n| n.as_u64());
        event.transaction_hash = log.transaction_hash;
        event.log_index = match log.log_index {
            Some(index) if index > U256::from(u64::MAX) => {
                return Err(Error::decode(format!("log index {} does not fit in u64", index)))
            }
            index => index.map(|i| i.low_u64()),
        };
        Ok(event)
    }

    /// Topic for one indexed argument value.
    ///
    /// Static values are their ABI word; `string` and `bytes` are hashed.
    /// Arrays and tuples cannot be filtered on.
    pub fn topic_for(&self, kind: &AbiType, value: &AbiValue) -> Result<H256> {
        if value.abi_type() != *kind {
            return Err(Error::encode(format!(
                "filter value of type {} for indexed parameter of type {}",
                value.abi_type(),
                kind
            )));
        }
        match value {
            AbiValue::String(s) => Ok(H256::from(abi::keccak256(s.as_bytes()))),
            AbiValue::Bytes(b) => Ok(H256::from(abi::keccak256(b))),
            _ if kind.is_hashed_in_topic() => Err(Error::encode(format!(
                "cannot build a topic filter for indexed {} parameters",
                kind
            ))),
            _ => {
                let word = abi::encode_single(value)?;
                Ok(H256::from_slice(&word[..WORD]))
            }
        }
    }

    /// Log filter for this event at `address`, optionally constrained on indexed
    /// arguments (in declared order, `None` matches anything).
    pub fn filter(&self, address: Address, indexed: &[Option<AbiValue>]) -> Result<Filter> {
        let indexed_params: Vec<&EventParam> = self.params.iter().filter(|p| p.indexed).collect();
        if indexed.len() > indexed_params.len() {
            return Err(Error::encode(format!(
                "event {} has {} indexed parameters but {} filter values were given",
                self.signature,
                indexed_params.len(),
                indexed.len()
            )));
        }

        let mut filter = Filter::new().address(address);
        let offset = usize::from(!self.anonymous);
        if !self.anonymous {
            filter.topics[0] = Some(ValueOrArray::Value(Some(self.topic)));
        }
        for (i, (param, value)) in indexed_params.iter().zip(indexed).enumerate() {
            if let Some(value) = value {
                let topic = self.topic_for(&param.kind, value)?;
                filter.topics[offset + i] = Some(ValueOrArray::Value(Some(topic)));
            }
        }
        Ok(filter)
    }
}

impl fmt::Display for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let mut s = p.kind.canonical();
                if p.indexed {
                    s.push_str(" indexed");
                }
                if !p.name.is_empty() {
                    s.push(' ');
                    s.push_str(&p.name);
                }
                s
            })
            .collect();
        write!(f, "event {}({})", self.name, params.join(", "))?;
        if self.anonymous {
            write!(f, " anonymous")?;
        }
        Ok(())
    }
}

/// A decoded event argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventArg {
    Value(AbiValue),
    /// Keccak-256 of an indexed dynamic value; the value itself is not recoverable
    Hashed(H256),
}

impl EventArg {
    pub fn value(&self) -> Option<&AbiValue> {
        match self {
            EventArg::Value(value) => Some(value),
            EventArg::Hashed(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            EventArg::Value(value) => value.to_json(),
            EventArg::Hashed(hash) => json!({ "hash": format!("{:?}", hash) }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedParam {
    pub name: String,
    pub indexed: bool,
    pub value: EventArg,
}

/// A decoded log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub name: String,
    pub signature: String,
    /// Arguments in declared order
    pub params: Vec<DecodedParam>,
    pub address: Option<Address>,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<H256>,
    pub log_index: Option<u64>,
}

impl DecodedEvent {
    /// Argument by parameter name
    pub fn get(&self, name: &str) -> Option<&EventArg> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Decoded value by parameter name, `None` for hashed or unknown parameters
    pub fn value(&self, name: &str) -> Option<&AbiValue> {
        self.get(name).and_then(EventArg::value)
    }

    pub fn to_json(&self) -> Value {
        let mut args = Map::new();
        for (i, param) in self.params.iter().enumerate() {
            let key = if param.name.is_empty() { i.to_string() } else { param.name.clone() };
            args.insert(key, param.value.to_json());
        }

        let mut out = json!({
            "event": self.name,
            "signature": self.signature,
            "args": args,
        });
        if let Some(address) = self.address {
            out["address"] = json!(format!("{:?}", address));
        }
        if let Some(block) = self.block_number {
            out["blockNumber"] = json!(block);
        }
        if let Some(hash) = self.transaction_hash {
            out["transactionHash"] = json!(format!("{:?}", hash));
        }
        if let Some(index) = self.log_index {
            out["logIndex"] = json!(index);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Bytes, U64};

    fn transfer_event() -> EventDescriptor {
        EventDescriptor::parse("event Transfer(address indexed from, address indexed to, uint256 value)").unwrap()
    }

    fn address_topic(address: Address) -> H256 {
        H256::from(address)
    }

    fn uint_word(value: u64) -> Vec<u8> {
        abi::encode_single(&AbiValue::uint256(value)).unwrap()
    }

    #[test]
    fn test_transfer_topic() {
        assert_eq!(
            format!("{:?}", transfer_event().topic()),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_decode_transfer_log() {
        let event = transfer_event();
        let from = Address::from_low_u64_be(1);
        let to = Address::from_low_u64_be(2);
        let topics = vec![event.topic(), address_topic(from), address_topic(to)];

        let decoded = event.decode_log(&topics, &uint_word(500)).unwrap();
        assert_eq!(decoded.name, "Transfer");
        assert_eq!(decoded.value("from"), Some(&AbiValue::Address(from)));
        assert_eq!(decoded.value("to"), Some(&AbiValue::Address(to)));
        assert_eq!(decoded.value("value").and_then(AbiValue::as_uint), Some(U256::from(500)));
        assert!(decoded.params[0].indexed && !decoded.params[2].indexed);
    }

    #[test]
    fn test_wrong_first_topic_is_topic_mismatch() {
        let event = transfer_event();
        let topics = vec![H256::repeat_byte(0x11), H256::zero(), H256::zero()];
        assert!(matches!(
            event.decode_log(&topics, &uint_word(1)),
            Err(Error::TopicMismatch { found: Some(_), .. })
        ));
        assert!(matches!(
            event.decode_log(&[], &uint_word(1)),
            Err(Error::TopicMismatch { found: None, .. })
        ));
    }

    #[test]
    fn test_missing_topics_or_data_fail() {
        let event = transfer_event();
        let topics = vec![event.topic(), H256::zero()];
        assert!(matches!(event.decode_log(&topics, &uint_word(1)), Err(Error::Decode(_))));

        let topics = vec![event.topic(), H256::zero(), H256::zero()];
        assert!(matches!(event.decode_log(&topics, &[0u8; 16]), Err(Error::Decode(_))));
    }

    #[test]
    fn test_indexed_dynamic_values_are_hashed() {
        let event = EventDescriptor::parse("event Registered(string indexed name, uint8[] indexed ids, bytes data)").unwrap();
        let name_hash = H256::from(abi::keccak256("alice"));
        let ids_hash = H256::repeat_byte(0x42);
        let data = abi::encode(&[AbiValue::Bytes(vec![7])]).unwrap();

        let decoded = event.decode_log(&[event.topic(), name_hash, ids_hash], &data).unwrap();
        assert_eq!(decoded.get("name"), Some(&EventArg::Hashed(name_hash)));
        assert_eq!(decoded.get("ids"), Some(&EventArg::Hashed(ids_hash)));
        assert_eq!(decoded.value("data"), Some(&AbiValue::Bytes(vec![7])));
    }

    #[test]
    fn test_indexed_limits() {
        let four = "(address indexed a, address indexed b, address indexed c, address indexed d)";
        assert!(EventDescriptor::parse(&format!("event Four{}", four)).is_err());

        let anonymous = EventDescriptor::parse(&format!("event Four{} anonymous", four)).unwrap();
        assert_eq!(anonymous.topic_count(), 4);

        let topics: Vec<H256> = (1..=4).map(|i| address_topic(Address::from_low_u64_be(i))).collect();
        let decoded = anonymous.decode_log(&topics, &[]).unwrap();
        assert_eq!(decoded.value("d"), Some(&AbiValue::Address(Address::from_low_u64_be(4))));
    }

    #[test]
    fn test_filter_topics() {
        let event = transfer_event();
        let to = Address::from_low_u64_be(2);
        let filter = event
            .filter(Address::from_low_u64_be(9), &[None, Some(AbiValue::Address(to))])
            .unwrap();

        assert_eq!(filter.topics[0], Some(ValueOrArray::Value(Some(event.topic()))));
        assert_eq!(filter.topics[1], None);
        assert_eq!(filter.topics[2], Some(ValueOrArray::Value(Some(address_topic(to)))));

        assert!(event.filter(Address::zero(), &[None, None, None]).is_err());
        assert!(event.filter(Address::zero(), &[Some(AbiValue::Bool(true))]).is_err());
    }

    #[test]
    fn test_string_filter_is_hashed() {
        let event = EventDescriptor::parse("event Named(string indexed name)").unwrap();
        let topic = event.topic_for(&AbiType::String, &AbiValue::from("alice")).unwrap();
        assert_eq!(topic, H256::from(abi::keccak256("alice")));
    }

    #[test]
    fn test_decode_keeps_log_metadata() {
        let event = EventDescriptor::parse("event Ping()").unwrap();
        let mut log = Log {
            address: Address::from_low_u64_be(7),
            topics: vec![event.topic()],
            data: Bytes::new(),
            block_number: Some(U64::from(11u64)),
            log_index: Some(U256::from(4u64)),
            ..Default::default()
        };

        let decoded = event.decode(&log).unwrap();
        assert_eq!(decoded.address, Some(Address::from_low_u64_be(7)));
        assert_eq!(decoded.block_number, Some(11));
        assert_eq!(decoded.log_index, Some(4));

        // A node reporting an index past u64 gets an error, not a panic
        log.log_index = Some(U256::MAX);
        assert!(matches!(event.decode(&log), Err(Error::Decode(_))));
    }
}
