//! Descriptor set of one contract

use std::path::Path;
use std::sync::Arc;

use ethers::types::{Log, TransactionReceipt, H256};
use tracing::warn;

use bindery_core::{Error, Result};

use crate::abi::AbiParser;
use crate::event::{DecodedEvent, EventDescriptor};
use crate::function::{ConstructorDescriptor, FunctionDescriptor};
use crate::revert::{decode_revert_reason, ErrorDescriptor};

/// Functions, events, errors and constructor of one contract.
///
/// Functions may be overloaded; look them up by full signature when a name is
/// ambiguous.
#[derive(Debug, Clone, Default)]
pub struct ContractAbi {
    constructor: Option<ConstructorDescriptor>,
    functions: Vec<Arc<FunctionDescriptor>>,
    events: Vec<Arc<EventDescriptor>>,
    errors: Vec<ErrorDescriptor>,
}

impl ContractAbi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON ABI file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        AbiParser::new().parse_file(path)
    }

    /// Parse JSON ABI content
    pub fn from_json(content: &str) -> Result<Self> {
        AbiParser::new().parse_content(content)
    }

    /// Build from human-readable signatures
    pub fn from_signatures<S: AsRef<str>>(signatures: &[S]) -> Result<Self> {
        AbiParser::new().parse_signatures(signatures)
    }

    pub fn set_constructor(&mut self, constructor: ConstructorDescriptor) {
        self.constructor = Some(constructor);
    }

    /// Add a function; a function with the same signature is replaced.
    pub fn add_function(&mut self, function: FunctionDescriptor) {
        self.functions.retain(|f| f.signature() != function.signature());
        self.functions.push(Arc::new(function));
    }

    pub fn add_event(&mut self, event: EventDescriptor) {
        self.events.retain(|e| e.signature() != event.signature() || e.is_anonymous() != event.is_anonymous());
        self.events.push(Arc::new(event));
    }

    pub fn add_error(&mut self, error: ErrorDescriptor) {
        self.errors.retain(|e| e.signature() != error.signature());
        self.errors.push(error);
    }

    pub fn constructor(&self) -> Option<&ConstructorDescriptor> {
        self.constructor.as_ref()
    }

    pub fn functions(&self) -> &[Arc<FunctionDescriptor>] {
        &self.functions
    }

    pub fn events(&self) -> &[Arc<EventDescriptor>] {
        &self.events
    }

    pub fn errors(&self) -> &[ErrorDescriptor] {
        &self.errors
    }

    /// Look up a function by name, or by canonical signature when the name is overloaded.
    pub fn function(&self, name_or_signature: &str) -> Result<&Arc<FunctionDescriptor>> {
        lookup(
            &self.functions,
            name_or_signature,
            "function",
            |f| f.name(),
            |f| f.signature(),
        )
    }

    pub fn function_by_selector(&self, selector: [u8; 4]) -> Option<&Arc<FunctionDescriptor>> {
        self.functions.iter().find(|f| f.selector() == selector)
    }

    /// Look up an event by name or canonical signature.
    pub fn event(&self, name_or_signature: &str) -> Result<&Arc<EventDescriptor>> {
        lookup(&self.events, name_or_signature, "event", |e| e.name(), |e| e.signature())
    }

    pub fn event_by_topic(&self, topic: H256) -> Option<&Arc<EventDescriptor>> {
        self.events.iter().find(|e| !e.is_anonymous() && e.topic() == topic)
    }

    /// Pick the event a log belongs to: by primary topic first, then by the one
    /// anonymous event whose topic count matches.
    pub fn find_event_for_log(&self, topics: &[H256]) -> Option<&Arc<EventDescriptor>> {
        if let Some(event) = topics.first().and_then(|t| self.event_by_topic(*t)) {
            return Some(event);
        }

        let mut candidates = self
            .events
            .iter()
            .filter(|e| e.is_anonymous() && e.topic_count() == topics.len());
        match (candidates.next(), candidates.next()) {
            (Some(event), None) => Some(event),
            _ => None,
        }
    }

    /// Decode a log with whichever event it belongs to.
    pub fn decode_log(&self, log: &Log) -> Result<DecodedEvent> {
        let event = self.find_event_for_log(&log.topics).ok_or_else(|| {
            Error::topic_mismatch(
                "an event declared by the contract".to_string(),
                log.topics.first().map(|t| format!("{:?}", t)),
            )
        })?;
        event.decode(log)
    }

    /// Decode every log in a receipt that this ABI declares.
    ///
    /// When `address` is given only logs emitted by it are considered. Logs
    /// that match no event are skipped; a matching log that fails to decode is
    /// an error.
    pub fn decode_receipt(
        &self,
        receipt: &TransactionReceipt,
        address: Option<ethers::types::Address>,
    ) -> Result<Vec<DecodedEvent>> {
        let mut events = Vec::new();
        for log in &receipt.logs {
            if address.map_or(false, |a| a != log.address) {
                continue;
            }
            match self.find_event_for_log(&log.topics) {
                Some(event) => events.push(event.decode(log)?),
                None => warn!(
                    tx = ?receipt.transaction_hash,
                    log_index = ?log.log_index,
                    "Skipping log with no matching event"
                ),
            }
        }
        Ok(events)
    }

    /// Human-readable reason for revert data, consulting the declared errors.
    pub fn revert_reason(&self, data: &[u8]) -> String {
        decode_revert_reason(data, &self.errors)
    }
}

fn lookup<'a, T>(
    items: &'a [Arc<T>],
    key: &str,
    kind: &str,
    name: impl Fn(&T) -> &str,
    signature: impl Fn(&T) -> &str,
) -> Result<&'a Arc<T>> {
    if key.contains('(') {
        // Accept non-canonical spellings such as `uint` by normalizing through the type parser
        let wanted = normalize_signature(key)?;
        return items
            .iter()
            .find(|item| signature(item.as_ref()) == wanted)
            .ok_or_else(|| Error::descriptor(format!("unknown {} '{}'", kind, key)));
    }

    let mut matches = items.iter().filter(|item| name(item.as_ref()) == key);
    match (matches.next(), matches.next()) {
        (Some(item), None) => Ok(item),
        (None, _) => Err(Error::descriptor(format!("unknown {} '{}'", kind, key))),
        (Some(_), Some(_)) => Err(Error::descriptor(format!(
            "{} '{}' is overloaded; use its full signature",
            kind, key
        ))),
    }
}

fn normalize_signature(signature: &str) -> Result<String> {
    let parts = crate::abi::parser::split_signature(signature, "")?;
    let params = crate::abi::parser::parse_param_list(parts.params)?;
    Ok(crate::abi::signature(parts.name, params.iter().map(|p| &p.kind)))
}
