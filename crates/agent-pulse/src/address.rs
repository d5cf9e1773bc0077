//! Address extraction and normalization for candidate agents.
//!
//! Agents arrive in many shapes: a bare address string, a key-value map, or
//! a caller-defined type. All of them go through [`AgentAddress`].

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::types::{PulseError, PulseResult};

/// Field names probed for an address, in priority order.
pub const ADDRESS_KEYS: [&str; 5] = [
    "address",
    "wallet_address",
    "walletAddress",
    "agent_address",
    "agentAddress",
];

/// Trim and lowercase an address, keeping a `0x` prefix as lowercase `0x`.
pub fn normalize_address(raw: &str) -> PulseResult<String> {
    let address = raw.trim();
    if address.is_empty() {
        return Err(PulseError::invalid("empty address"));
    }
    match address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
    {
        Some(rest) => Ok(format!("0x{}", rest.to_lowercase())),
        None => Ok(address.to_lowercase()),
    }
}

/// Anything that can name the on-chain address of an agent.
///
/// Caller types usually implement only [`AgentAddress::address_field`],
/// returning the value of whichever of [`ADDRESS_KEYS`] they carry:
///
/// ```
/// use agent_pulse::AgentAddress;
///
/// struct Candidate {
///     name: String,
///     wallet_address: String,
/// }
///
/// impl AgentAddress for Candidate {
///     fn address_field(&self, name: &str) -> Option<&str> {
///         match name {
///             "wallet_address" => Some(&self.wallet_address),
///             _ => None,
///         }
///     }
/// }
///
/// let c = Candidate { name: "alice".into(), wallet_address: "0xABC".into() };
/// assert_eq!(c.extract_address().unwrap(), "0xabc");
/// ```
pub trait AgentAddress {
    /// Raw value of the named address field, if this agent has one.
    fn address_field(&self, _name: &str) -> Option<&str> {
        None
    }

    /// The normalized address of this agent.
    ///
    /// The default probes [`ADDRESS_KEYS`] in order and normalizes the first
    /// non-blank value.
    fn extract_address(&self) -> PulseResult<String> {
        ADDRESS_KEYS
            .iter()
            .filter_map(|key| self.address_field(key))
            .find(|value| !value.trim().is_empty())
            .map(normalize_address)
            .unwrap_or_else(|| {
                Err(PulseError::invalid(
                    "could not extract an address from agent; provide a string address, \
                     a map with an \"address\" key, or a type exposing address/wallet_address",
                ))
            })
    }
}

impl AgentAddress for str {
    fn extract_address(&self) -> PulseResult<String> {
        normalize_address(self)
    }
}

impl AgentAddress for String {
    fn extract_address(&self) -> PulseResult<String> {
        normalize_address(self)
    }
}

impl<V: AsRef<str>, S: BuildHasher> AgentAddress for HashMap<String, V, S> {
    fn address_field(&self, name: &str) -> Option<&str> {
        self.get(name).map(AsRef::as_ref)
    }
}

impl<V: AsRef<str>> AgentAddress for BTreeMap<String, V> {
    fn address_field(&self, name: &str) -> Option<&str> {
        self.get(name).map(AsRef::as_ref)
    }
}

impl AgentAddress for Map<String, Value> {
    fn address_field(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }
}

impl AgentAddress for Value {
    fn address_field(&self, name: &str) -> Option<&str> {
        self.as_object().and_then(|map| map.address_field(name))
    }

    fn extract_address(&self) -> PulseResult<String> {
        match self {
            Value::String(s) => normalize_address(s),
            Value::Object(map) => map.extract_address(),
            other => Err(PulseError::invalid(format!(
                "could not extract an address from JSON value: {other}"
            ))),
        }
    }
}

macro_rules! forward_agent_address {
    ($($wrapper:ty),* $(,)?) => {
        $(
            impl<T: AgentAddress + ?Sized> AgentAddress for $wrapper {
                fn address_field(&self, name: &str) -> Option<&str> {
                    (**self).address_field(name)
                }

                fn extract_address(&self) -> PulseResult<String> {
                    (**self).extract_address()
                }
            }
        )*
    };
}

forward_agent_address!(&T, &mut T, Box<T>, Rc<T>, Arc<T>);
