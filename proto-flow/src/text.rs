use std::{net::IpAddr, str::FromStr};

use thiserror::Error;
use tracing::error;

use crate::{Description, FlowError, KeyFields, CLASS_ANY, INDEX_ANY, PROTOCOL_ANY};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty flow description")]
    Empty,
    #[error("Missing destination address")]
    MissingDestination,
    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),
    #[error("Invalid source address or interface name: {0:?}")]
    InvalidSource(String),
    #[error("Invalid mask length: {0:?}")]
    InvalidMask(String),
    #[error("Invalid protocol number: {0:?}")]
    InvalidProtocol(String),
    #[error("Invalid traffic class: {0:?}")]
    InvalidClass(String),
    #[error("Invalid interface index: {0:?}")]
    InvalidIndex(String),
    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),
}

/// Turns the address tokens of a flow description into addresses.
pub trait AddressResolver {
    /// Parses an address literal.
    fn parse_address(&self, text: &str) -> Option<IpAddr> {
        text.parse().ok()
    }

    /// Returns an address of the interface called `name`. Only consulted for source addresses.
    fn interface_address(&self, name: &str) -> Option<IpAddr>;
}

/// Accepts address literals only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralResolver;

impl AddressResolver for LiteralResolver {
    fn interface_address(&self, _name: &str) -> Option<IpAddr> {
        None
    }
}

/// Address literals, with interface names looked up by the closure.
impl<F> AddressResolver for F
where
    F: Fn(&str) -> Option<IpAddr>,
{
    fn interface_address(&self, name: &str) -> Option<IpAddr> {
        self(name)
    }
}

fn is_wildcard(token: &str) -> bool {
    token.starts_with(['*', 'X'])
}

/// An address token: `None` for a wildcard, else the address and its mask length.
fn parse_address(
    token: &str,
    resolve: impl FnOnce(&str) -> Option<IpAddr>,
) -> Result<Option<(Vec<u8>, u8)>, ParseError> {
    if is_wildcard(token) {
        return Ok(None);
    }

    let (literal, mask) = match token.split_once('/') {
        Some((literal, mask)) => (literal.trim(), Some(mask.trim())),
        None => (token, None),
    };
    let octets = match resolve(literal) {
        Some(IpAddr::V4(address)) => address.octets().to_vec(),
        Some(IpAddr::V6(address)) => address.octets().to_vec(),
        None => return Err(ParseError::InvalidAddress(literal.to_string())),
    };

    let bits = octets.len() * 8;
    let mask = match mask {
        None => bits as u8,
        Some(mask) => match mask.parse::<u8>() {
            Ok(value) if usize::from(value) <= bits => value,
            _ => return Err(ParseError::InvalidMask(mask.to_string())),
        },
    };
    Ok(Some((octets, mask)))
}

fn parse_protocol(token: &str) -> Result<u8, ParseError> {
    if is_wildcard(token) {
        return Ok(PROTOCOL_ANY);
    }
    match token.parse::<u8>() {
        Ok(value) if value != PROTOCOL_ANY => Ok(value),
        _ => Err(ParseError::InvalidProtocol(token.to_string())),
    }
}

/// Decimal, or hex with a `0x` prefix.
fn parse_class(token: &str) -> Result<u8, ParseError> {
    if is_wildcard(token) {
        return Ok(CLASS_ANY);
    }
    let value = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => token.parse::<u8>(),
    };
    value.map_err(|_| ParseError::InvalidClass(token.to_string()))
}

fn parse_index(token: &str) -> Result<u32, ParseError> {
    if is_wildcard(token) {
        return Ok(INDEX_ANY);
    }
    token.parse::<u32>().map_err(|_| ParseError::InvalidIndex(token.to_string()))
}

impl Description {
    /// Parses `[src[/mask]->]dst[/mask][,protocol[,class[,index]]]`.
    ///
    /// `*` or `X` wildcard a field, and trailing fields may be left out. A comma may stand in
    /// for the arrow (`src,dst,...`), and a lone token is a destination. The source may name an
    /// interface, which `resolver` looks up.
    pub fn parse_with<R: AddressResolver + ?Sized>(text: &str, resolver: &R) -> Result<Self, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        let (src, rest) = match text.split_once("->") {
            Some((src, rest)) => (Some(src.trim()), rest),
            None => match text.split_once(',') {
                Some((src, rest)) => (Some(src.trim()), rest),
                None => (None, text),
            },
        };

        let src = match src {
            None => None,
            Some("") => return Err(ParseError::InvalidSource(String::new())),
            Some(token) => parse_address(token, |literal| {
                resolver.parse_address(literal).or_else(|| resolver.interface_address(literal))
            })
            .map_err(|e| match e {
                ParseError::InvalidAddress(name) => ParseError::InvalidSource(name),
                e => e,
            })?,
        };

        let mut tokens = rest.split(',').map(str::trim);
        let dst = match tokens.next() {
            Some(token) if !token.is_empty() => parse_address(token, |literal| resolver.parse_address(literal))?,
            _ => return Err(ParseError::MissingDestination),
        };
        let protocol = tokens.next().map_or(Ok(PROTOCOL_ANY), parse_protocol)?;
        let class = tokens.next().map_or(Ok(CLASS_ANY), parse_class)?;
        let index = tokens.next().map_or(Ok(INDEX_ANY), parse_index)?;

        let (dst, dst_mask) = dst.unwrap_or_default();
        let (src, src_mask) = src.unwrap_or_default();
        let fields = KeyFields { dst: &dst, dst_mask, src: &src, src_mask, class, protocol, index };
        Ok(Self::from_fields(&fields)?)
    }

    /// Replaces the description with one parsed from `text`, accepting address literals only.
    /// See [`Description::parse_with`].
    pub fn init_from_text(&mut self, text: &str) -> Result<(), ParseError> {
        self.init_from_text_with(text, &LiteralResolver)
    }

    /// Replaces the description with one parsed from `text`. On failure the description is
    /// left unchanged.
    pub fn init_from_text_with<R: AddressResolver + ?Sized>(
        &mut self,
        text: &str,
        resolver: &R,
    ) -> Result<(), ParseError> {
        match Self::parse_with(text, resolver) {
            Ok(description) => {
                *self = description;
                Ok(())
            }
            Err(e) => {
                error!(text, error = %e, "Invalid flow description");
                Err(e)
            }
        }
    }
}

impl FromStr for Description {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, ParseError> {
        Self::parse_with(text, &LiteralResolver)
    }
}
