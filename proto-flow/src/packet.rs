use std::net::IpAddr;

use pnet::packet::{ipv4::Ipv4Packet, ipv6::Ipv6Packet};
use tracing::error;

use crate::{Description, Fields, FlowError, KeyFields};

/// The IP header fields a flow is classified on.
pub trait IpHeader {
    fn version(&self) -> u8;

    /// The IPv4 type of service or IPv6 traffic class byte.
    fn traffic_class(&self) -> u8;

    /// The IPv4 protocol or IPv6 next header number.
    fn protocol(&self) -> u8;

    fn source(&self) -> IpAddr;

    fn destination(&self) -> IpAddr;
}

impl IpHeader for Ipv4Packet<'_> {
    fn version(&self) -> u8 {
        self.get_version()
    }

    fn traffic_class(&self) -> u8 {
        (self.get_dscp() << 2) | self.get_ecn()
    }

    fn protocol(&self) -> u8 {
        self.get_next_level_protocol().0
    }

    fn source(&self) -> IpAddr {
        self.get_source().into()
    }

    fn destination(&self) -> IpAddr {
        self.get_destination().into()
    }
}

impl IpHeader for Ipv6Packet<'_> {
    fn version(&self) -> u8 {
        self.get_version()
    }

    fn traffic_class(&self) -> u8 {
        self.get_traffic_class()
    }

    fn protocol(&self) -> u8 {
        self.get_next_header().0
    }

    fn source(&self) -> IpAddr {
        self.get_source().into()
    }

    fn destination(&self) -> IpAddr {
        self.get_destination().into()
    }
}

/// A view of the fixed header of a raw IPv4 or IPv6 packet.
#[derive(Debug)]
pub enum IpHeaderView<'p> {
    V4(Ipv4Packet<'p>),
    V6(Ipv6Packet<'p>),
}

impl<'p> IpHeaderView<'p> {
    /// Reads the header at the start of `bytes`, dispatching on the version nibble.
    pub fn new(bytes: &'p [u8]) -> Result<Self, FlowError> {
        let first = *bytes.first().ok_or(FlowError::Truncated(0))?;
        let truncated = FlowError::Truncated(bytes.len());
        match first >> 4 {
            4 => Ipv4Packet::new(bytes).map(Self::V4).ok_or(truncated),
            6 => Ipv6Packet::new(bytes).map(Self::V6).ok_or(truncated),
            version => Err(FlowError::IpVersion(version)),
        }
    }

    fn header(&self) -> &dyn IpHeader {
        match self {
            Self::V4(packet) => packet,
            Self::V6(packet) => packet,
        }
    }
}

impl IpHeader for IpHeaderView<'_> {
    fn version(&self) -> u8 {
        self.header().version()
    }

    fn traffic_class(&self) -> u8 {
        self.header().traffic_class()
    }

    fn protocol(&self) -> u8 {
        self.header().protocol()
    }

    fn source(&self) -> IpAddr {
        self.header().source()
    }

    fn destination(&self) -> IpAddr {
        self.header().destination()
    }
}

fn octets(address: IpAddr) -> Vec<u8> {
    match address {
        IpAddr::V4(address) => address.octets().to_vec(),
        IpAddr::V6(address) => address.octets().to_vec(),
    }
}

impl Description {
    /// Sets the description to the flow of a packet, received on interface `index`, keeping only
    /// `fields`. Addresses get full-length masks and the class drops the ECN bits.
    ///
    /// Fails for IP versions other than 4 and 6, leaving the description without a key.
    pub fn init_from_pkt<H: IpHeader + ?Sized>(
        &mut self,
        header: &H,
        index: u32,
        fields: Fields,
    ) -> Result<(), FlowError> {
        let version = header.version();
        if version != 4 && version != 6 {
            error!(version, "Invalid IP version");
            *self = Self::invalid();
            return Err(FlowError::IpVersion(version));
        }

        let (dst, src) = (octets(header.destination()), octets(header.source()));
        let fields = KeyFields {
            dst: &dst,
            dst_mask: (dst.len() * 8) as u8,
            src: &src,
            src_mask: (src.len() * 8) as u8,
            class: header.traffic_class() & 0xfc,
            protocol: header.protocol(),
            index,
        }
        .select(fields);
        self.set_key(&fields)
    }

    /// Builds the description of a packet's flow. See [`Description::init_from_pkt`].
    pub fn from_packet<H: IpHeader + ?Sized>(header: &H, index: u32, fields: Fields) -> Result<Self, FlowError> {
        let mut description = Self::invalid();
        description.init_from_pkt(header, index, fields)?;
        Ok(description)
    }
}
