use std::{fmt, net::Ipv6Addr};

use crate::error::AddressError;

/// An IPv6 address represented as the eight 16-bit quartets the wire and
/// display forms both operate on, rather than the platform's opaque
/// `in6_addr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv6Address([u16; 8]);

impl Ipv6Address {
    /// Builds an address from eight quartets. Each must fit in 16 bits;
    /// `u32` is accepted purely so a caller's out-of-range literal can be
    /// rejected instead of silently truncated.
    pub fn new(quartets: [u32; 8]) -> Result<Self, AddressError> {
        let mut out = [0u16; 8];
        for (position, &value) in quartets.iter().enumerate() {
            if value > u16::MAX as u32 {
                return Err(AddressError::QuartetOutOfRange { position, value });
            }
            out[position] = value as u16;
        }
        Ok(Self(out))
    }

    pub const LOCALHOST: Ipv6Address = Ipv6Address([0, 0, 0, 0, 0, 0, 0, 1]);

    pub fn quartets(&self) -> [u16; 8] {
        self.0
    }
}

impl fmt::Display for Ipv6Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self.0.iter().map(|q| format!("{q:04X}")).collect();
        write!(f, "{}", groups.join(":"))
    }
}

impl From<Ipv6Address> for Ipv6Addr {
    fn from(addr: Ipv6Address) -> Self {
        let [a, b, c, d, e, f, g, h] = addr.0;
        Ipv6Addr::new(a, b, c, d, e, f, g, h)
    }
}

impl From<Ipv6Addr> for Ipv6Address {
    fn from(addr: Ipv6Addr) -> Self {
        Self(addr.segments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localhost_displays_as_eight_groups() {
        assert_eq!(Ipv6Address::LOCALHOST.to_string(), "0000:0000:0000:0000:0000:0000:0000:0001");
    }

    #[test]
    fn rejects_out_of_range_quartet() {
        let mut quartets = [0u32; 8];
        quartets[3] = 1 << 20;
        assert_eq!(
            Ipv6Address::new(quartets),
            Err(AddressError::QuartetOutOfRange { position: 3, value: 1 << 20 })
        );
    }
}
