//! Renderers and parsers for the custom field formats (HOST, IPv4, IPv6).

use crate::error::FieldError;

/// Decode-side rendering selector for raw payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatter {
    /// Delimited hostname: non-printable bytes become `.`, outer dots are
    /// trimmed, so a DNS label image `\x06google\x03com` renders as
    /// `google.com`.
    Host,
    /// Four bytes rendered dotted-decimal.
    Ipv4,
    /// Colon-separated 16-bit hex groups, never abbreviated.
    Ipv6,
}

impl Formatter {
    pub(crate) fn render(&self, raw: &[u8]) -> String {
        match self {
            Formatter::Host => format_host(raw),
            Formatter::Ipv4 => format_ipv4(raw),
            Formatter::Ipv6 => format_ipv6(raw),
        }
    }
}

pub(crate) fn format_host(raw: &[u8]) -> String {
    let mapped: String = raw
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect();
    mapped.trim_matches('.').to_string()
}

pub(crate) fn format_ipv4(raw: &[u8]) -> String {
    raw.iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Renders the first four 16-bit groups of the address, colon-separated,
/// with no `::` contraction.
pub(crate) fn format_ipv6(raw: &[u8]) -> String {
    let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
    let end = hex.len().min(16);
    (0..end)
        .step_by(4)
        .map(|i| &hex[i..(i + 4).min(end)])
        .collect::<Vec<_>>()
        .join(":")
}

/// Parses a dotted-decimal IPv4 string into its four octets.
pub(crate) fn parse_ipv4(name: &str, addr: &str) -> Result<[u8; 4], FieldError> {
    let parts: Vec<&str> = addr.split('.').collect();
    if parts.len() != 4 {
        return Err(FieldError::InvalidAddress {
            name: name.to_string(),
            value: addr.to_string(),
            reason: "IPv4 addresses have four dotted components",
        });
    }
    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(&parts) {
        *slot = part.parse().map_err(|_| FieldError::InvalidAddress {
            name: name.to_string(),
            value: addr.to_string(),
            reason: "components must be integers between 0 and 255",
        })?;
    }
    Ok(octets)
}
