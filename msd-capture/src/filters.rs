//! BPF filter builders for management traffic
//!
//! The RMU core only sees frames that already passed these filters, so the
//! EtherType and target-device checks happen in the kernel.

use msd_core::{FramingMode, MacAddr};
use msd_packet::DsaFraming;

/// Filter on the configured EDSA EtherType
pub fn edsa_filter(ether_type: u16) -> String {
    format!("ether proto 0x{:04x}", ether_type)
}

/// Filter on the device nibble of the DSA tag
pub fn dsa_device_filter(framing: &DsaFraming, device: u8) -> String {
    format!(
        "(ether[{}] & 0x1f) == {}",
        framing.tag_offset(),
        device & 0x1f
    )
}

/// Complete filter for RMU responses from `device`
pub fn rmu_filter(framing: &DsaFraming, device: u8) -> String {
    match framing.mode() {
        FramingMode::EtherTypeDsa => combine_filters(&[
            &edsa_filter(framing.ether_type()),
            &dsa_device_filter(framing, device),
        ]),
        FramingMode::Dsa => dsa_device_filter(framing, device),
    }
}

/// RMU responses from `device` addressed to `host`
///
/// Requests leaving `host` carry the same tag, so they are excluded by source.
pub fn rmu_response_filter(framing: &DsaFraming, device: u8, host: &MacAddr) -> String {
    combine_filters(&[
        &rmu_filter(framing, device),
        &dst_mac_filter(host),
        &not_filter(&src_mac_filter(host)),
    ])
}

/// Filter for a specific source MAC address
pub fn src_mac_filter(mac: &MacAddr) -> String {
    format!("ether src {}", mac)
}

/// Filter for a specific destination MAC address
pub fn dst_mac_filter(mac: &MacAddr) -> String {
    format!("ether dst {}", mac)
}

/// Combine multiple filters with AND logic
pub fn combine_filters(filters: &[&str]) -> String {
    if filters.is_empty() {
        return String::new();
    }

    filters
        .iter()
        .map(|f| format!("({})", f))
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Negate a filter
pub fn not_filter(filter: &str) -> String {
    format!("not ({})", filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edsa_filter() {
        assert_eq!(edsa_filter(0xDADA), "ether proto 0xdada");
    }

    #[test]
    fn test_rmu_filter_edsa() {
        let framing = DsaFraming::new(FramingMode::EtherTypeDsa, 0xDADA);
        assert_eq!(
            rmu_filter(&framing, 3),
            "(ether proto 0xdada) and ((ether[16] & 0x1f) == 3)"
        );
    }

    #[test]
    fn test_rmu_filter_dsa() {
        let framing = DsaFraming::new(FramingMode::Dsa, 0);
        assert_eq!(rmu_filter(&framing, 0x21), "(ether[12] & 0x1f) == 1");
    }

    #[test]
    fn test_mac_filters() {
        let mac = MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(src_mac_filter(&mac), "ether src aa:bb:cc:dd:ee:ff");
        assert_eq!(dst_mac_filter(&mac), "ether dst aa:bb:cc:dd:ee:ff");
        assert_eq!(
            not_filter(&src_mac_filter(&mac)),
            "not (ether src aa:bb:cc:dd:ee:ff)"
        );
    }

    #[test]
    fn test_rmu_response_filter() {
        let host = MacAddr([0x02, 0, 0, 0, 0, 0x01]);
        let framing = DsaFraming::new(FramingMode::Dsa, 0);
        assert_eq!(
            rmu_response_filter(&framing, 2, &host),
            "((ether[12] & 0x1f) == 2) and (ether dst 02:00:00:00:00:01) \
             and (not (ether src 02:00:00:00:00:01))"
        );
    }

    #[test]
    fn test_combine_filters() {
        assert_eq!(combine_filters(&["a", "b"]), "(a) and (b)");
        assert_eq!(combine_filters(&[]), "");
    }
}
