//! Interrupt endpoint pair matching

use crate::descriptor::AltSetting;

/// Reader (interrupt IN) and writer (interrupt OUT) endpoint addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointPair {
    pub reader: u8,
    pub writer: u8,
}

/// Decide whether an alternate setting exposes a raw interrupt interface
///
/// Returns the matched pair when the setting has both an interrupt IN and an
/// interrupt OUT endpoint. When several endpoints of one direction qualify,
/// the last one in descriptor order is kept.
pub fn classify(alt: &AltSetting) -> Option<EndpointPair> {
    let mut reader = None;
    let mut writer = None;

    for endpoint in alt.endpoints.iter().filter(|ep| ep.is_interrupt()) {
        if endpoint.is_in() {
            reader = Some(endpoint.address);
        } else {
            writer = Some(endpoint.address);
        }
    }

    Some(EndpointPair {
        reader: reader?,
        writer: writer?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::EndpointDescriptor;
    use proptest::prelude::*;

    const BULK: u8 = 0x02;
    const INTERRUPT: u8 = 0x03;

    fn alt(endpoints: &[(u8, u8)]) -> AltSetting {
        AltSetting {
            setting: 0,
            class_code: 0xff,
            endpoints: endpoints
                .iter()
                .map(|&(address, attributes)| EndpointDescriptor {
                    address,
                    attributes,
                })
                .collect(),
        }
    }

    #[test]
    fn test_interrupt_pair_matches() {
        let pair = classify(&alt(&[(0x81, INTERRUPT), (0x01, INTERRUPT)]));
        assert_eq!(
            pair,
            Some(EndpointPair {
                reader: 0x81,
                writer: 0x01
            })
        );
    }

    #[test]
    fn test_bulk_pair_does_not_match() {
        assert_eq!(classify(&alt(&[(0x81, BULK), (0x01, BULK)])), None);
    }

    #[test]
    fn test_missing_writer_does_not_match() {
        assert_eq!(classify(&alt(&[(0x81, INTERRUPT)])), None);
    }

    #[test]
    fn test_missing_reader_does_not_match() {
        assert_eq!(classify(&alt(&[(0x02, INTERRUPT), (0x82, BULK)])), None);
    }

    #[test]
    fn test_no_endpoints_does_not_match() {
        assert_eq!(classify(&alt(&[])), None);
    }

    #[test]
    fn test_last_endpoint_of_direction_wins() {
        let pair = classify(&alt(&[
            (0x81, INTERRUPT),
            (0x01, INTERRUPT),
            (0x83, INTERRUPT),
            (0x02, BULK),
        ]));
        assert_eq!(
            pair,
            Some(EndpointPair {
                reader: 0x83,
                writer: 0x01
            })
        );
    }

    #[test]
    fn test_mixed_types_pick_interrupt_only() {
        let pair = classify(&alt(&[
            (0x82, BULK),
            (0x81, INTERRUPT),
            (0x02, BULK),
            (0x03, INTERRUPT),
        ]));
        assert_eq!(
            pair,
            Some(EndpointPair {
                reader: 0x81,
                writer: 0x03
            })
        );
    }

    proptest! {
        #[test]
        fn prop_match_iff_both_directions_present(
            endpoints in proptest::collection::vec((any::<u8>(), 0u8..4), 0..8)
        ) {
            let setting = alt(&endpoints);
            let has_in = endpoints.iter().any(|&(a, t)| a & 0x80 != 0 && t == INTERRUPT);
            let has_out = endpoints.iter().any(|&(a, t)| a & 0x80 == 0 && t == INTERRUPT);

            match classify(&setting) {
                Some(pair) => {
                    prop_assert!(has_in && has_out);
                    prop_assert!(pair.reader & 0x80 != 0);
                    prop_assert!(pair.writer & 0x80 == 0);
                }
                None => prop_assert!(!(has_in && has_out)),
            }
        }
    }
}
