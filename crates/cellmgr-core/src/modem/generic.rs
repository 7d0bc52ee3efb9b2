use super::Modem3gpp;

/// Plain 3GPP device: read operations, scan and registration only.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericModem;

impl Modem3gpp for GenericModem {
    fn name(&self) -> &'static str {
        "generic"
    }
}
