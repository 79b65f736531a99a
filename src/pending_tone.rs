//! The tone last observed on the input while the transport was idle,
//! injected as a prefix when recording starts.

use crate::message::Message;

#[derive(Debug, Clone, Copy, Default)]
pub struct PendingTone {
    pub program: Option<u8>,
    pub bank_msb: Option<u8>,
    pub bank_lsb: Option<u8>,
}

impl PendingTone {
    pub fn is_set(&self) -> bool {
        self.program.is_some() || self.bank_msb.is_some() || self.bank_lsb.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Observe an inbound message, remembering program/bank-select data
    /// regardless of transport state.
    pub fn observe(&mut self, message: &Message) {
        match message {
            Message::ProgramChange { program, .. } => self.program = Some(*program),
            Message::ControlChange { control, value, .. } if *control == crate::message::CC_BANK_MSB => {
                self.bank_msb = Some(*value);
            }
            Message::ControlChange { control, value, .. } if *control == crate::message::CC_BANK_LSB => {
                self.bank_lsb = Some(*value);
            }
            _ => {}
        }
    }
}
