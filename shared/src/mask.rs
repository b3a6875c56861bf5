/// Per-block exclusion flags: 0 = unmasked (default), 1 = masked. Mutated
/// both by server full replacements and by local edit gestures; the two
/// sources are not synchronized, last write wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MotionMask {
    flags: Vec<u8>,
}

impl MotionMask {
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Zero-fills to one unmasked flag per block.
    pub fn reset(&mut self, blocks: usize) {
        self.flags = vec![0; blocks];
    }

    /// Full replacement from a server push, normalized to 0/1.
    pub fn replace(&mut self, flags: Vec<u8>) {
        self.flags = flags.into_iter().map(|flag| u8::from(flag != 0)).collect();
    }

    pub fn flag(&self, index: usize) -> Option<u8> {
        self.flags.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: u8) {
        if let Some(slot) = self.flags.get_mut(index) {
            *slot = u8::from(value != 0);
        }
    }

    /// Byte-per-block wire form, as transmitted on edit-gesture completion.
    pub fn as_bytes(&self) -> &[u8] {
        &self.flags
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.flags.iter().copied().enumerate()
    }
}

/// Paint-drag gesture state machine: Idle -> Painting -> Idle. Brush
/// polarity is the inverse of the pressed block's flag and stays fixed for
/// the whole gesture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditGesture {
    #[default]
    Idle,
    Painting {
        brush: u8,
    },
}

impl EditGesture {
    pub fn press(&mut self, mask: &mut MotionMask, index: usize) {
        let Some(flag) = mask.flag(index) else {
            return;
        };
        let brush = if flag == 1 { 0 } else { 1 };
        mask.set(index, brush);
        *self = EditGesture::Painting { brush };
    }

    pub fn drag(&self, mask: &mut MotionMask, index: usize) {
        if let EditGesture::Painting { brush } = self {
            mask.set(index, *brush);
        }
    }

    /// Ends the gesture, painting the final block if there is one. Returns
    /// true when a full-mask transmit is due.
    pub fn release(&mut self, mask: &mut MotionMask, index: Option<usize>) -> bool {
        match std::mem::take(self) {
            EditGesture::Painting { brush } => {
                if let Some(index) = index {
                    mask.set(index, brush);
                }
                true
            }
            EditGesture::Idle => false,
        }
    }
}
