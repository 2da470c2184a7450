use crate::registers::{CONTROL_REGISTER_COUNT, Registers};
use crate::vram::Vram;
use crate::{Pc080sn, VRAM_LEN_WORDS};
use bincode::config::{Fixint, LittleEndian};
use bincode::error::{DecodeError, EncodeError};
use std::io;
use std::io::{BufWriter, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveStateError {
    #[error("error saving state: {source}")]
    Serialization {
        #[from]
        source: EncodeError,
    },
    #[error("error loading state: {source}")]
    Deserialization {
        #[from]
        source: DecodeError,
    },
    #[error("I/O error writing state: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
    #[error("VRAM state is {actual} words, expected {expected}")]
    VramLength { expected: usize, actual: usize },
}

const BINCODE_CONFIG: bincode::config::Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_little_endian().with_fixed_int_encoding();

impl Pc080sn {
    /// Raw VRAM contents
    #[must_use]
    pub fn vram(&self) -> &[u16] {
        self.vram.as_slice()
    }

    /// Raw X scroll, Y scroll and control words in register file order
    #[must_use]
    pub fn control_registers(&self) -> &[u16; CONTROL_REGISTER_COUNT] {
        self.registers.words()
    }

    /// Persist VRAM and the control registers. Everything else is derived from these two.
    ///
    /// # Errors
    ///
    /// Propagates any encoding or I/O error.
    pub fn save_state<W: io::Write>(&self, writer: W) -> Result<(), SaveStateError> {
        let mut writer = BufWriter::new(writer);

        bincode::encode_into_std_write(&self.vram, &mut writer, BINCODE_CONFIG)?;
        bincode::encode_into_std_write(&self.registers, &mut writer, BINCODE_CONFIG)?;
        writer.flush()?;

        Ok(())
    }

    /// Restore state written by [`Self::save_state`], then rebuild every tile and the derived
    /// scroll state. Reads exactly the bytes [`Self::save_state`] wrote, so other state can follow
    /// in the same stream.
    ///
    /// # Errors
    ///
    /// Propagates any decoding or I/O error. The chip is left unchanged on error.
    pub fn load_state<R: io::Read>(&mut self, mut reader: R) -> Result<(), SaveStateError> {
        let vram: Vram = bincode::decode_from_std_read(&mut reader, BINCODE_CONFIG)?;
        let registers: Registers = bincode::decode_from_std_read(&mut reader, BINCODE_CONFIG)?;

        self.vram = vram;
        self.registers = registers;
        self.mark_all_tiles_dirty();
        self.restore_scroll();

        log::debug!("Loaded PC080SN state, control = {:04X}", self.registers.control());

        Ok(())
    }

    /// Copy raw VRAM and register words back in, for hosts with their own save format. All
    /// tiles are invalidated but scroll and flip state are not rebuilt until
    /// [`Self::restore_scroll`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`SaveStateError::VramLength`] if `vram` is not exactly the size of VRAM.
    pub fn load_raw_state(
        &mut self,
        vram: &[u16],
        control_registers: &[u16; CONTROL_REGISTER_COUNT],
    ) -> Result<(), SaveStateError> {
        if vram.len() != VRAM_LEN_WORDS {
            return Err(SaveStateError::VramLength { expected: VRAM_LEN_WORDS, actual: vram.len() });
        }

        self.vram.copy_from_slice(vram);
        self.registers = Registers::from_words(*control_registers);
        self.mark_all_tiles_dirty();

        Ok(())
    }
}
