//! Busy-bit handshake over a command / data register window
//!
//! Every indirect access follows the same sequence:
//!
//! 1. wait until the busy bit is clear
//! 2. load the data register(s), for operations that carry an operand
//! 3. write the command word with the busy bit set
//! 4. wait until the hardware clears the busy bit
//! 5. read the data register(s), for operations that return a result
//!
//! The command is translated before step 1, so an operation the chip does
//! not implement never touches the bus. Callers hold the window's lock
//! across the whole sequence.

use msd_core::{Error, RegisterCommand, Result};
use tracing::{debug, trace};

use crate::bus::RegisterBus;
use crate::layout::WindowLayout;
use crate::retry::RetryPolicy;

/// One indirect register window bound to a layout
#[derive(Debug, Clone, Copy)]
pub struct IndirectWindow {
    layout: WindowLayout,
    retry: RetryPolicy,
}

impl IndirectWindow {
    /// Window using the layout's default polling policy
    pub fn new(layout: WindowLayout) -> Self {
        Self {
            layout,
            retry: layout.retry,
        }
    }

    /// Override the polling policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Layout this window drives
    pub fn layout(&self) -> &WindowLayout {
        &self.layout
    }

    /// Polling policy in effect
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Run a single-word command, returning the first data register
    ///
    /// Operations that return nothing yield 0.
    pub fn execute<B>(&self, bus: &B, command: &RegisterCommand) -> Result<u16>
    where
        B: RegisterBus + ?Sized,
    {
        let load = [command.data];
        let result = self.run(bus, command, &load[..], 1)?;
        Ok(result.first().copied().unwrap_or(0))
    }

    /// Run a command over every data register of the window
    ///
    /// `words` is loaded into the data registers in order for operations
    /// that carry an operand; it must not be longer than the window. The
    /// returned vector holds one word per data register for operations that
    /// return a result, and is empty otherwise.
    pub fn execute_words<B>(
        &self,
        bus: &B,
        command: &RegisterCommand,
        words: &[u16],
    ) -> Result<Vec<u16>>
    where
        B: RegisterBus + ?Sized,
    {
        let regs = self.layout.data_regs.len();
        if words.len() > regs {
            return Err(Error::bad_param(
                "data",
                format!(
                    "{} words for {} data register(s) of {}",
                    words.len(),
                    regs,
                    self.layout.name
                ),
            ));
        }
        self.run(bus, command, words, regs)
    }

    fn run<B>(
        &self,
        bus: &B,
        command: &RegisterCommand,
        load: &[u16],
        read_words: usize,
    ) -> Result<Vec<u16>>
    where
        B: RegisterBus + ?Sized,
    {
        let layout = &self.layout;
        let word = layout.pack_command(command)?;

        self.wait_idle(bus)?;

        if command.opcode.loads_data() {
            for (&reg, &value) in layout.data_regs.iter().zip(load) {
                bus.write(layout.dev_addr, reg, value)?;
            }
        }

        trace!(window = layout.name, "issue {:#06x}", word);
        bus.write(layout.dev_addr, layout.command_reg, word)?;

        let polls = self.wait_idle(bus)?;
        debug!(window = layout.name, polls, "{}", command);

        if !command.opcode.returns_data() {
            return Ok(Vec::new());
        }
        layout
            .data_regs
            .iter()
            .take(read_words)
            .map(|&reg| bus.read(layout.dev_addr, reg))
            .collect()
    }

    fn wait_idle<B>(&self, bus: &B) -> Result<u32>
    where
        B: RegisterBus + ?Sized,
    {
        let layout = &self.layout;
        self.retry.poll(layout.name, || {
            let value = bus.read(layout.dev_addr, layout.command_reg)?;
            Ok(!layout.is_busy(value))
        })
    }
}
