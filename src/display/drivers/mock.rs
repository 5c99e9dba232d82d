/*
 *  display/drivers/mock.rs
 *
 *  ilipanel - ILI8960 panel control
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock SPI channel, delay and lcd class for testing without hardware
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::sync::{Arc, Mutex};

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{self, ErrorKind, ErrorType, Operation, SpiDevice};

use crate::display::bus::{ConfigurableSpi, SpiPeripheral, SpiSetup};
use crate::display::error::DisplayError;
use crate::display::lcd::{LcdHost, LcdId};
use crate::display::traits::LcdProperties;

/// One observable thing that happened on the mock bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Setup(SpiSetup),
    /// A completed write transaction, stamped with the virtual clock
    Write { at_ms: u64, bytes: Vec<u8> },
    /// A blocking delay starting at `at_ms`
    Delay { at_ms: u64, ms: u32 },
}

/// Shared state behind a mock channel and its delay provider
///
/// Both halves append to the same event list and share one virtual clock,
/// so tests can check the relative order of writes and settle delays.
#[derive(Debug, Default)]
pub struct MockBusState {
    /// Virtual time, advanced only by delays
    pub clock_ms: u64,

    pub events: Vec<BusEvent>,

    /// Channels created and not yet dropped
    pub live_channels: usize,

    /// Write transactions that were refused
    pub failed_writes: usize,

    /// Simulate failures (for error testing)
    pub simulate_setup_failure: bool,
    pub simulate_write_failure: bool,
    /// Fail only writes whose first byte matches
    pub simulate_write_failure_for: Option<u8>,
}

impl MockBusState {
    /// Every written transaction, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Write { bytes, .. } => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Events with timestamps stripped, for order-only assertions
    pub fn sequence(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|e| match e {
                BusEvent::Setup(_) => "setup".to_string(),
                BusEvent::Write { bytes, .. } => format!("write {:02x?}", bytes),
                BusEvent::Delay { ms, .. } => format!("delay {}", ms),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSpiError;

impl spi::Error for MockSpiError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Recording SPI channel
#[derive(Debug)]
pub struct MockSpi {
    state: Arc<Mutex<MockBusState>>,
}

impl MockSpi {
    pub fn new(state: &Arc<Mutex<MockBusState>>) -> Self {
        state.lock().unwrap().live_channels += 1;
        Self { state: Arc::clone(state) }
    }
}

impl Drop for MockSpi {
    fn drop(&mut self) {
        self.state.lock().unwrap().live_channels -= 1;
    }
}

impl ErrorType for MockSpi {
    type Error = MockSpiError;
}

impl SpiDevice for MockSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();

        for op in operations.iter() {
            if let Operation::Write(buf) = op {
                let targeted = state.simulate_write_failure_for.is_some()
                    && state.simulate_write_failure_for == buf.first().copied();

                if state.simulate_write_failure || targeted {
                    state.failed_writes += 1;
                    return Err(MockSpiError);
                }

                let at_ms = state.clock_ms;
                state.events.push(BusEvent::Write { at_ms, bytes: buf.to_vec() });
            }
        }

        Ok(())
    }
}

impl ConfigurableSpi for MockSpi {
    fn setup(&mut self, setup: &SpiSetup) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();

        if state.simulate_setup_failure {
            return Err(MockSpiError);
        }

        state.events.push(BusEvent::Setup(*setup));
        Ok(())
    }
}

/// Delay provider that advances the shared virtual clock instead of sleeping
#[derive(Debug, Clone)]
pub struct MockDelay {
    state: Arc<Mutex<MockBusState>>,
}

impl MockDelay {
    pub fn new(state: &Arc<Mutex<MockBusState>>) -> Self {
        Self { state: Arc::clone(state) }
    }

    fn record(&mut self, ms: u32) {
        let mut state = self.state.lock().unwrap();
        let at_ms = state.clock_ms;
        state.events.push(BusEvent::Delay { at_ms, ms });
        state.clock_ms += u64::from(ms);
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.record(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.record(ms);
    }
}

/// A fresh channel + delay pair sharing one state
pub fn peripheral() -> (Arc<Mutex<MockBusState>>, SpiPeripheral<MockSpi, MockDelay>) {
    let state = Arc::new(Mutex::new(MockBusState::default()));
    let peripheral = SpiPeripheral::new(MockSpi::new(&state), MockDelay::new(&state));
    (state, peripheral)
}

/// Resource-counting state behind [`MockHost`]
#[derive(Debug, Default)]
pub struct MockHostState {
    /// Device objects currently registered
    pub live_lcds: Vec<(LcdId, String, LcdProperties)>,

    /// Attribute files currently exposed
    pub live_files: Vec<(LcdId, String)>,

    /// Number of times register_lcd succeeded
    pub register_count: usize,

    pub simulate_register_failure: bool,
    pub simulate_create_file_failure: bool,

    next_id: u32,
}

/// lcd class stand-in that counts what is held and can refuse registrations
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    state: Arc<Mutex<MockHostState>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockHostState>> {
        Arc::clone(&self.state)
    }
}

impl LcdHost for MockHost {
    fn register_lcd(&mut self, name: &str, props: LcdProperties) -> Result<LcdId, DisplayError> {
        let mut state = self.state.lock().unwrap();

        if state.simulate_register_failure {
            return Err(DisplayError::RegistrationFailed("Simulated register failure".to_string()));
        }

        let id = LcdId(state.next_id);
        state.next_id += 1;
        state.register_count += 1;
        state.live_lcds.push((id, name.to_string(), props));
        Ok(id)
    }

    fn unregister_lcd(&mut self, id: LcdId) {
        let mut state = self.state.lock().unwrap();
        state.live_lcds.retain(|(lcd, _, _)| *lcd != id);
        state.live_files.retain(|(lcd, _)| *lcd != id);
    }

    fn create_file(&mut self, id: LcdId, attr: &str) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();

        if state.simulate_create_file_failure {
            return Err(DisplayError::RegistrationFailed("Simulated create_file failure".to_string()));
        }

        state.live_files.push((id, attr.to_string()));
        Ok(())
    }

    fn remove_file(&mut self, id: LcdId, attr: &str) {
        let mut state = self.state.lock().unwrap();
        state.live_files.retain(|(lcd, name)| !(*lcd == id && name == attr));
    }

    fn device_count(&self) -> usize {
        self.state.lock().unwrap().live_lcds.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_spi_records_writes() {
        let (state, mut p) = peripheral();

        p.spi.write(&[0x05, 0xc7]).unwrap();
        p.delay.delay_ms(20);
        p.spi.write(&[0x13, 0x01]).unwrap();

        let state = state.lock().unwrap();
        assert_eq!(state.writes(), vec![vec![0x05, 0xc7], vec![0x13, 0x01]]);
        assert_eq!(
            state.events[2],
            BusEvent::Write { at_ms: 20, bytes: vec![0x13, 0x01] }
        );
    }

    #[test]
    fn test_mock_spi_simulated_failure() {
        let (state, mut p) = peripheral();

        state.lock().unwrap().simulate_write_failure_for = Some(0x03);
        assert!(p.spi.write(&[0x03, 0x10]).is_err());
        assert!(p.spi.write(&[0x0d, 0x10]).is_ok());

        let state = state.lock().unwrap();
        assert_eq!(state.failed_writes, 1);
        assert_eq!(state.writes(), vec![vec![0x0d, 0x10]]);
    }

    #[test]
    fn test_mock_spi_counts_live_channels() {
        let (state, p) = peripheral();
        assert_eq!(state.lock().unwrap().live_channels, 1);

        drop(p);
        assert_eq!(state.lock().unwrap().live_channels, 0);
    }

    #[test]
    fn test_mock_host_counts_resources() {
        let mut host = MockHost::new();
        let state = host.state();

        let id = host.register_lcd("x", LcdProperties::default()).unwrap();
        host.create_file(id, "brightness").unwrap();
        assert_eq!(state.lock().unwrap().live_files.len(), 1);

        host.unregister_lcd(id);
        assert_eq!(host.device_count(), 0);
        assert!(state.lock().unwrap().live_files.is_empty());
    }
}
