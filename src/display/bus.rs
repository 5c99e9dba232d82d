/*
 *  display/bus.rs
 *
 *  ilipanel - ILI8960 panel control
 *  (c) 2020-26 Stuart Hunter
 *
 *  SPI bus framework - driver registration and device lifecycle
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

//! SPI bus framework
//!
//! A driver is described by an [`SpiDriver`]: a plain struct of function
//! references (probe, remove, optional suspend/resume pair, attribute table)
//! handed to [`SpiBus::register_driver`] at start-up. The bus owns every
//! per-device state value the driver's probe returns and threads it back
//! into each callback, so drivers never look their state up themselves.
//!
//! ## Lifecycle
//!
//! 1. `register_driver` - one driver per bus
//! 2. `attach` - a device appears; `probe` acquires everything it needs
//! 3. `suspend` / `resume` - system sleep, only if the driver has `PmOps`
//! 4. `detach` - the device goes away; `remove` releases in reverse order
//! 5. `unregister_driver` - detaches whatever is still bound

use std::fmt;

use embedded_hal::spi::{Mode, Phase, Polarity, SpiDevice};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{SPIError, SpidevDevice};
use log::{debug, info, warn};

use crate::display::attribute::{parse_ulong, DeviceAttribute};
use crate::display::error::DisplayError;
use crate::display::lcd::LcdHost;
use crate::display::traits::{BlankMode, LcdOps, VideoMode};

/// Channel parameters a driver requests before its first transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiSetup {
    pub mode: Mode,
    pub bits_per_word: u8,
    /// Leave the controller's current clock in place when `None`
    pub max_speed_hz: Option<u32>,
}

impl SpiSetup {
    pub fn new(mode: Mode, bits_per_word: u8) -> Self {
        Self { mode, bits_per_word, max_speed_hz: None }
    }

    pub fn with_max_speed_hz(mut self, hz: u32) -> Self {
        self.max_speed_hz = Some(hz);
        self
    }
}

/// An SPI device whose word size and clock mode can be (re)configured
pub trait ConfigurableSpi: SpiDevice<u8> {
    fn setup(&mut self, setup: &SpiSetup) -> Result<(), Self::Error>;
}

fn mode_flags(mode: Mode) -> SpiModeFlags {
    match (mode.polarity, mode.phase) {
        (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => SpiModeFlags::SPI_MODE_0,
        (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => SpiModeFlags::SPI_MODE_1,
        (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => SpiModeFlags::SPI_MODE_2,
        (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => SpiModeFlags::SPI_MODE_3,
    }
}

impl ConfigurableSpi for SpidevDevice {
    fn setup(&mut self, setup: &SpiSetup) -> Result<(), SPIError> {
        let mut options = SpidevOptions::new();
        options
            .bits_per_word(setup.bits_per_word)
            .mode(mode_flags(setup.mode));
        if let Some(hz) = setup.max_speed_hz {
            options.max_speed_hz(hz);
        }

        self.0.configure(&options.build()).map_err(SPIError::from)
    }
}

/// What the bus hands a driver when a device appears
///
/// `delay` is the busy-wait provider for settle times; the driver takes
/// ownership of both for the lifetime of the bound device.
pub struct SpiPeripheral<S, D> {
    pub spi: S,
    pub delay: D,
    /// Board clock limit, applied by the driver's channel setup
    pub max_speed_hz: Option<u32>,
}

impl<S, D> SpiPeripheral<S, D> {
    pub fn new(spi: S, delay: D) -> Self {
        Self { spi, delay, max_speed_hz: None }
    }

    pub fn with_max_speed_hz(mut self, hz: u32) -> Self {
        self.max_speed_hz = Some(hz);
        self
    }

    /// Channel setup for `mode`/`bits_per_word` at this peripheral's clock
    pub fn setup(&self, mode: Mode, bits_per_word: u8) -> SpiSetup {
        let setup = SpiSetup::new(mode, bits_per_word);
        match self.max_speed_hz {
            Some(hz) => setup.with_max_speed_hz(hz),
            None => setup,
        }
    }
}

pub type ProbeFn<C, T> = fn(C, &mut dyn LcdHost) -> Result<T, DisplayError>;
pub type RemoveFn<T> = fn(T, &mut dyn LcdHost);
pub type PmFn<T> = fn(&mut T) -> Result<(), DisplayError>;

/// Suspend/resume pair, present only when power management is configured
pub struct PmOps<T> {
    pub suspend: PmFn<T>,
    pub resume: PmFn<T>,
}

/// Driver registration record
pub struct SpiDriver<C, T> {
    /// Matched against the device modalias (`name` or `spi:name`)
    pub name: &'static str,
    pub probe: ProbeFn<C, T>,
    pub remove: RemoveFn<T>,
    pub pm: Option<PmOps<T>>,
    /// Driver-specific attributes, dispatched before the class attributes
    pub attributes: Vec<DeviceAttribute<T>>,
}

impl<C, T> SpiDriver<C, T> {
    fn matches(&self, modalias: &str) -> bool {
        modalias == self.name || modalias.strip_prefix("spi:") == Some(self.name)
    }
}

/// Bus-assigned identity of an attached device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spi0.{}", self.0)
    }
}

struct BoundDevice<T> {
    id: DeviceId,
    modalias: String,
    data: T,
}

/// The bus: one registered driver, any number of bound devices
pub struct SpiBus<C, T> {
    host: Box<dyn LcdHost>,
    driver: Option<SpiDriver<C, T>>,
    devices: Vec<BoundDevice<T>>,
    next_id: u32,
}

impl<C, T> SpiBus<C, T> {
    pub fn new(host: Box<dyn LcdHost>) -> Self {
        Self {
            host,
            driver: None,
            devices: Vec::new(),
            next_id: 0,
        }
    }

    pub fn host(&self) -> &dyn LcdHost {
        self.host.as_ref()
    }

    pub fn register_driver(&mut self, driver: SpiDriver<C, T>) -> Result<(), DisplayError> {
        if let Some(existing) = &self.driver {
            return Err(DisplayError::Busy(
                format!("driver '{}' already registered", existing.name)
            ));
        }

        info!("registered spi driver {} (pm {})",
              driver.name,
              if driver.pm.is_some() { "enabled" } else { "disabled" });
        self.driver = Some(driver);
        Ok(())
    }

    /// Detach every bound device, newest first, then drop the registration
    pub fn unregister_driver(&mut self) -> Option<SpiDriver<C, T>> {
        let driver = self.driver.take()?;

        while let Some(bound) = self.devices.pop() {
            info!("detaching {} ({})", bound.id, bound.modalias);
            (driver.remove)(bound.data, self.host.as_mut());
        }

        info!("unregistered spi driver {}", driver.name);
        Some(driver)
    }

    /// A device with `modalias` appeared on the bus
    pub fn attach(&mut self, modalias: &str, channel: C) -> Result<DeviceId, DisplayError> {
        let probe = match &self.driver {
            Some(driver) if driver.matches(modalias) => driver.probe,
            _ => return Err(DisplayError::NoDriver(modalias.to_string())),
        };

        self.devices
            .try_reserve(1)
            .map_err(|e| DisplayError::AllocationFailed(e.to_string()))?;

        let data = probe(channel, self.host.as_mut())?;

        let id = DeviceId(self.next_id);
        self.next_id += 1;
        self.devices.push(BoundDevice {
            id,
            modalias: modalias.to_string(),
            data,
        });

        info!("attached {} as {}", modalias, id);
        Ok(id)
    }

    /// The device went away
    pub fn detach(&mut self, id: DeviceId) -> Result<(), DisplayError> {
        let idx = self.index_of(id)?;
        let bound = self.devices.remove(idx);

        match &self.driver {
            Some(driver) => (driver.remove)(bound.data, self.host.as_mut()),
            None => warn!("{} bound without a driver", id),
        }

        info!("detached {} ({})", id, bound.modalias);
        Ok(())
    }

    pub fn suspend(&mut self, id: DeviceId) -> Result<(), DisplayError> {
        let suspend = self.pm().map(|pm| pm.suspend);
        let dev = self.device_mut(id).ok_or(DisplayError::NoDevice(id.0))?;

        match suspend {
            Some(suspend) => suspend(dev),
            None => Ok(()),
        }
    }

    pub fn resume(&mut self, id: DeviceId) -> Result<(), DisplayError> {
        let resume = self.pm().map(|pm| pm.resume);
        let dev = self.device_mut(id).ok_or(DisplayError::NoDevice(id.0))?;

        match resume {
            Some(resume) => resume(dev),
            None => Ok(()),
        }
    }

    /// System sleep: suspend newest-first
    ///
    /// On failure the devices already suspended are resumed again and the
    /// first error is returned.
    pub fn suspend_all(&mut self) -> Result<(), DisplayError> {
        let ids: Vec<DeviceId> = self.devices.iter().rev().map(|d| d.id).collect();

        for (n, id) in ids.iter().enumerate() {
            if let Err(e) = self.suspend(*id) {
                warn!("suspend of {} failed: {}", id, e);
                for done in ids[..n].iter().rev() {
                    if let Err(re) = self.resume(*done) {
                        warn!("resume of {} after aborted suspend failed: {}", done, re);
                    }
                }
                return Err(e);
            }
        }

        debug!("suspended {} device(s)", ids.len());
        Ok(())
    }

    /// System wake: resume oldest-first, stopping at the first failure
    pub fn resume_all(&mut self) -> Result<(), DisplayError> {
        let ids: Vec<DeviceId> = self.devices.iter().map(|d| d.id).collect();

        for id in &ids {
            self.resume(*id)?;
        }

        debug!("resumed {} device(s)", ids.len());
        Ok(())
    }

    pub fn device(&self, id: DeviceId) -> Option<&T> {
        self.devices.iter().find(|d| d.id == id).map(|d| &d.data)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut T> {
        self.devices.iter_mut().find(|d| d.id == id).map(|d| &mut d.data)
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &T)> {
        self.devices.iter().map(|d| (d.id, &d.data))
    }

    fn pm(&self) -> Option<&PmOps<T>> {
        self.driver.as_ref().and_then(|d| d.pm.as_ref())
    }

    fn driver_attribute(&self, name: &str) -> Option<DeviceAttribute<T>> {
        self.driver
            .as_ref()
            .and_then(|d| d.attributes.iter().find(|a| a.name == name))
            .copied()
    }

    fn index_of(&self, id: DeviceId) -> Result<usize, DisplayError> {
        self.devices
            .iter()
            .position(|d| d.id == id)
            .ok_or(DisplayError::NoDevice(id.0))
    }
}

/// lcd class attributes, available on every device whose state speaks `LcdOps`
impl<C, T: LcdOps> SpiBus<C, T> {
    /// Read an attribute: driver table first, then `lcd_power`,
    /// `contrast` and `max_contrast`
    pub fn show_attribute(&self, id: DeviceId, name: &str) -> Result<String, DisplayError> {
        let attr = self.driver_attribute(name);
        let dev = self.device(id).ok_or(DisplayError::NoDevice(id.0))?;

        if let Some(attr) = attr {
            return attr.read(dev);
        }

        match name {
            "lcd_power" => Ok(format!("{}\n", dev.get_power().level())),
            "contrast" => dev
                .get_contrast()
                .map(|c| format!("{}\n", c))
                .ok_or(DisplayError::UnsupportedOperation),
            "max_contrast" => Ok(format!("{}\n", dev.max_contrast())),
            _ => Err(DisplayError::NoSuchAttribute(name.to_string())),
        }
    }

    /// Write an attribute, returning the number of bytes consumed
    pub fn store_attribute(&mut self, id: DeviceId, name: &str, buf: &str) -> Result<usize, DisplayError> {
        let attr = self.driver_attribute(name);
        let dev = self.device_mut(id).ok_or(DisplayError::NoDevice(id.0))?;

        if let Some(attr) = attr {
            return attr.write(dev, buf);
        }

        match name {
            "lcd_power" => {
                let power = BlankMode::from_level(parse_ulong(buf)?)?;
                dev.set_power(power)?;
                Ok(buf.len())
            }
            "contrast" => {
                let contrast = parse_ulong(buf)?;
                let max = dev.max_contrast();
                if contrast > u64::from(max) {
                    return Err(DisplayError::InvalidArgument(
                        format!("contrast {} exceeds max_contrast {}", contrast, max)
                    ));
                }
                dev.set_contrast(contrast as u8)?;
                Ok(buf.len())
            }
            "max_contrast" => Err(DisplayError::PermissionDenied(name.to_string())),
            _ => Err(DisplayError::NoSuchAttribute(name.to_string())),
        }
    }

    /// Display-manager mode change notification
    pub fn set_mode(&mut self, id: DeviceId, mode: &VideoMode) -> Result<(), DisplayError> {
        self.device_mut(id)
            .ok_or(DisplayError::NoDevice(id.0))?
            .set_mode(mode)
    }
}

impl<C, T> Drop for SpiBus<C, T> {
    fn drop(&mut self) {
        if self.driver.is_some() {
            self.unregister_driver();
        }
    }
}
