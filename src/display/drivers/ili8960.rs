/*
 *  display/drivers/ili8960.rs
 *
 *  ilipanel - ILI8960 panel control
 *  (c) 2020-26 Stuart Hunter
 *
 *  Ilitek ILI8960 LCD controller driver (SPI)
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

//! # ILI8960 LCD controller
//!
//! 320x240 panel controller with a write-only register interface over SPI
//! (mode 3, 8 bits per word). Every register write is one 2-byte frame:
//!
//! ```text
//!  byte 0:  A6  0  A5 A4 A3 A2 A1 A0     (address bit 6 moved to bit 7)
//!  byte 1:  D7 D6 D5 D4 D3 D2 D1 D0
//! ```
//!
//! Power, contrast and brightness are the only registers driven here.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{SpiDevice, MODE_3};
use log::{debug, error, info, warn};

use crate::display::attribute::{parse_ulong, DeviceAttribute};
use crate::display::bus::{ConfigurableSpi, PmOps, SpiDriver, SpiPeripheral};
use crate::display::error::DisplayError;
use crate::display::lcd::{LcdHost, LcdId};
use crate::display::traits::{BlankMode, LcdOps, LcdProperties, VideoMode};

/// Name the driver registers under (modalias `spi:ili8960`)
pub const DRIVER_NAME: &str = "ili8960";

/// Name of the lcd device object created at attach
pub const LCD_NAME: &str = "ili8960-lcd";

pub const BRIGHTNESS_ATTR: &str = "brightness";

/// ILI8960 register addresses
pub mod reg {
    pub const BRIGHTNESS: u8 = 0x03;
    pub const POWER: u8 = 0x05;
    pub const CONTRAST: u8 = 0x0d;
    /// Undocumented; must see 0x01 once the panel is up
    pub const INIT: u8 = 0x13;
}

const POWER_ON: u8 = 0xc7;
const POWER_OFF: u8 = 0xc6;
const INIT_VALUE: u8 = 0x01;

/// Supply settle time around power transitions
pub const SETTLE_DELAY_MS: u32 = 20;

pub const MAX_CONTRAST: u8 = 255;

pub const NATIVE_WIDTH: u32 = 320;
pub const NATIVE_HEIGHT: u32 = 240;

/// Build the 2-byte command frame for a register write
pub fn encode_frame(reg: u8, value: u8) -> [u8; 2] {
    [((reg & 0x40) << 1) | (reg & 0x3f), value]
}

/// Send one register write as a single SPI transaction
///
/// No retries; the channel's error comes back untouched.
pub fn write_register<S: SpiDevice<u8>>(
    spi: &mut S,
    reg: u8,
    value: u8,
) -> Result<(), S::Error> {
    spi.write(&encode_frame(reg, value))
}

/// Per-device state of an attached ILI8960
pub struct Ili8960<S, D> {
    spi: S,
    delay: D,
    lcd: LcdId,
    powered: bool,
    /// Mirrors the register only after a successful write
    brightness: u8,
}

impl<S, D> Ili8960<S, D>
where
    S: ConfigurableSpi,
    D: DelayNs,
{
    /// Registration record for the bus
    ///
    /// Suspend/resume are wired in only when `power_management` is set.
    pub fn driver(power_management: bool) -> SpiDriver<SpiPeripheral<S, D>, Self> {
        SpiDriver {
            name: DRIVER_NAME,
            probe: Self::probe,
            remove: Self::remove,
            pm: power_management.then_some(PmOps {
                suspend: Self::suspend,
                resume: Self::resume,
            }),
            attributes: vec![DeviceAttribute::new(
                BRIGHTNESS_ATTR,
                0o644,
                Some(Self::show_brightness),
                Some(Self::store_brightness),
            )],
        }
    }

    /// Bring the panel up: configure the channel, register the lcd device
    /// object and its `brightness` attribute, power on, then send the init
    /// write. A failure at any step releases what was acquired, newest first.
    pub fn probe(
        peripheral: SpiPeripheral<S, D>,
        host: &mut dyn LcdHost,
    ) -> Result<Self, DisplayError> {
        let setup = peripheral.setup(MODE_3, 8);
        let SpiPeripheral { mut spi, delay, .. } = peripheral;

        spi.setup(&setup).map_err(|e| {
            error!("Failed to setup spi: {:?}", e);
            DisplayError::spi(e)
        })?;

        let lcd = host
            .register_lcd(LCD_NAME, LcdProperties { max_contrast: MAX_CONTRAST })
            .map_err(|e| {
                error!("Failed to register lcd device: {}", e);
                e
            })?;

        if let Err(e) = host.create_file(lcd, BRIGHTNESS_ATTR) {
            error!("Failed to create {} attribute: {}", BRIGHTNESS_ATTR, e);
            host.unregister_lcd(lcd);
            return Err(e);
        }

        let mut panel = Self {
            spi,
            delay,
            lcd,
            powered: false,
            brightness: 0,
        };

        if let Err(e) = panel.bring_up() {
            error!("Failed to bring up panel: {}", e);
            host.remove_file(lcd, BRIGHTNESS_ATTR);
            host.unregister_lcd(lcd);
            return Err(e);
        }

        info!("{} attached as {}", DRIVER_NAME, lcd);
        Ok(panel)
    }

    fn bring_up(&mut self) -> Result<(), DisplayError> {
        self.program_power(true)?;
        self.powered = true;

        if let Err(e) = self.write_reg(reg::INIT, INIT_VALUE) {
            if let Err(off) = self.program_power(false) {
                warn!("power-off after failed init write also failed: {}", off);
            }
            self.powered = false;
            return Err(e);
        }

        Ok(())
    }

    /// Tear the panel down: power off if on, withdraw the attribute,
    /// unregister the device object; the channel is released on drop.
    pub fn remove(mut self, host: &mut dyn LcdHost) {
        if self.powered {
            if let Err(e) = self.set_power(false) {
                warn!("power-off during remove failed: {}", e);
            }
        }

        host.remove_file(self.lcd, BRIGHTNESS_ATTR);
        host.unregister_lcd(self.lcd);
        info!("{} ({}) removed", DRIVER_NAME, self.lcd);
    }

    /// Power the panel down for sleep, keeping `powered` as the wake intent
    pub fn suspend(&mut self) -> Result<(), DisplayError> {
        if self.powered {
            self.program_power(false)?;
        }
        Ok(())
    }

    /// Restore power if the panel was on before suspend
    pub fn resume(&mut self) -> Result<(), DisplayError> {
        if self.powered {
            self.program_power(true)?;
        }
        Ok(())
    }

    /// Switch the panel on or off
    ///
    /// The cached flag follows the request even when the write fails.
    pub fn set_power(&mut self, on: bool) -> Result<(), DisplayError> {
        self.powered = on;
        self.program_power(on)
    }

    pub fn get_power(&self) -> bool {
        self.powered
    }

    pub fn set_contrast(&mut self, level: u8) -> Result<(), DisplayError> {
        self.write_reg(reg::CONTRAST, level)
    }

    /// Accept a video mode unless neither dimension matches 320x240
    pub fn validate_mode(&self, width: u32, height: u32) -> Result<(), DisplayError> {
        // AND, not OR: 320x100 and 500x240 both pass
        if width != NATIVE_WIDTH && height != NATIVE_HEIGHT {
            return Err(DisplayError::InvalidArgument(format!(
                "mode {}x{} not supported ({}x{} panel)",
                width, height, NATIVE_WIDTH, NATIVE_HEIGHT
            )));
        }
        Ok(())
    }

    pub fn set_brightness(&mut self, level: u8) -> Result<(), DisplayError> {
        self.write_reg(reg::BRIGHTNESS, level)?;
        self.brightness = level;
        Ok(())
    }

    pub fn get_brightness(&self) -> u8 {
        self.brightness
    }

    /// The lcd device object registered at attach
    pub fn lcd(&self) -> LcdId {
        self.lcd
    }

    /// Delay-before-on, delay-after-off
    fn program_power(&mut self, on: bool) -> Result<(), DisplayError> {
        if on {
            self.delay.delay_ms(SETTLE_DELAY_MS);
        }

        let ret = self.write_reg(reg::POWER, if on { POWER_ON } else { POWER_OFF });

        if !on {
            self.delay.delay_ms(SETTLE_DELAY_MS);
        }

        ret
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), DisplayError> {
        debug!("{}: reg 0x{:02x} <- 0x{:02x}", DRIVER_NAME, reg, value);
        write_register(&mut self.spi, reg, value).map_err(DisplayError::spi)
    }

    fn show_brightness(&self) -> Result<String, DisplayError> {
        Ok(format!("{}\n", self.brightness))
    }

    fn store_brightness(&mut self, buf: &str) -> Result<usize, DisplayError> {
        let brightness = parse_ulong(buf)?;

        if brightness > 255 {
            return Err(DisplayError::InvalidArgument(
                format!("brightness {} exceeds 255", brightness)
            ));
        }

        self.set_brightness(brightness as u8)?;
        Ok(buf.len())
    }
}

impl<S, D> LcdOps for Ili8960<S, D>
where
    S: ConfigurableSpi,
    D: DelayNs,
{
    fn set_power(&mut self, power: BlankMode) -> Result<(), DisplayError> {
        Ili8960::set_power(self, power == BlankMode::Unblank)
    }

    fn get_power(&self) -> BlankMode {
        if self.powered {
            BlankMode::Unblank
        } else {
            BlankMode::Powerdown
        }
    }

    fn set_contrast(&mut self, contrast: u8) -> Result<(), DisplayError> {
        Ili8960::set_contrast(self, contrast)
    }

    fn set_mode(&mut self, mode: &VideoMode) -> Result<(), DisplayError> {
        self.validate_mode(mode.xres, mode.yres)
    }

    fn max_contrast(&self) -> u8 {
        MAX_CONTRAST
    }
}
