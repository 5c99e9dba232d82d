/*
 *  display/lcd.rs
 *
 *  ilipanel - ILI8960 panel control
 *  (c) 2020-26 Stuart Hunter
 *
 *  lcd class - device object and attribute registration
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

use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use crate::display::error::DisplayError;
use crate::display::traits::LcdProperties;

/// Handle to a registered lcd device object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LcdId(pub u32);

impl fmt::Display for LcdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lcd{}", self.0)
    }
}

/// Registration service for lcd device objects and their attribute files
///
/// Drivers acquire from this during probe and release in reverse order
/// during remove (or when probe unwinds).
pub trait LcdHost {
    /// Register a device object named `name`
    fn register_lcd(&mut self, name: &str, props: LcdProperties) -> Result<LcdId, DisplayError>;

    /// Drop a device object and anything still attached to it
    fn unregister_lcd(&mut self, id: LcdId);

    /// Expose an extra attribute file on a registered device object
    fn create_file(&mut self, id: LcdId, attr: &str) -> Result<(), DisplayError>;

    /// Withdraw an attribute file; unknown names are ignored
    fn remove_file(&mut self, id: LcdId, attr: &str);

    /// Number of device objects currently registered
    fn device_count(&self) -> usize;
}

#[derive(Debug, Clone)]
struct LcdEntry {
    name: String,
    props: LcdProperties,
    files: Vec<String>,
}

/// In-memory lcd class
#[derive(Debug, Default)]
pub struct LcdClass {
    devices: BTreeMap<LcdId, LcdEntry>,
    next_id: u32,
    capacity: Option<usize>,
}

impl LcdClass {
    pub fn new() -> Self {
        Self::default()
    }

    /// A class that refuses registrations beyond `capacity` devices
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl LcdClass {
    pub fn name(&self, id: LcdId) -> Option<&str> {
        self.devices.get(&id).map(|e| e.name.as_str())
    }

    pub fn properties(&self, id: LcdId) -> Option<LcdProperties> {
        self.devices.get(&id).map(|e| e.props)
    }

    pub fn files(&self, id: LcdId) -> Option<&[String]> {
        self.devices.get(&id).map(|e| e.files.as_slice())
    }

    /// Find a device object by its registered name
    pub fn lookup(&self, name: &str) -> Option<LcdId> {
        self.devices
            .iter()
            .find(|(_, e)| e.name == name)
            .map(|(id, _)| *id)
    }
}

impl LcdHost for LcdClass {
    fn register_lcd(&mut self, name: &str, props: LcdProperties) -> Result<LcdId, DisplayError> {
        if let Some(cap) = self.capacity {
            if self.devices.len() >= cap {
                return Err(DisplayError::RegistrationFailed(
                    format!("lcd class full ({} devices)", cap)
                ));
            }
        }

        let id = LcdId(self.next_id);
        self.next_id += 1;
        self.devices.insert(id, LcdEntry {
            name: name.to_string(),
            props,
            files: Vec::new(),
        });

        debug!("registered {} as {}", name, id);
        Ok(id)
    }

    fn unregister_lcd(&mut self, id: LcdId) {
        if let Some(entry) = self.devices.remove(&id) {
            debug!("unregistered {} ({}, max_contrast {})", entry.name, id, entry.props.max_contrast);
        }
    }

    fn create_file(&mut self, id: LcdId, attr: &str) -> Result<(), DisplayError> {
        let entry = self.devices.get_mut(&id).ok_or_else(|| {
            DisplayError::RegistrationFailed(format!("{} is not registered", id))
        })?;

        if entry.files.iter().any(|f| f == attr) {
            return Err(DisplayError::RegistrationFailed(
                format!("{} already has attribute '{}'", id, attr)
            ));
        }

        entry.files.push(attr.to_string());
        Ok(())
    }

    fn remove_file(&mut self, id: LcdId, attr: &str) {
        if let Some(entry) = self.devices.get_mut(&id) {
            entry.files.retain(|f| f != attr);
        }
    }

    fn device_count(&self) -> usize {
        self.devices.len()
    }
}
