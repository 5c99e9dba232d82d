/*
 *  main.rs
 *
 *  ilipanel - ILI8960 panel control
 *  (c) 2020-26 Stuart Hunter
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

#[cfg(not(feature = "driver-ili8960"))]
compile_error!("ilipanel requires the 'driver-ili8960' feature. Use --features driver-ili8960");

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context};
use env_logger::Env;
use linux_embedded_hal::{Delay, SpidevDevice};
use log::{error, info, warn};

use ilipanel::config;
use ilipanel::display::drivers::ili8960::{self, Ili8960};
use ilipanel::display::{BlankMode, DeviceId, DisplayError, LcdClass, SpiBus, SpiPeripheral, VideoMode};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

type Channel = SpiPeripheral<SpidevDevice, Delay>;
type Panel = Ili8960<SpidevDevice, Delay>;

/// One console line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Show(String),
    Store(String, String),
    Power(bool),
    Brightness(String),
    Contrast(String),
    Mode(VideoMode),
    Suspend,
    Resume,
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> anyhow::Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    let extra = words.next();

    let cmd = match (verb, arg, extra) {
        ("show", Some(attr), None) => Command::Show(attr.to_string()),
        ("store", Some(attr), Some(value)) if words.next().is_none() => {
            Command::Store(attr.to_string(), value.to_string())
        }
        ("power", Some("on"), None) => Command::Power(true),
        ("power", Some("off"), None) => Command::Power(false),
        ("brightness", Some(n), None) => Command::Brightness(n.to_string()),
        ("contrast", Some(n), None) => Command::Contrast(n.to_string()),
        ("mode", Some(geometry), None) => Command::Mode(parse_geometry(geometry)?),
        ("suspend", None, None) => Command::Suspend,
        ("resume", None, None) => Command::Resume,
        ("status", None, None) => Command::Status,
        ("help" | "?", None, None) => Command::Help,
        ("quit" | "exit", None, None) => Command::Quit,
        _ => bail!("unrecognised command '{}' (try 'help')", line.trim()),
    };

    Ok(Some(cmd))
}

/// `320x240` style geometry
fn parse_geometry(text: &str) -> anyhow::Result<VideoMode> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("mode must look like <width>x<height>, got '{}'", text))?;
    let xres = w.parse().with_context(|| format!("bad width '{}'", w))?;
    let yres = h.parse().with_context(|| format!("bad height '{}'", h))?;
    Ok(VideoMode::new(xres, yres))
}

const HELP: &str = "\
commands:
  show <attr>            read brightness | lcd_power | contrast | max_contrast
  store <attr> <value>   write an attribute
  power on|off
  brightness <n>
  contrast <n>
  mode <w>x<h>           check a video mode against the panel
  suspend | resume
  status
  quit";

/// Run one command; returns false when the console should exit
fn execute(bus: &mut SpiBus<Channel, Panel>, id: DeviceId, cmd: Command) -> anyhow::Result<bool> {
    match cmd {
        Command::Show(attr) => print!("{}", bus.show_attribute(id, &attr)?),
        Command::Store(attr, value) => {
            let n = bus.store_attribute(id, &attr, &value)?;
            println!("{} byte(s) written", n);
        }
        Command::Power(on) => {
            let level = if on { BlankMode::Unblank } else { BlankMode::Powerdown };
            bus.store_attribute(id, "lcd_power", &level.level().to_string())?;
        }
        Command::Brightness(n) => {
            bus.store_attribute(id, ili8960::BRIGHTNESS_ATTR, &n)?;
        }
        Command::Contrast(n) => {
            bus.store_attribute(id, "contrast", &n)?;
        }
        Command::Mode(mode) => {
            bus.set_mode(id, &mode)?;
            println!("{}x{} accepted", mode.xres, mode.yres);
        }
        Command::Suspend => bus.suspend(id)?,
        Command::Resume => bus.resume(id)?,
        Command::Status => {
            let panel = bus.device(id).ok_or_else(|| anyhow!("{} is gone", id))?;
            println!(
                "{}: {} power={} brightness={} lcd devices={}",
                id,
                panel.lcd(),
                if panel.get_power() { "on" } else { "off" },
                panel.get_brightness(),
                bus.host().device_count(),
            );
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => return Ok(false),
    }

    Ok(true)
}

/// Render a command failure, with the errno a sysfs write would have seen
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<DisplayError>() {
        Some(e) => format!("{} (errno {})", e, e.errno()),
        None => format!("{:#}", err),
    }
}

fn open_channel(cfg: &config::Config) -> anyhow::Result<Channel> {
    let spi = SpidevDevice::open(cfg.bus())
        .map_err(|e| anyhow!("Failed to open {}: {:?}", cfg.bus(), e))?;

    let channel = SpiPeripheral::new(spi, Delay);
    Ok(match cfg.speed_hz() {
        Some(hz) => channel.with_max_speed_hz(hz),
        None => channel,
    })
}

fn main() -> anyhow::Result<()> {
    let cfg = config::load()?;

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let channel = open_channel(&cfg)?;

    let mut bus: SpiBus<Channel, Panel> = SpiBus::new(Box::new(LcdClass::new()));
    bus.register_driver(Ili8960::driver(cfg.power_management()))?;

    let modalias = format!("spi:{}", ili8960::DRIVER_NAME);
    let id = bus
        .attach(&modalias, channel)
        .with_context(|| format!("ili8960 probe on {} failed", cfg.bus()))?;

    if let Some(b) = cfg.brightness() {
        bus.store_attribute(id, ili8960::BRIGHTNESS_ATTR, &b.to_string())?;
    }
    if let Some(c) = cfg.contrast() {
        bus.store_attribute(id, "contrast", &c.to_string())?;
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        print!("ilipanel> ");
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let cmd = match parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        match execute(&mut bus, id, cmd) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => error!("{}", describe(&e)),
        }
    }

    info!("shutting down");
    bus.unregister_driver();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("show brightness\n").unwrap(), Some(Command::Show("brightness".into())));
        assert_eq!(
            parse_command("store contrast 0x40").unwrap(),
            Some(Command::Store("contrast".into(), "0x40".into()))
        );
        assert_eq!(parse_command("power off").unwrap(), Some(Command::Power(false)));
        assert_eq!(parse_command("brightness 200").unwrap(), Some(Command::Brightness("200".into())));
        assert_eq!(parse_command("mode 320x240").unwrap(), Some(Command::Mode(VideoMode::new(320, 240))));
        assert_eq!(parse_command("  quit ").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_describe_reports_errno() {
        let err = anyhow::Error::from(DisplayError::InvalidArgument("brightness 256 exceeds 255".into()));
        assert!(describe(&err).ends_with("(errno -22)"));

        let err = anyhow!("mode must look like <width>x<height>");
        assert_eq!(describe(&err), "mode must look like <width>x<height>");
    }

    #[test]
    fn test_blank_lines_ignored() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("   \n").unwrap(), None);
    }

    #[test]
    fn test_bad_commands() {
        assert!(parse_command("power maybe").is_err());
        assert!(parse_command("store brightness").is_err());
        assert!(parse_command("store brightness 1 2").is_err());
        assert!(parse_command("mode 320").is_err());
        assert!(parse_command("mode 320xabc").is_err());
        assert!(parse_command("frobnicate").is_err());
    }
}
