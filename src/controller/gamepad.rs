//! # PlayStation Gamepad Module
//!
//! This module handles PlayStation controller detection, connection, and
//! non-blocking input polling using the Linux evdev interface.
//!
//! ## Controller Detection
//!
//! Controllers are identified by the Sony vendor ID (0x054c) and one of the
//! DualShock 4 / DualSense product IDs. Sony pads expose extra evdev nodes
//! for the motion sensors and the touchpad with the same IDs, so only the
//! node that reports `BTN_SOUTH` is accepted as the gamepad.
//!
//! ## Touchpad
//!
//! The touchpad node (same IDs and physical path, `BTN_LEFT` plus the
//! button-pad property) is opened next to the gamepad node. Its click is
//! the record button.

use evdev::{Device, EventStream, InputEvent as RawEvent, Key, PropType};
use std::path::{Path, PathBuf};
use std::time::Duration;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::mapper::EventTranslator;
use super::{ControllerSource, InputEvent};
use crate::error::{JogBridgeError, Result};

/// Sony vendor ID
const SONY_VENDOR_ID: u16 = 0x054c;

/// Supported product IDs (DualShock 4 v1, v2, wireless adapter, DualSense, DualSense Edge)
const SUPPORTED_PRODUCT_IDS: &[u16] = &[0x05c4, 0x09cc, 0x0ba0, 0x0ce6, 0x0df2];

/// `ENODEV`: the device node vanished (controller unplugged or powered off).
const ENODEV: i32 = 19;

/// PlayStation controller handle
///
/// Represents an open evdev controller in non-blocking stream mode. The
/// touchpad is a separate evdev node; when it is found it is read alongside
/// the gamepad node so the pad click works as the record button.
pub struct Gamepad {
    stream: EventStream,
    touchpad: Option<EventStream>,
    translator: EventTranslator,
    device_path: String,
    touchpad_path: Option<String>,
    name: String,
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device_path", &self.device_path)
            .field("touchpad_path", &self.touchpad_path)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Gamepad {
    /// Detect and open the first available PlayStation controller
    ///
    /// Scans `/dev/input/event*` in sorted order so the choice is
    /// deterministic when several controllers are connected.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: No supported controller found on the system
    /// - `Controller`: `/dev/input` could not be read
    /// - `Io`: The event stream could not be created
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use jog_bridge::controller::gamepad::Gamepad;
    ///
    /// # async fn demo() -> jog_bridge::error::Result<()> {
    /// let gamepad = Gamepad::open()?;
    /// println!("Connected to controller at: {}", gamepad.device_path());
    /// # Ok(())
    /// # }
    /// ```
    pub fn open() -> Result<Self> {
        for path in input_event_nodes()? {
            match Device::open(&path) {
                Ok(device) => {
                    let id = device.input_id();
                    debug!(
                        "Found input device: {} (vendor: 0x{:04x}, product: 0x{:04x})",
                        path.display(),
                        id.vendor(),
                        id.product()
                    );

                    if is_supported(id.vendor(), id.product()) && has_face_buttons(&device) {
                        return Self::from_device(device, path.to_string_lossy().to_string());
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(JogBridgeError::ControllerNotFound)
    }

    /// Open a controller at an explicit `/dev/input/eventX` path
    ///
    /// No vendor check is made, which allows third-party pads with the same
    /// button layout.
    pub fn open_path(path: &str) -> Result<Self> {
        let device = Device::open(path)
            .map_err(|e| JogBridgeError::Controller(format!("Failed to open {}: {}", path, e)))?;
        if !has_face_buttons(&device) {
            warn!("{} does not report BTN_SOUTH; it may not be a gamepad", path);
        }
        Self::from_device(device, path.to_string())
    }

    /// Open the configured device, or auto-detect when `device_path` is empty
    pub fn open_configured(device_path: &str) -> Result<Self> {
        if device_path.is_empty() {
            Self::open()
        } else {
            Self::open_path(device_path)
        }
    }

    fn from_device(device: Device, device_path: String) -> Result<Self> {
        let name = device.name().unwrap_or("Unknown controller").to_string();
        info!("Found controller \"{}\" at: {}", name, device_path);

        let (touchpad, touchpad_path) = match find_touchpad(&device, &device_path) {
            Some((pad, pad_path)) => {
                info!("Found touchpad at: {}", pad_path);
                (Some(pad.into_event_stream()?), Some(pad_path))
            }
            None => {
                warn!("No touchpad node found for {}; record button unavailable", device_path);
                (None, None)
            }
        };

        let stream = device.into_event_stream()?;
        Ok(Self {
            stream,
            touchpad,
            translator: EventTranslator::new(),
            device_path,
            touchpad_path,
            name,
        })
    }

    /// Get the device path of this controller
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Get the device path of the touchpad node, if one was found
    pub fn touchpad_path(&self) -> Option<&str> {
        self.touchpad_path.as_deref()
    }

    /// Reads every raw event available right now and translates it.
    ///
    /// Gamepad events come first, then touchpad clicks. An unplugged
    /// controller surfaces as a single `DeviceQuit` event; a touchpad node
    /// that fails is dropped and the gamepad keeps working.
    async fn drain(&mut self) -> Result<Vec<InputEvent>> {
        let mut events = Vec::new();

        let (raw, error) = pending_raw(&mut self.stream).await;
        for event in &raw {
            events.extend(self.translator.translate(event));
        }
        match error {
            Some(e) if e.raw_os_error() == Some(ENODEV) => {
                warn!("Controller {} disconnected", self.device_path);
                self.translator.reset();
                events.push(InputEvent::device_quit());
                return Ok(events);
            }
            Some(e) => {
                return Err(JogBridgeError::Controller(format!(
                    "Failed to fetch events: {}",
                    e
                )));
            }
            None => {}
        }

        if let Some(touchpad) = self.touchpad.as_mut() {
            let (raw, error) = pending_raw(touchpad).await;
            events.extend(raw.iter().filter_map(EventTranslator::translate_touchpad));
            if let Some(e) = error {
                warn!("Touchpad stopped reporting ({}); record button unavailable", e);
                self.touchpad = None;
                self.touchpad_path = None;
            }
        }

        Ok(events)
    }
}

/// Reads every raw event pending on `stream` without waiting.
///
/// Events read before a failure are returned together with the error.
async fn pending_raw(stream: &mut EventStream) -> (Vec<RawEvent>, Option<std::io::Error>) {
    let mut raw = Vec::new();
    loop {
        match tokio::time::timeout(Duration::ZERO, stream.next_event()).await {
            Ok(Ok(event)) => raw.push(event),
            Ok(Err(e)) => return (raw, Some(e)),
            // Nothing pending
            Err(_) => return (raw, None),
        }
    }
}

/// Lists `/dev/input/event*` nodes in sorted order.
fn input_event_nodes() -> Result<Vec<PathBuf>> {
    let input_dir = Path::new("/dev/input");

    if !input_dir.exists() {
        return Err(JogBridgeError::Controller(
            "/dev/input directory not found".to_string(),
        ));
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .map_err(|e| JogBridgeError::Controller(format!("Failed to read /dev/input: {}", e)))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| JogBridgeError::Controller(format!("Failed to read directory entry: {}", e)))?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map_or(false, |name| name.to_string_lossy().starts_with("event"))
        })
        .collect();

    paths.sort();
    Ok(paths)
}

/// Finds the touchpad node of the controller at `gamepad_path`.
///
/// The kernel drivers create it with the same vendor, product and physical
/// path as the gamepad node.
fn find_touchpad(gamepad: &Device, gamepad_path: &str) -> Option<(Device, String)> {
    let id = gamepad.input_id();
    let phys = gamepad.physical_path();

    for path in input_event_nodes().ok()? {
        let path_str = path.to_string_lossy().to_string();
        if path_str == gamepad_path {
            continue;
        }
        let Ok(device) = Device::open(&path) else {
            continue;
        };
        let other = device.input_id();
        if other.vendor() == id.vendor()
            && other.product() == id.product()
            && device.physical_path() == phys
            && is_touchpad(&device)
        {
            return Some((device, path_str));
        }
    }
    None
}

#[async_trait]
impl ControllerSource for Gamepad {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(&mut self) -> Result<Vec<InputEvent>> {
        self.drain().await
    }

    async fn clear(&mut self) -> Result<()> {
        // Dropped events still pass through the translator to keep D-Pad state in sync.
        let discarded = self.drain().await?;
        if !discarded.is_empty() {
            debug!("Discarded {} pending controller events", discarded.len());
        }
        Ok(())
    }
}

fn is_supported(vendor: u16, product: u16) -> bool {
    vendor == SONY_VENDOR_ID && SUPPORTED_PRODUCT_IDS.contains(&product)
}

fn has_face_buttons(device: &Device) -> bool {
    device
        .supported_keys()
        .map_or(false, |keys| keys.contains(Key::BTN_SOUTH))
}

/// A clickable touchpad: reports `BTN_LEFT` and has the button-pad property.
fn is_touchpad(device: &Device) -> bool {
    device
        .supported_keys()
        .map_or(false, |keys| keys.contains(Key::BTN_LEFT))
        && device.properties().contains(PropType::BUTTONPAD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sony_vendor_id() {
        assert_eq!(SONY_VENDOR_ID, 0x054c, "Sony vendor ID should be 0x054c");
    }

    #[test]
    fn test_supported_products() {
        assert!(is_supported(0x054c, 0x05c4), "DualShock 4 v1");
        assert!(is_supported(0x054c, 0x09cc), "DualShock 4 v2");
        assert!(is_supported(0x054c, 0x0ce6), "DualSense");
        assert!(!is_supported(0x054c, 0x0268), "DualShock 3 is not supported");
        assert!(!is_supported(0x045e, 0x0ce6), "wrong vendor");
    }

    #[test]
    fn test_open_path_missing_device() {
        let result = Gamepad::open_path("/dev/input/event_does_not_exist");
        match result {
            Err(JogBridgeError::Controller(msg)) => {
                assert!(msg.contains("event_does_not_exist"));
            }
            other => panic!("Expected Controller error, got: {:?}", other),
        }
    }

    // Integration test - only runs with real hardware
    #[tokio::test]
    #[ignore]
    async fn test_open_with_real_hardware() {
        let gamepad = Gamepad::open().expect("Controller not found");
        assert!(gamepad.device_path().starts_with("/dev/input/event"));
        assert!(!gamepad.name().is_empty());
    }

    // Integration test - only runs with real hardware
    #[tokio::test]
    #[ignore]
    async fn test_touchpad_node_found_with_real_hardware() {
        let gamepad = Gamepad::open().expect("Controller not found");
        let touchpad = gamepad.touchpad_path().expect("Touchpad node not found");
        assert!(touchpad.starts_with("/dev/input/event"));
        assert_ne!(touchpad, gamepad.device_path());
    }

    // Integration test - only runs with real hardware
    #[tokio::test]
    #[ignore]
    async fn test_poll_with_real_hardware() {
        let mut gamepad = Gamepad::open().expect("Controller not found");

        println!("Move controller sticks or press buttons within 5 seconds...");

        for _ in 0..100 {
            let events = gamepad.poll().await.expect("poll failed");
            if let Some(event) = events.first() {
                println!("Received event: {:?}", event);
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        panic!("No events received from controller");
    }
}
