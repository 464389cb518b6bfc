//! Device adapters implementing [`PhaseDevice`].
//!
//! Two adapters are provided: [`Buzzer`] drives a piezo buzzer on a Raspberry
//! Pi GPIO pin (behind the `hardware` feature), and [`Backlight`] blinks an
//! RGB character-LCD backlight through a caller-supplied [`BacklightPanel`].

use crate::controller::{DeviceError, PhaseDevice};
use palette::Srgb;
use std::sync::{Arc, Mutex, PoisonError};

/// Trait for abstracting an RGB backlight panel.
///
/// Implement this for your display hardware. Only the backlight is modelled;
/// text rendering is a separate concern of the display driver.
pub trait BacklightPanel {
    /// Sets the backlight to the specified RGB color at full intensity.
    fn set_color(&mut self, color: Srgb) -> Result<(), DeviceError>;

    /// Sets the backlight intensity, 0.0 (dark) to 1.0 (full).
    fn set_intensity(&mut self, intensity: f32) -> Result<(), DeviceError>;
}

/// Shared handle to a backlight's configured blink color.
///
/// The controller owns the [`Backlight`] once an episode runs, so the color
/// is exchanged through this handle instead: keep a clone on the controlling
/// side and call [`set`](Self::set) before beginning an episode. A color set
/// mid-episode takes effect at the next ON phase.
#[derive(Clone)]
pub struct ColorHandle(Arc<Mutex<Srgb>>);

impl ColorHandle {
    /// Creates a handle with an initial color.
    pub fn new(color: Srgb) -> Self {
        Self(Arc::new(Mutex::new(color)))
    }

    /// Sets the color applied during ON phases.
    pub fn set(&self, color: Srgb) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = color;
    }

    /// Returns the currently configured color.
    pub fn get(&self) -> Srgb {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Blinks an RGB backlight: ON applies the configured color, OFF sets the
/// intensity to zero.
pub struct Backlight<P: BacklightPanel> {
    panel: P,
    color: ColorHandle,
}

impl<P: BacklightPanel> Backlight<P> {
    /// Creates a backlight device over `panel`.
    ///
    /// Returns the device together with the [`ColorHandle`] the controlling
    /// thread uses to configure the blink color.
    pub fn new(panel: P, initial_color: Srgb) -> (Self, ColorHandle) {
        let color = ColorHandle::new(initial_color);
        (
            Self {
                panel,
                color: color.clone(),
            },
            color,
        )
    }
}

impl<P: BacklightPanel> PhaseDevice for Backlight<P> {
    fn apply_on(&mut self) -> Result<(), DeviceError> {
        self.panel.set_color(self.color.get())
    }

    fn apply_off(&mut self) -> Result<(), DeviceError> {
        self.panel.set_intensity(0.0)
    }
}

#[cfg(feature = "hardware")]
pub use self::gpio::Buzzer;

#[cfg(feature = "hardware")]
mod gpio {
    use super::{DeviceError, PhaseDevice};
    use rppal::gpio::{Gpio, OutputPin};

    /// Drives a piezo buzzer on a GPIO output pin: ON energizes the pin,
    /// OFF de-energizes it.
    pub struct Buzzer {
        pin: OutputPin,
    }

    impl Buzzer {
        /// Acquires `pin` (BCM numbering) as an output and leaves it low.
        ///
        /// # Errors
        /// Returns [`DeviceError`] if the pin cannot be acquired.
        pub fn new(gpio: &Gpio, pin: u8) -> Result<Self, DeviceError> {
            let mut pin = gpio
                .get(pin)
                .map_err(|e| DeviceError::new(format!("GPIO pin {pin}: {e}")))?
                .into_output();
            pin.set_low();
            Ok(Self { pin })
        }
    }

    impl PhaseDevice for Buzzer {
        fn apply_on(&mut self) -> Result<(), DeviceError> {
            self.pin.set_high();
            Ok(())
        }

        fn apply_off(&mut self) -> Result<(), DeviceError> {
            self.pin.set_low();
            Ok(())
        }
    }
}
