//! Interactive serial console.
//!
//! Line input for the foreground command loop.  On the device the USB
//! Serial JTAG driver is routed to stdio first; after that both targets
//! read lines through std.

use std::io::{BufRead, Write};

use log::info;

pub struct Console;

impl Console {
    pub fn new() -> Self {
        Self
    }

    /// Route the USB Serial JTAG peripheral to stdio.  Returns an error
    /// string on driver failure; the caller treats that as fatal.
    #[cfg(target_os = "espidf")]
    pub fn setup(&self) -> Result<(), &'static str> {
        use esp_idf_svc::sys::*;
        let mut cfg = usb_serial_jtag_driver_config_t {
            tx_buffer_size: 256,
            rx_buffer_size: 256,
        };
        unsafe {
            if usb_serial_jtag_driver_install(&mut cfg) != ESP_OK as i32 {
                return Err("USB Serial JTAG driver install failed");
            }
            esp_vfs_usb_serial_jtag_use_driver();
        }
        info!("console: USB Serial JTAG ready");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn setup(&self) -> Result<(), &'static str> {
        info!("console(sim): using process stdio");
        Ok(())
    }

    pub fn print_welcome(&self) {
        println!();
        println!("=====================================");
        println!("     netrelay command console        ");
        println!("=====================================");
        println!("Type 'help' for available commands");
        println!();
    }

    pub fn print_prompt(&self) {
        print!("> ");
        let _ = std::io::stdout().flush();
    }

    /// Read one line.  Returns `None` on end of input.
    pub fn read_line(&self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    }

    /// Deliver a response to the interactive channel.
    pub fn print_response(&self, text: &str) {
        println!("{text}");
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
