/*++

Licensed under the Apache-2.0 license.

File Name:

    uart.rs

Abstract:

    File contains API for accessing the UART

--*/

/// Transmit register of the debug UART
const UART_TX_ADDR: usize = 0x4010_5000;

#[derive(Default, Debug)]
pub struct Uart {}

impl Uart {
    /// Create an instance of the UART
    pub fn new() -> Self {
        Self {}
    }

    /// Write the string to UART
    ///
    /// # Arguments
    ///
    /// `str` - String to write to UART
    pub fn write(&mut self, str: &str) {
        for byte in str.bytes() {
            match byte {
                0x20..=0x7e | b'\n' | b'\t' => self.write_byte(byte),
                _ => self.write_byte(0xfe),
            }
        }
    }

    /// Write the byte to UART
    pub fn write_byte(&mut self, byte: u8) {
        unsafe { core::ptr::write_volatile(UART_TX_ADDR as *mut u32, byte as u32) }
    }
}
