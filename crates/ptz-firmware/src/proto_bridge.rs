//! # Protocol Bridge
//!
//! This module owns the host-facing UART: it reads bytes off the wire,
//! frames them into lines, and is meant to hand each line to
//! [`crate::command_adapter::dispatch`] for parsing into a
//! [`crate::command_adapter::HostCommand`] and execution against the
//! motion task, writing the resulting [`crate::command_adapter::Response`]
//! back out the same UART.
//!
//! ## Command Dispatch
//!
//! Framing and tokenizing live here; `dispatch` itself is transport-
//! agnostic and owns no state of its own, so this task's only job is
//! turning bytes into `HostCommand`s and `Response`s back into bytes.

use embassy_stm32::usart::{Uart, UartTx, UartRx};
use embassy_stm32::peripherals::USART1;
use embassy_stm32::gpio::{AnyPin, Pin};


/// The protocol bridge task.
///
/// This task handles the communication between the host and the MCU.
#[embassy_executor::task]
pub async fn proto_task(_usart: USART1, _rx_pin: AnyPin, _tx_pin: AnyPin) {
    defmt::info!("Protocol bridge task started");

    // TODO: In a real implementation:
    // 1. Initialize UART with DMA.
    // 2. Frame incoming bytes into lines and parse each into a `HostCommand`.
    // 3. Call `command_adapter::dispatch` against the shared `MotionTask`
    //    and write the `Response` back out the UART.
    loop {
        embassy_time::Timer::after(embassy_time::Duration::from_secs(5)).await;
        defmt::info!("Pretending to parse a message...");
    }
}